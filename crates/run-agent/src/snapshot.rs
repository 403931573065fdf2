use std::collections::BTreeMap;
use std::path::Path;

use ignore::WalkBuilder;

/// Relative-path → text content, for every non-hidden file under a
/// workspace at one point in time. Binary files are skipped, matching
/// the diffing discipline: only text changes are reported per file.
pub type WorkspaceSnapshot = BTreeMap<String, String>;

pub fn capture(root: &Path) -> WorkspaceSnapshot {
    let mut files = BTreeMap::new();
    if !root.exists() {
        return files;
    }
    for entry in WalkBuilder::new(root).hidden(true).build().flatten() {
        let is_file = entry.file_type().map(|ft| ft.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        let path = entry.path();
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let Ok(content) = std::fs::read_to_string(path) else {
            continue;
        };
        files.insert(relative.to_string_lossy().replace('\\', "/"), content);
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn captures_text_files_and_skips_hidden_ones() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git").join("HEAD"), "ref: refs/heads/main").unwrap();

        let snapshot = capture(dir.path());
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key("index.html"));
    }

    #[test]
    fn missing_root_yields_empty_snapshot() {
        let snapshot = capture(Path::new("/nonexistent/path/for/run-agent/tests"));
        assert!(snapshot.is_empty());
    }
}
