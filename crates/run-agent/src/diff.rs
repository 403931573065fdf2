use serde::{Deserialize, Serialize};
use similar::TextDiff;

use crate::snapshot::WorkspaceSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileChangeKind {
    Created,
    Modified,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDiff {
    pub path: String,
    pub kind: FileChangeKind,
    pub unified: String,
}

/// Diffs a before/after workspace snapshot pair, one entry per file that
/// was created, modified, or deleted.
pub fn diff_snapshots(before: &WorkspaceSnapshot, after: &WorkspaceSnapshot) -> Vec<FileDiff> {
    let mut diffs = Vec::new();

    for (path, new_content) in after {
        match before.get(path) {
            None => diffs.push(FileDiff {
                path: path.clone(),
                kind: FileChangeKind::Created,
                unified: unified_diff(path, "", new_content),
            }),
            Some(old_content) if old_content != new_content => diffs.push(FileDiff {
                path: path.clone(),
                kind: FileChangeKind::Modified,
                unified: unified_diff(path, old_content, new_content),
            }),
            Some(_) => {}
        }
    }

    for (path, old_content) in before {
        if !after.contains_key(path) {
            diffs.push(FileDiff {
                path: path.clone(),
                kind: FileChangeKind::Deleted,
                unified: unified_diff(path, old_content, ""),
            });
        }
    }

    diffs.sort_by(|a, b| a.path.cmp(&b.path));
    diffs
}

fn unified_diff(path: &str, old: &str, new: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{path}"), &format!("b/{path}"))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_created_modified_and_deleted_files() {
        let mut before = WorkspaceSnapshot::new();
        before.insert("keep.html".to_string(), "same\n".to_string());
        before.insert("old.html".to_string(), "bye\n".to_string());
        before.insert("change.html".to_string(), "a\nb\n".to_string());

        let mut after = WorkspaceSnapshot::new();
        after.insert("keep.html".to_string(), "same\n".to_string());
        after.insert("change.html".to_string(), "a\nB\n".to_string());
        after.insert("new.html".to_string(), "hi\n".to_string());

        let diffs = diff_snapshots(&before, &after);
        let kinds: Vec<(&str, FileChangeKind)> =
            diffs.iter().map(|d| (d.path.as_str(), d.kind)).collect();

        assert_eq!(
            kinds,
            vec![
                ("change.html", FileChangeKind::Modified),
                ("new.html", FileChangeKind::Created),
                ("old.html", FileChangeKind::Deleted),
            ]
        );
        let modified = diffs.iter().find(|d| d.path == "change.html").unwrap();
        assert!(modified.unified.contains("-a") == false);
        assert!(modified.unified.contains("-b"));
        assert!(modified.unified.contains("+B"));
    }
}
