use std::path::{Path, PathBuf};

use run_types::RunError;

/// Canonical directory layout for one run, plus the path-confinement
/// guard every controller-initiated write passes through. The
/// code-generation agent is trusted to stay inside the project on its
/// own; `safe_join` is the hard backstop for everything the
/// controller itself writes.
#[derive(Debug, Clone)]
pub struct PathConfig {
    workspace_dir: PathBuf,
    project_root: PathBuf,
    site_dir: PathBuf,
    artifacts_dir: PathBuf,
    host: String,
    port: u16,
}

impl PathConfig {
    pub fn new(base_dir: &Path, run_id: &str, project_dir_name: Option<&str>, host: &str, port: u16) -> Self {
        let workspace_dir = base_dir.join(run_id);
        let project_dir_name = project_dir_name.unwrap_or("project");
        let project_root = workspace_dir.join(project_dir_name);
        let site_dir = workspace_dir.join("site");
        let artifacts_dir = workspace_dir.join("artifacts");
        Self {
            workspace_dir,
            project_root,
            site_dir,
            artifacts_dir,
            host: host.to_string(),
            port,
        }
    }

    pub fn workspace_dir(&self) -> &Path {
        &self.workspace_dir
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn site_dir(&self) -> &Path {
        &self.site_dir
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    /// Creates the run's directory tree. Idempotent.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.project_root)?;
        std::fs::create_dir_all(&self.site_dir)?;
        std::fs::create_dir_all(&self.artifacts_dir)?;
        Ok(())
    }

    /// True iff `candidate`, resolved relative to `root`, is a
    /// descendant of `root`. Does not require `candidate` to exist:
    /// non-existent paths are resolved against their nearest existing
    /// ancestor the same way `fs::canonicalize` would once created.
    pub fn validate_inside(&self, root: &Path, candidate: &Path) -> bool {
        let resolved_root = canonicalize_lenient(root);
        let resolved_candidate = if candidate.is_absolute() {
            canonicalize_lenient(candidate)
        } else {
            canonicalize_lenient(&root.join(candidate))
        };
        resolved_candidate.starts_with(&resolved_root)
    }

    /// Joins `parts` onto `project_root`, failing closed if the
    /// result would escape it (`..` components, absolute overrides,
    /// symlink escapes).
    pub fn safe_join(&self, parts: &[&str]) -> Result<PathBuf, RunError> {
        let mut candidate = self.project_root.clone();
        for part in parts {
            candidate.push(part);
        }
        if self.validate_inside(&self.project_root, &candidate) {
            Ok(candidate)
        } else {
            Err(RunError::PathOutsideProject {
                path: candidate.display().to_string(),
                root: self.project_root.display().to_string(),
            })
        }
    }

    /// Always an `http://` URL — never `file://` (Testable Property 4).
    pub fn preview_url(&self, relative: &str) -> String {
        let relative = relative.trim_start_matches('/');
        format!("http://{}:{}/{}", self.host, self.port, relative)
    }
}

fn canonicalize_lenient(path: &Path) -> PathBuf {
    match path.canonicalize() {
        Ok(p) => p,
        Err(_) => match path.parent() {
            Some(parent) if parent != path => {
                let mut resolved = canonicalize_lenient(parent);
                if let Some(name) = path.file_name() {
                    resolved.push(name);
                }
                resolved
            }
            _ => path.to_path_buf(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_join_allows_paths_inside_project_root() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = PathConfig::new(tmp.path(), "run-1", None, "127.0.0.1", 4310);
        cfg.ensure_dirs().unwrap();
        let joined = cfg.safe_join(&["src", "main.rs"]).unwrap();
        assert!(joined.starts_with(cfg.project_root()));
    }

    #[test]
    fn safe_join_rejects_parent_escape() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = PathConfig::new(tmp.path(), "run-1", None, "127.0.0.1", 4310);
        cfg.ensure_dirs().unwrap();
        let result = cfg.safe_join(&["..", "..", "etc", "passwd"]);
        assert!(result.is_err());
    }

    #[test]
    fn preview_url_is_always_http() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = PathConfig::new(tmp.path(), "run-1", None, "127.0.0.1", 4310);
        let url = cfg.preview_url("index.html");
        assert!(url.starts_with("http://"));
        assert!(!url.starts_with("file://"));
    }
}
