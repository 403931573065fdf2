use std::path::Path;

use run_types::VcsMetadata;
use tokio::process::Command;

/// Optional git snapshotting of each iteration's patched project state.
/// Absence of a git repository, a `git` binary, or push credentials
/// disables this without affecting any other part of the run — every
/// method degrades to `None` rather than propagating an error.
pub struct VcsSnapshot {
    branch: String,
    commit_ids: Vec<String>,
    enabled: bool,
}

impl VcsSnapshot {
    /// Creates `run/<run_id>` inside `project_root` if it is a git
    /// repository; otherwise returns a disabled snapshot that no-ops
    /// on every later call.
    pub async fn init(project_root: &Path, run_id: &str) -> Self {
        if !project_root.join(".git").exists() {
            return Self {
                branch: String::new(),
                commit_ids: Vec::new(),
                enabled: false,
            };
        }

        let branch = format!("run/{run_id}");
        let created = Command::new("git")
            .args(["-C", &project_root.display().to_string(), "checkout", "-b", &branch])
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false);

        Self {
            branch,
            commit_ids: Vec::new(),
            enabled: created,
        }
    }

    pub fn metadata(&self) -> Option<VcsMetadata> {
        if !self.enabled {
            return None;
        }
        Some(VcsMetadata {
            branch: self.branch.clone(),
            commit_ids: self.commit_ids.clone(),
        })
    }

    /// Commits the current project state and attempts to push. A push
    /// failure (no remote, no credentials) is logged by the caller but
    /// does not roll back the commit or disable future snapshots.
    pub async fn commit_iteration(&mut self, project_root: &Path, iteration: u32, score: u32) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let root = project_root.display().to_string();

        let add = Command::new("git").args(["-C", &root, "add", "-A"]).output().await.ok()?;
        if !add.status.success() {
            return None;
        }

        let message = format!("[Iteration {iteration}] Apply patch (score: {score}/100)");
        let commit = Command::new("git")
            .args(["-C", &root, "commit", "--allow-empty", "-m", &message])
            .output()
            .await
            .ok()?;
        if !commit.status.success() {
            return None;
        }

        let rev_parse = Command::new("git")
            .args(["-C", &root, "rev-parse", "HEAD"])
            .output()
            .await
            .ok()?;
        if !rev_parse.status.success() {
            return None;
        }
        let commit_id = String::from_utf8_lossy(&rev_parse.stdout).trim().to_string();
        self.commit_ids.push(commit_id.clone());

        let _ = Command::new("git")
            .args(["-C", &root, "push", "origin", &self.branch])
            .output()
            .await;

        Some(commit_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_when_project_root_is_not_a_git_repository() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = VcsSnapshot::init(dir.path(), "run-1").await;
        assert!(snapshot.metadata().is_none());
    }

    #[tokio::test]
    async fn commit_iteration_is_a_no_op_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut snapshot = VcsSnapshot::init(dir.path(), "run-1").await;
        let result = snapshot.commit_iteration(dir.path(), 1, 80).await;
        assert!(result.is_none());
    }
}
