use std::path::Path;
use std::time::Duration;

use run_core::PathConfig;
use run_types::RunError;
use tokio::process::Command;

const INIT_HOOK_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const INIT_HOOK_RELATIVE_PATHS: [&str; 2] = ["scripts/init.sh", "init.sh"];

/// Top-level entries of `project_root`, for the one-line structure log
/// emitted right after bootstrap finishes.
pub async fn list_top_level(project_root: &Path) -> Vec<String> {
    let mut entries = Vec::new();
    let Ok(mut read_dir) = tokio::fs::read_dir(project_root).await else {
        return entries;
    };
    while let Ok(Some(entry)) = read_dir.next_entry().await {
        entries.push(entry.file_name().to_string_lossy().to_string());
    }
    entries.sort();
    entries
}

/// Refuses to touch anything outside `workspace_dir` before clearing
/// `project_root` for a fresh checkout.
pub async fn safe_clean(paths: &PathConfig, workspace_dir: &Path, project_root: &Path) -> Result<(), RunError> {
    if !paths.validate_inside(workspace_dir, project_root) {
        return Err(RunError::PathOutsideProject {
            path: project_root.display().to_string(),
            root: workspace_dir.display().to_string(),
        });
    }
    if project_root.exists() {
        tokio::fs::remove_dir_all(project_root)
            .await
            .map_err(|e| RunError::RunFatal(e.into()))?;
    }
    tokio::fs::create_dir_all(project_root)
        .await
        .map_err(|e| RunError::RunFatal(e.into()))?;
    Ok(())
}

/// Shallow-clones `repo_url` at `template_ref` into `project_root`. No
/// repo url at all (the common case: start from an empty workspace) is
/// not an error — the agent's first `generate` call builds from
/// scratch.
pub async fn clone_template(
    repo_url: Option<&str>,
    template_ref: &str,
    project_root: &Path,
) -> Result<(), RunError> {
    let Some(repo_url) = repo_url else {
        return Ok(());
    };

    let branch_clone = Command::new("git")
        .args([
            "clone",
            "--depth",
            "1",
            "--branch",
            template_ref,
            repo_url,
            &project_root.display().to_string(),
        ])
        .output()
        .await
        .map_err(|e| RunError::SubprocessError {
            command: "git clone".to_string(),
            code: None,
            stderr: e.to_string(),
        })?;

    if branch_clone.status.success() {
        return Ok(());
    }

    // `template_ref` may name a commit rather than a branch/tag, which
    // `--branch` cannot resolve. Fall back to a full clone + checkout.
    if project_root.exists() {
        let _ = tokio::fs::remove_dir_all(project_root).await;
    }
    let clone = Command::new("git")
        .args(["clone", repo_url, &project_root.display().to_string()])
        .output()
        .await
        .map_err(|e| RunError::SubprocessError {
            command: "git clone".to_string(),
            code: None,
            stderr: e.to_string(),
        })?;
    if !clone.status.success() {
        return Err(RunError::SubprocessError {
            command: "git clone".to_string(),
            code: clone.status.code(),
            stderr: String::from_utf8_lossy(&clone.stderr).to_string(),
        });
    }

    let checkout = Command::new("git")
        .args(["-C", &project_root.display().to_string(), "checkout", template_ref])
        .output()
        .await
        .map_err(|e| RunError::SubprocessError {
            command: "git checkout".to_string(),
            code: None,
            stderr: e.to_string(),
        })?;
    if !checkout.status.success() {
        return Err(RunError::SubprocessError {
            command: "git checkout".to_string(),
            code: checkout.status.code(),
            stderr: String::from_utf8_lossy(&checkout.stderr).to_string(),
        });
    }
    Ok(())
}

/// Runs the template's own init hook (`scripts/init.sh` or `init.sh`,
/// whichever exists) if `run_template_init` is set, bounded to
/// `INIT_HOOK_TIMEOUT`. A missing hook is not an error; a hook that
/// exits non-zero or overruns the budget is reported but does not
/// abort bootstrap — the run can still proceed from whatever state the
/// checkout left behind.
pub async fn run_init_hook(project_root: &Path, run_template_init: bool) -> Option<Result<(), RunError>> {
    if !run_template_init {
        return None;
    }

    let mut hook_path = None;
    for relative in INIT_HOOK_RELATIVE_PATHS {
        let candidate = project_root.join(relative);
        if candidate.exists() {
            hook_path = Some(candidate);
            break;
        }
    }
    let hook_path = hook_path?;

    let run = Command::new("sh")
        .arg(&hook_path)
        .current_dir(project_root)
        .output();

    match tokio::time::timeout(INIT_HOOK_TIMEOUT, run).await {
        Ok(Ok(output)) if output.status.success() => Some(Ok(())),
        Ok(Ok(output)) => Some(Err(RunError::SubprocessError {
            command: hook_path.display().to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })),
        Ok(Err(e)) => Some(Err(RunError::SubprocessError {
            command: hook_path.display().to_string(),
            code: None,
            stderr: e.to_string(),
        })),
        Err(_) => Some(Err(RunError::SubprocessError {
            command: hook_path.display().to_string(),
            code: None,
            stderr: format!("init hook exceeded {:?} budget", INIT_HOOK_TIMEOUT),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn safe_clean_refuses_a_project_root_outside_workspace() {
        let workspace = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let paths = PathConfig::new(workspace.path(), "run-1", None, "127.0.0.1", 4310);
        let err = safe_clean(&paths, workspace.path(), &other.path().join("project"))
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::PathOutsideProject { .. }));
    }

    #[tokio::test]
    async fn safe_clean_recreates_an_empty_project_root() {
        let workspace = tempfile::tempdir().unwrap();
        let paths = PathConfig::new(workspace.path(), "run-1", None, "127.0.0.1", 4310);
        let project_root = workspace.path().join("project");
        tokio::fs::create_dir_all(&project_root).await.unwrap();
        tokio::fs::write(project_root.join("stale.txt"), "old").await.unwrap();

        safe_clean(&paths, workspace.path(), &project_root).await.unwrap();

        assert!(project_root.exists());
        assert!(!project_root.join("stale.txt").exists());
    }

    #[tokio::test]
    async fn clone_template_is_a_no_op_without_a_repo_url() {
        let project_root = tempfile::tempdir().unwrap();
        clone_template(None, "main", project_root.path()).await.unwrap();
    }

    #[tokio::test]
    async fn run_init_hook_skips_when_disabled() {
        let project_root = tempfile::tempdir().unwrap();
        let result = run_init_hook(project_root.path(), false).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn run_init_hook_skips_when_no_hook_file_exists() {
        let project_root = tempfile::tempdir().unwrap();
        let result = run_init_hook(project_root.path(), true).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn run_init_hook_runs_an_existing_hook() {
        let project_root = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(project_root.path().join("scripts")).await.unwrap();
        tokio::fs::write(project_root.path().join("scripts/init.sh"), "#!/bin/sh\ntrue\n")
            .await
            .unwrap();
        let result = run_init_hook(project_root.path(), true).await;
        assert!(matches!(result, Some(Ok(()))));
    }
}
