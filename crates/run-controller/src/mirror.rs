use std::path::{Path, PathBuf};

use run_types::RunError;

/// Mirrors `src` onto `dst`, replacing whatever was there. The preview
/// server only ever reads `dst` (`siteDir`); the agent only ever
/// writes `src` (`projectRoot`) — this is the one copy step that makes
/// generated output visible to the browser.
pub async fn mirror_dir(src: &Path, dst: &Path) -> Result<(), RunError> {
    let src = src.to_path_buf();
    let dst = dst.to_path_buf();
    tokio::task::spawn_blocking(move || copy_tree(&src, &dst))
        .await
        .map_err(|e| RunError::RunFatal(e.into()))?
        .map_err(|e| RunError::RunFatal(e.into()))
}

fn copy_tree(src: &Path, dst: &Path) -> std::io::Result<()> {
    if dst.exists() {
        std::fs::remove_dir_all(dst)?;
    }
    copy_recursive(src, dst)
}

fn copy_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target = dst.join(entry.file_name());
        if file_type.is_dir() {
            copy_recursive(&entry.path(), &target)?;
        } else if file_type.is_file() {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Recovers a missing `index.html` in `project_root` from
/// `workspace_dir/index.html`, if one was seeded there. Returns
/// whether `project_root/index.html` exists after the attempt.
pub async fn recover_index_html(project_root: &Path, workspace_dir: &Path) -> bool {
    let target: PathBuf = project_root.join("index.html");
    if target.exists() {
        return true;
    }
    let fallback = workspace_dir.join("index.html");
    if fallback.exists() {
        return tokio::fs::copy(&fallback, &target).await.is_ok();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mirror_dir_copies_nested_files_and_replaces_old_content() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(src.path().join("assets")).await.unwrap();
        tokio::fs::write(src.path().join("index.html"), "<html></html>").await.unwrap();
        tokio::fs::write(src.path().join("assets/app.js"), "console.log(1)").await.unwrap();
        tokio::fs::write(dst.path().join("stale.txt"), "old").await.unwrap();

        mirror_dir(src.path(), dst.path()).await.unwrap();

        assert!(dst.path().join("index.html").exists());
        assert!(dst.path().join("assets/app.js").exists());
        assert!(!dst.path().join("stale.txt").exists());
    }

    #[tokio::test]
    async fn recover_index_html_copies_from_workspace_fallback() {
        let workspace = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        tokio::fs::write(workspace.path().join("index.html"), "<html>fallback</html>")
            .await
            .unwrap();

        let recovered = recover_index_html(project.path(), workspace.path()).await;
        assert!(recovered);
        assert!(project.path().join("index.html").exists());
    }

    #[tokio::test]
    async fn recover_index_html_reports_false_with_no_fallback() {
        let workspace = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let recovered = recover_index_html(project.path(), workspace.path()).await;
        assert!(!recovered);
    }
}
