use std::path::{Path, PathBuf};

use run_types::{Artifact, Manifest};
use tokio::sync::RwLock;

/// In-memory mirror of `manifest.json`, rewritten whole-document after
/// every append so a crash never leaves a half-written manifest.
pub struct Artifacts {
    manifest: RwLock<Manifest>,
    manifest_path: PathBuf,
    artifacts_dir: PathBuf,
}

impl Artifacts {
    pub fn new(manifest: Manifest, manifest_path: PathBuf, artifacts_dir: PathBuf) -> Self {
        Self {
            manifest: RwLock::new(manifest),
            manifest_path,
            artifacts_dir,
        }
    }

    pub async fn manifest_snapshot(&self) -> Manifest {
        self.manifest.read().await.clone()
    }

    /// Applies `f` to the in-memory manifest and rewrites it to disk,
    /// the same whole-document persistence every other mutation here
    /// uses. The one seam the controller needs for updates that do not
    /// fit `save_*`'s artifact-ledger shape (recording an iteration's
    /// score, attaching VCS metadata, finishing the run).
    pub async fn mutate_manifest<F: FnOnce(&mut Manifest)>(&self, f: F) -> anyhow::Result<()> {
        {
            let mut manifest = self.manifest.write().await;
            f(&mut manifest);
        }
        self.persist().await
    }

    async fn append_and_persist(&self, artifact: Artifact) -> anyhow::Result<()> {
        {
            let mut manifest = self.manifest.write().await;
            manifest.artifacts.push(artifact);
        }
        self.persist().await
    }

    pub async fn persist(&self) -> anyhow::Result<()> {
        let manifest = self.manifest.read().await;
        let text = serde_json::to_string_pretty(&*manifest)?;
        if let Some(parent) = self.manifest_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.manifest_path, text).await?;
        Ok(())
    }

    pub async fn save_screenshot(
        &self,
        iteration: u32,
        bytes: &[u8],
        label: &str,
    ) -> anyhow::Result<PathBuf> {
        let dir = self.artifacts_dir.join("screenshots");
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("iter-{iteration:02}-{label}.png"));
        tokio::fs::write(&path, bytes).await?;
        self.append_and_persist(Artifact::Screenshot {
            iteration,
            path: path.clone(),
            size_bytes: bytes.len() as u64,
            metadata: serde_json::json!({ "label": label }),
        })
        .await?;
        Ok(path)
    }

    pub async fn save_evaluation(
        &self,
        iteration: u32,
        verdict_json: &str,
        score: u32,
        passed: bool,
    ) -> anyhow::Result<PathBuf> {
        let dir = self.artifacts_dir.join("evaluations");
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("iter-{iteration:02}-verdict.json"));
        tokio::fs::write(&path, verdict_json).await?;
        self.append_and_persist(Artifact::Evaluation {
            iteration,
            path: path.clone(),
            score,
            passed,
        })
        .await?;
        Ok(path)
    }

    pub async fn save_log(&self, name: &str, contents: &str, log_kind: &str) -> anyhow::Result<PathBuf> {
        let dir = self.artifacts_dir.join("logs");
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{name}.log"));
        tokio::fs::write(&path, contents).await?;
        self.append_and_persist(Artifact::Log {
            name: name.to_string(),
            path: path.clone(),
            log_kind: log_kind.to_string(),
        })
        .await?;
        Ok(path)
    }

    pub async fn save_file(
        &self,
        name: &str,
        src: &Path,
        file_kind: &str,
    ) -> anyhow::Result<PathBuf> {
        let dir = self.artifacts_dir.join("files");
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(name);
        tokio::fs::copy(src, &path).await?;
        self.append_and_persist(Artifact::File {
            name: name.to_string(),
            path: path.clone(),
            file_kind: file_kind.to_string(),
            metadata: serde_json::Value::Null,
        })
        .await?;
        Ok(path)
    }

    pub async fn save_report(&self, name: &str, contents: &str) -> anyhow::Result<PathBuf> {
        let dir = self.artifacts_dir.join("reports");
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(name);
        tokio::fs::write(&path, contents).await?;
        self.append_and_persist(Artifact::Report {
            name: name.to_string(),
            path: path.clone(),
        })
        .await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use run_types::Manifest;

    fn fresh_manifest() -> Manifest {
        Manifest::new(
            "run-test",
            "build a page",
            "planner-model",
            "evaluator-model",
            "default-v1",
            PathBuf::from("/tmp/ws"),
            PathBuf::from("/tmp/ws/artifacts"),
            PathBuf::from("/tmp/ws/site"),
            "http://127.0.0.1:4310/",
        )
    }

    #[tokio::test]
    async fn saving_a_report_persists_manifest_with_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let artifacts_dir = tmp.path().join("artifacts");
        let manifest_path = tmp.path().join("manifest.json");
        let store = Artifacts::new(fresh_manifest(), manifest_path.clone(), artifacts_dir);

        store.save_report("summary.md", "# Summary").await.unwrap();

        let on_disk = tokio::fs::read_to_string(&manifest_path).await.unwrap();
        let manifest: Manifest = serde_json::from_str(&on_disk).unwrap();
        assert_eq!(manifest.artifacts.len(), 1);
    }
}
