use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use run_types::{PatchAction, PatchPlan, RunError, Todo};

use crate::backend::AgentBackend;
use crate::diff::{diff_snapshots, FileDiff};
use crate::snapshot::capture;

pub struct GenerateResult {
    pub files_touched: Vec<String>,
    pub diffs: Vec<FileDiff>,
    pub duration_ms: u64,
}

pub struct TodoResult {
    pub files_touched: Vec<String>,
    pub duration_ms: u64,
    pub ok: bool,
}

pub struct PatchResult {
    pub files_modified: Vec<String>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub ok: bool,
}

/// Adapter over the configured code-generation backend. Every operation
/// captures a before/after snapshot of the workspace around the backend
/// call and derives unified diffs from it, regardless of which backend
/// is wired in underneath.
pub struct AgentClient {
    backend: Arc<dyn AgentBackend>,
}

impl AgentClient {
    pub fn new(backend: Arc<dyn AgentBackend>) -> Self {
        Self { backend }
    }

    pub async fn generate(
        &self,
        task: &str,
        workspace: &Path,
        requirements: &str,
    ) -> Result<GenerateResult, RunError> {
        let before = capture(workspace);
        let started = Instant::now();
        let prompt = format!("TASK: {task}\n\nREQUIREMENTS:\n{requirements}");
        self.backend.invoke(&prompt, workspace).await?;
        let duration_ms = started.elapsed().as_millis() as u64;
        let after = capture(workspace);
        let diffs = diff_snapshots(&before, &after);
        let files_touched = diffs.iter().map(|d| d.path.clone()).collect();

        Ok(GenerateResult {
            files_touched,
            diffs,
            duration_ms,
        })
    }

    pub async fn execute_todo(
        &self,
        todo: &Todo,
        workspace: &Path,
        plan_context: &str,
    ) -> Result<TodoResult, RunError> {
        let before = capture(workspace);
        let started = Instant::now();
        let prompt = format!(
            "TASK: {title}\n\n{description}\n\nCONTEXT:\n{plan_context}",
            title = todo.title,
            description = todo.description,
        );
        let ok = match self.backend.invoke(&prompt, workspace).await {
            Ok(invocation) => invocation.ok,
            Err(err) => {
                tracing::warn!(todo_id = %todo.id, error = %err, "todo execution failed");
                false
            }
        };
        let duration_ms = started.elapsed().as_millis() as u64;
        let after = capture(workspace);
        let files_touched = diff_snapshots(&before, &after)
            .into_iter()
            .map(|d| d.path)
            .collect();

        Ok(TodoResult {
            files_touched,
            duration_ms,
            ok,
        })
    }

    pub async fn apply_patch(
        &self,
        workspace: &Path,
        patch_plan: &PatchPlan,
    ) -> Result<PatchResult, RunError> {
        let before = capture(workspace);
        let started = Instant::now();

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut ok = true;

        for file in &patch_plan.files {
            let target = workspace.join(&file.path);
            match file.action {
                PatchAction::Delete => {
                    if target.exists() {
                        if let Err(e) = tokio::fs::remove_file(&target).await {
                            stderr.push_str(&format!("failed to delete {}: {e}\n", file.path));
                            ok = false;
                        }
                    }
                    continue;
                }
                PatchAction::Create | PatchAction::Modify => {}
            }
        }

        let instructions = format!(
            "{instructions}\n\nFILES:\n{files}",
            instructions = patch_plan.instructions,
            files = patch_plan
                .files
                .iter()
                .filter(|f| !matches!(f.action, PatchAction::Delete))
                .map(|f| format!("- {} ({:?}): {}", f.path, f.action, f.description))
                .collect::<Vec<_>>()
                .join("\n"),
        );

        if patch_plan
            .files
            .iter()
            .any(|f| !matches!(f.action, PatchAction::Delete))
        {
            match self.backend.invoke(&instructions, workspace).await {
                Ok(invocation) => {
                    stdout.push_str(&invocation.stdout);
                    stderr.push_str(&invocation.stderr);
                    ok = ok && invocation.ok;
                }
                Err(err) => {
                    stderr.push_str(&err.to_string());
                    ok = false;
                }
            }
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        let after = capture(workspace);
        let files_modified = diff_snapshots(&before, &after)
            .into_iter()
            .map(|d| d.path)
            .collect();

        Ok(PatchResult {
            files_modified,
            stdout,
            stderr,
            duration_ms,
            ok,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use run_types::{PatchFile, TodoType};

    #[tokio::test]
    async fn generate_reports_files_touched_and_a_diff() {
        let dir = tempfile::tempdir().unwrap();
        let client = AgentClient::new(Arc::new(MockBackend::new()));
        let result = client
            .generate("a landing page", dir.path(), "module: Hero")
            .await
            .unwrap();
        assert!(result.files_touched.contains(&"index.html".to_string()));
        assert_eq!(result.diffs.len(), 1);
    }

    #[tokio::test]
    async fn execute_todo_reports_ok_true_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let client = AgentClient::new(Arc::new(MockBackend::new()));
        let todo = Todo {
            id: "todo-1".to_string(),
            todo_type: TodoType::Module,
            title: "module: Hero".to_string(),
            description: "Add a hero section".to_string(),
            module_index: Some(0),
            requirements: Default::default(),
            priority: 1,
        };
        let result = client
            .execute_todo(&todo, dir.path(), "plan context")
            .await
            .unwrap();
        assert!(result.ok);
        assert!(!result.files_touched.is_empty());
    }

    #[tokio::test]
    async fn apply_patch_deletes_and_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("index.html"), "<html></html>")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("old.html"), "stale")
            .await
            .unwrap();

        let plan = PatchPlan {
            instructions: "fix colors".to_string(),
            files: vec![
                PatchFile {
                    path: "index.html".to_string(),
                    action: PatchAction::Modify,
                    description: "adjust palette".to_string(),
                    changes: vec!["colour".to_string()],
                },
                PatchFile {
                    path: "old.html".to_string(),
                    action: PatchAction::Delete,
                    description: "remove stale file".to_string(),
                    changes: vec![],
                },
            ],
            original_score: 55,
            issues_count: 1,
        };

        let client = AgentClient::new(Arc::new(MockBackend::new()));
        let result = client.apply_patch(dir.path(), &plan).await.unwrap();
        assert!(result.ok);
        assert!(!dir.path().join("old.html").exists());
    }
}
