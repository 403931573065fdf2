use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use run_types::RunError;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

pub const AGENT_CALL_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Raw result of one backend invocation, before the `AgentClient` layers
/// snapshot diffing on top.
pub struct BackendInvocation {
    pub stdout: String,
    pub stderr: String,
    pub ok: bool,
}

/// Backend selection happens at wiring time and does not change the
/// `AgentClient` contract: every backend just answers one prompt against
/// one workspace directory.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    async fn invoke(&self, prompt: &str, workspace: &Path) -> Result<BackendInvocation, RunError>;
}

/// Wraps an external CLI agent (e.g. an OpenHands-style coding agent)
/// as a subprocess, passing the prompt as its final argument and
/// running it with `workspace` as the current directory.
pub struct SubprocessBackend {
    command: String,
    args: Vec<String>,
}

impl SubprocessBackend {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

#[async_trait]
impl AgentBackend for SubprocessBackend {
    async fn invoke(&self, prompt: &str, workspace: &Path) -> Result<BackendInvocation, RunError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .arg(prompt)
            .current_dir(workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RunError::SubprocessError {
                command: self.command.clone(),
                code: None,
                stderr: e.to_string(),
            })?;

        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();

        let wait = async {
            let status = child.wait().await;
            let mut stdout = String::new();
            let mut stderr = String::new();
            if let Some(mut pipe) = stdout_pipe.take() {
                let _ = pipe.read_to_string(&mut stdout).await;
            }
            if let Some(mut pipe) = stderr_pipe.take() {
                let _ = pipe.read_to_string(&mut stderr).await;
            }
            (status, stdout, stderr)
        };

        let (status, stdout, stderr) = match tokio::time::timeout(AGENT_CALL_TIMEOUT, wait).await {
            Ok(result) => result,
            Err(_) => {
                let _ = child.start_kill();
                return Err(RunError::SubprocessError {
                    command: self.command.clone(),
                    code: None,
                    stderr: format!("agent call exceeded {:?} budget", AGENT_CALL_TIMEOUT),
                });
            }
        };

        let status = status.map_err(|e| RunError::SubprocessError {
            command: self.command.clone(),
            code: None,
            stderr: e.to_string(),
        })?;

        Ok(BackendInvocation {
            ok: status.success(),
            stdout,
            stderr,
        })
    }
}

/// A trait-object seam for an in-process agent library, should one ever
/// be embedded directly instead of shelled out to. No concrete backend
/// ships against it today; `AgentBackend` is the extension point.
pub struct LocalLibraryBackend;

#[async_trait]
impl AgentBackend for LocalLibraryBackend {
    async fn invoke(&self, _prompt: &str, _workspace: &Path) -> Result<BackendInvocation, RunError> {
        Err(RunError::ConfigError(
            "no in-process agent library is wired up; configure AGENT_MODE=local with AGENT_BACKEND_COMMAND, or AGENT_MODE=mock".to_string(),
        ))
    }
}

/// Deterministic regex/template backend used by `AGENT_MODE=mock`, the
/// default. It never shells out or calls a network LLM: it scaffolds a
/// minimal `index.html` on first use and otherwise appends an HTML
/// comment describing what the prompt asked for, so tests stay fast
/// and hermetic.
pub struct MockBackend;

impl MockBackend {
    pub fn new() -> Self {
        Self
    }

    fn module_heading(prompt: &str) -> String {
        let heading_re = Regex::new(r"(?i)module[: ]+([\w \-]+)").unwrap();
        heading_re
            .captures(prompt)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_else(|| "Generated Section".to_string())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentBackend for MockBackend {
    async fn invoke(&self, prompt: &str, workspace: &Path) -> Result<BackendInvocation, RunError> {
        let index_path = workspace.join("index.html");
        if !index_path.exists() {
            tokio::fs::create_dir_all(workspace)
                .await
                .map_err(|e| RunError::RunFatal(e.into()))?;
            let scaffold = "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Generated Page</title></head>\n<body>\n</body>\n</html>\n";
            tokio::fs::write(&index_path, scaffold)
                .await
                .map_err(|e| RunError::RunFatal(e.into()))?;
        }

        let heading = Self::module_heading(prompt);
        let mut content = tokio::fs::read_to_string(&index_path)
            .await
            .map_err(|e| RunError::RunFatal(e.into()))?;
        let insertion = format!(
            "  <section><!-- {heading} --><h2>{heading}</h2></section>\n</body>",
        );
        if content.contains("</body>") {
            content = content.replacen("</body>", &insertion, 1);
        } else {
            content.push_str(&insertion);
        }
        tokio::fs::write(&index_path, content)
            .await
            .map_err(|e| RunError::RunFatal(e.into()))?;

        Ok(BackendInvocation {
            ok: true,
            stdout: format!("mock backend applied: {heading}"),
            stderr: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_backend_scaffolds_then_appends_sections() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::new();

        backend
            .invoke("module: Hero Banner", dir.path())
            .await
            .unwrap();
        let content = tokio::fs::read_to_string(dir.path().join("index.html"))
            .await
            .unwrap();
        assert!(content.contains("Hero Banner"));

        backend
            .invoke("module: Contact Form", dir.path())
            .await
            .unwrap();
        let content = tokio::fs::read_to_string(dir.path().join("index.html"))
            .await
            .unwrap();
        assert!(content.contains("Hero Banner"));
        assert!(content.contains("Contact Form"));
    }

    #[tokio::test]
    async fn local_library_backend_reports_unconfigured() {
        let backend = LocalLibraryBackend;
        let err = backend
            .invoke("anything", Path::new("/tmp"))
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::ConfigError(_)));
    }
}
