use thiserror::Error;

/// Closed error taxonomy for the orchestrator.
///
/// Component-local recovery is preferred everywhere; only `RunFatal`
/// should reach the top of a run and flip the manifest's stop reason.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("path `{path}` resolves outside the confined root `{root}`")]
    PathOutsideProject { path: String, root: String },

    #[error("mcp call `{method}` timed out after {elapsed_ms}ms")]
    McpTimeout { method: String, elapsed_ms: u64 },

    #[error("mcp protocol error: {0}")]
    McpProtocolError(String),

    #[error("mcp subprocess disconnected: {0}")]
    McpDisconnected(String),

    #[error("llm rate limited after {attempts} attempts: {message}")]
    LlmRateLimited { attempts: u32, message: String },

    #[error("llm response could not be parsed: {0}")]
    LlmResponseUnparseable(String),

    #[error("subprocess `{command}` exited with {code:?}: {stderr}")]
    SubprocessError {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error(transparent)]
    RunFatal(#[from] anyhow::Error),
}
