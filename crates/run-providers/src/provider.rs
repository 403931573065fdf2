use std::time::Duration;

use async_trait::async_trait;
use run_types::RunError;
use serde::{Deserialize, Serialize};

use crate::chat::{ChatMessage, ChatResponse, ToolSchema};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub provider_id: String,
    pub display_name: String,
    pub context_window: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

/// Outcome of a single provider call, distinguishing a server-advertised
/// rate limit from any other failure so callers can drive
/// `run_core::retry::with_rate_limit_backoff` around it without this
/// crate depending on HTTP status codes.
pub enum ProviderCallError {
    RateLimited { server_hint: Option<Duration> },
    Other(RunError),
}

impl From<RunError> for ProviderCallError {
    fn from(err: RunError) -> Self {
        ProviderCallError::Other(err)
    }
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn info(&self) -> ProviderInfo;

    /// The planner's contract: a single string prompt in, a single
    /// string response out.
    async fn complete(
        &self,
        prompt: &str,
        model_override: Option<&str>,
    ) -> Result<String, ProviderCallError>;

    /// The evaluator's contract: a running tool-use conversation with
    /// optional image attachments, returning text plus any requested
    /// tool calls. The default implementation flattens the messages
    /// into a single prompt and calls `complete`, so providers that
    /// have no native tool-use story still work for the evaluator in
    /// a degraded, text-only fashion.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolSchema],
        model_override: Option<&str>,
    ) -> Result<ChatResponse, ProviderCallError> {
        let prompt = messages
            .iter()
            .map(|m| format!("{:?}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");
        let text = self.complete(&prompt, model_override).await?;
        Ok(ChatResponse::text_only(text))
    }
}
