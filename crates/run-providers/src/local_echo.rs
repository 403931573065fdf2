use async_trait::async_trait;

use crate::chat::{ChatMessage, ChatResponse};
use crate::provider::{ModelInfo, Provider, ProviderCallError, ProviderInfo};

/// Zero-network provider used for `AGENT_MODE=mock` wiring and tests.
/// Grounded on the teacher's own echo provider, kept dependency-free so
/// tests never touch the network.
pub struct LocalEchoProvider;

impl LocalEchoProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalEchoProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for LocalEchoProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            id: "local".to_string(),
            name: "Local Echo".to_string(),
            models: vec![ModelInfo {
                id: "echo-1".to_string(),
                provider_id: "local".to_string(),
                display_name: "Echo Model".to_string(),
                context_window: 8192,
            }],
        }
    }

    async fn complete(
        &self,
        prompt: &str,
        _model_override: Option<&str>,
    ) -> Result<String, ProviderCallError> {
        Ok(format!("Echo: {prompt}"))
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        _tools: &[crate::chat::ToolSchema],
        _model_override: Option<&str>,
    ) -> Result<ChatResponse, ProviderCallError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, crate::chat::Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("");
        Ok(ChatResponse::text_only(format!("Echo: {last_user}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_the_prompt_back() {
        let provider = LocalEchoProvider::new();
        let text = provider.complete("hi", None).await.unwrap();
        assert_eq!(text, "Echo: hi");
    }
}
