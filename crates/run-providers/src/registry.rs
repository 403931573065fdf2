use std::collections::HashMap;
use std::sync::Arc;

use run_core::retry::{with_rate_limit_backoff, AttemptOutcome};
use run_types::RunError;

use crate::chat::{ChatMessage, ChatResponse, ToolSchema};
use crate::provider::{Provider, ProviderCallError, ProviderInfo};

/// Holds every configured provider by id, resolving the planner's and
/// evaluator's model identifiers (`providerId/modelId` strings, e.g.
/// `openai/gpt-4o-mini`) to a concrete backend.
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: Arc<HashMap<String, Arc<dyn Provider>>>,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        let mut map = HashMap::new();
        for provider in providers {
            map.insert(provider.info().id.clone(), provider);
        }
        Self {
            providers: Arc::new(map),
        }
    }

    pub fn list(&self) -> Vec<ProviderInfo> {
        let mut infos: Vec<ProviderInfo> = self.providers.values().map(|p| p.info()).collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    fn resolve(&self, model_identifier: &str) -> Result<(Arc<dyn Provider>, Option<&str>), RunError> {
        let provider_id = model_identifier
            .split('/')
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                RunError::ConfigError(format!(
                    "model identifier `{model_identifier}` is not of the form providerId/modelId"
                ))
            })?;
        let model = model_identifier
            .strip_prefix(provider_id)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|s| !s.is_empty());
        let provider = self.providers.get(provider_id).cloned().ok_or_else(|| {
            RunError::ConfigError(format!("no provider configured for id `{provider_id}`"))
        })?;
        Ok((provider, model))
    }

    /// Runs the planner's single-prompt contract against `model_identifier`,
    /// retrying on rate limits with bounded exponential backoff.
    pub async fn complete(&self, model_identifier: &str, prompt: &str) -> Result<String, RunError> {
        let (provider, model) = self.resolve(model_identifier)?;
        let result = with_rate_limit_backoff(|_attempt| {
            let provider = provider.clone();
            let model = model.map(str::to_string);
            let prompt = prompt.to_string();
            async move {
                match provider.complete(&prompt, model.as_deref()).await {
                    Ok(text) => AttemptOutcome::Done(Ok(text)),
                    Err(ProviderCallError::RateLimited { server_hint }) => {
                        AttemptOutcome::RateLimited { server_hint }
                    }
                    Err(ProviderCallError::Other(err)) => AttemptOutcome::Done(Err(err)),
                }
            }
        })
        .await;

        match result {
            Ok(inner) => inner,
            Err(attempts) => Err(RunError::LlmRateLimited {
                attempts,
                message: format!("provider `{model_identifier}` stayed rate limited"),
            }),
        }
    }

    /// Runs the evaluator's tool-use contract against `model_identifier`.
    pub async fn chat(
        &self,
        model_identifier: &str,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
    ) -> Result<ChatResponse, RunError> {
        let (provider, model) = self.resolve(model_identifier)?;
        let result = with_rate_limit_backoff(|_attempt| {
            let provider = provider.clone();
            let model = model.map(str::to_string);
            async move {
                match provider.chat(messages, tools, model.as_deref()).await {
                    Ok(response) => AttemptOutcome::Done(Ok(response)),
                    Err(ProviderCallError::RateLimited { server_hint }) => {
                        AttemptOutcome::RateLimited { server_hint }
                    }
                    Err(ProviderCallError::Other(err)) => AttemptOutcome::Done(Err(err)),
                }
            }
        })
        .await;

        match result {
            Ok(inner) => inner,
            Err(attempts) => Err(RunError::LlmRateLimited {
                attempts,
                message: format!("provider `{model_identifier}` stayed rate limited"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_echo::LocalEchoProvider;

    #[tokio::test]
    async fn resolves_provider_id_and_model_from_slash_identifier() {
        let registry = ProviderRegistry::new(vec![Arc::new(LocalEchoProvider::new())]);
        let text = registry.complete("local/echo-1", "hello").await.unwrap();
        assert_eq!(text, "Echo: hello");
    }

    #[tokio::test]
    async fn unknown_provider_id_is_a_config_error() {
        let registry = ProviderRegistry::new(vec![Arc::new(LocalEchoProvider::new())]);
        let err = registry.complete("nope/nope", "hello").await.unwrap_err();
        assert!(matches!(err, RunError::ConfigError(_)));
    }
}
