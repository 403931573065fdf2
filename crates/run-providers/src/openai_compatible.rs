use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use run_types::RunError;
use serde_json::{json, Value};

use crate::chat::{ChatMessage, ChatResponse, Role, ToolCall, ToolSchema};
use crate::provider::{ModelInfo, Provider, ProviderCallError, ProviderInfo};

/// Provider for any backend speaking the OpenAI `/chat/completions`
/// wire shape: OpenAI itself, OpenRouter, Groq, local Ollama, etc.
/// Grounded on the teacher's `OpenAICompatibleProvider`, extended with
/// the rate-limit and tool-use handling this orchestrator's contract
/// requires.
pub struct OpenAICompatibleProvider {
    id: String,
    name: String,
    base_url: String,
    api_key: Option<String>,
    default_model: String,
    client: Client,
}

impl OpenAICompatibleProvider {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        base_url: impl Into<String>,
        default_model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            base_url: base_url.into(),
            api_key,
            default_model: default_model.into(),
            client: Client::new(),
        }
    }

    fn resolve_model<'a>(&'a self, model_override: Option<&'a str>) -> &'a str {
        model_override
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.default_model.as_str())
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let req = if self.id == "openrouter" {
            req.header("HTTP-Referer", "https://example.invalid")
                .header("X-Title", "run-controller")
        } else {
            req
        };
        match &self.api_key {
            Some(api_key) => req.bearer_auth(api_key),
            None => req,
        }
    }

    async fn send(&self, body: Value) -> Result<Value, ProviderCallError> {
        let url = format!("{}/chat/completions", self.base_url);
        let req = self.authed(self.client.post(url).json(&body));
        let response = req
            .send()
            .await
            .map_err(|e| ProviderCallError::Other(RunError::RunFatal(e.into())))?;

        let status = response.status();
        if status.as_u16() == 429 {
            let server_hint = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderCallError::RateLimited { server_hint });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| ProviderCallError::Other(RunError::RunFatal(e.into())))?;

        if !status.is_success() {
            let detail = extract_error(&value)
                .unwrap_or_else(|| format!("provider request failed with status {status}"));
            return Err(ProviderCallError::Other(RunError::LlmResponseUnparseable(
                detail,
            )));
        }
        if let Some(detail) = extract_error(&value) {
            return Err(ProviderCallError::Other(RunError::LlmResponseUnparseable(
                detail,
            )));
        }
        Ok(value)
    }
}

#[async_trait]
impl Provider for OpenAICompatibleProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            models: vec![ModelInfo {
                id: self.default_model.clone(),
                provider_id: self.id.clone(),
                display_name: self.default_model.clone(),
                context_window: 128_000,
            }],
        }
    }

    async fn complete(
        &self,
        prompt: &str,
        model_override: Option<&str>,
    ) -> Result<String, ProviderCallError> {
        let model = self.resolve_model(model_override);
        let body = json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
            "stream": false,
        });
        let value = self.send(body).await?;
        extract_text(&value).ok_or_else(|| {
            ProviderCallError::Other(RunError::LlmResponseUnparseable(format!(
                "provider returned no completion content for model `{model}`"
            )))
        })
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
        model_override: Option<&str>,
    ) -> Result<ChatResponse, ProviderCallError> {
        let model = self.resolve_model(model_override);
        let wire_messages: Vec<Value> = messages.iter().map(wire_message).collect();

        let mut body = json!({
            "model": model,
            "messages": wire_messages,
            "stream": false,
        });
        if !tools.is_empty() {
            let wire_tools: Vec<Value> = tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.input_schema,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(wire_tools);
            body["tool_choice"] = json!("auto");
        }

        let value = self.send(body).await?;
        let choice = value.get("choices").and_then(|c| c.get(0));
        let message = choice.and_then(|c| c.get("message"));
        let text = message
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let tool_calls = message
            .and_then(|m| m.get("tool_calls"))
            .and_then(Value::as_array)
            .map(|calls| calls.iter().filter_map(parse_tool_call).collect())
            .unwrap_or_default();

        Ok(ChatResponse { text, tool_calls })
    }
}

fn wire_message(message: &ChatMessage) -> Value {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };
    if message.images.is_empty() {
        let mut value = json!({ "role": role, "content": message.content });
        if let Some(id) = &message.tool_call_id {
            value["tool_call_id"] = json!(id);
        }
        value
    } else {
        let mut parts = vec![json!({ "type": "text", "text": message.content })];
        for image in &message.images {
            parts.push(json!({
                "type": "image_url",
                "image_url": {
                    "url": format!(
                        "data:{};base64,{}",
                        image.media_type,
                        base64::engine::general_purpose::STANDARD.encode(&image.data)
                    )
                }
            }));
        }
        json!({ "role": role, "content": parts })
    }
}

fn parse_tool_call(call: &Value) -> Option<ToolCall> {
    let id = call.get("id")?.as_str()?.to_string();
    let function = call.get("function")?;
    let name = function.get("name")?.as_str()?.to_string();
    let args_text = function.get("arguments").and_then(Value::as_str).unwrap_or("{}");
    let args = serde_json::from_str(args_text).unwrap_or(Value::Null);
    Some(ToolCall { id, name, args })
}

fn extract_text(value: &Value) -> Option<String> {
    let text = value
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()?
        .to_string();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

fn extract_error(value: &Value) -> Option<String> {
    value
        .get("error")
        .and_then(|v| v.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_model_override_over_default() {
        let provider = OpenAICompatibleProvider::new("openai", "OpenAI", "https://api.openai.com/v1", "gpt-4o-mini", None);
        assert_eq!(provider.resolve_model(Some("gpt-4o")), "gpt-4o");
        assert_eq!(provider.resolve_model(None), "gpt-4o-mini");
        assert_eq!(provider.resolve_model(Some("  ")), "gpt-4o-mini");
    }

    #[test]
    fn extracts_text_from_chat_completion_shape() {
        let value = json!({
            "choices": [{ "message": { "content": "hello there" } }]
        });
        assert_eq!(extract_text(&value), Some("hello there".to_string()));
    }

    #[test]
    fn extracts_tool_calls_from_chat_completion_shape() {
        let call = json!({
            "id": "call_1",
            "function": { "name": "browser_click", "arguments": "{\"selector\":\"#go\"}" }
        });
        let parsed = parse_tool_call(&call).unwrap();
        assert_eq!(parsed.name, "browser_click");
        assert_eq!(parsed.args["selector"], "#go");
    }
}
