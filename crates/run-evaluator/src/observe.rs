use std::path::{Path, PathBuf};
use std::sync::Arc;

use run_mcp::McpClient;
use run_types::{BrowserObservation, RunError};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::dialog::{DIALOG_INTERCEPTOR_SCRIPT, DRAIN_DIALOG_BUFFER_SCRIPT};
use crate::selector::{derive_stable_selectors, extract_candidates};

const VISIBLE_TEXT_EXPRESSION: &str = "document.body ? document.body.innerText : ''";

pub struct Observer {
    mcp: Arc<McpClient>,
    screenshots_dir: PathBuf,
    dialog_installed: bool,
}

impl Observer {
    pub fn new(mcp: Arc<McpClient>, screenshots_dir: PathBuf) -> Self {
        Self {
            mcp,
            screenshots_dir,
            dialog_installed: false,
        }
    }

    /// Navigates to `url` and installs the dialog interceptor. Must be
    /// called exactly once, before the first observation.
    pub async fn navigate(&mut self, url: &str) -> Result<(), RunError> {
        self.mcp.navigate(url).await?;
        self.mcp.evaluate(DIALOG_INTERCEPTOR_SCRIPT).await?;
        self.dialog_installed = true;
        Ok(())
    }

    pub async fn observe(&self, turn: u32) -> Result<BrowserObservation, RunError> {
        let visible_text = self.visible_text().await?;
        let snapshot = self.mcp.snapshot().await?;
        let candidates = extract_candidates(&snapshot);
        let interactive_targets = derive_stable_selectors(&candidates);
        let console_errors = self.console_errors().await?;
        let dialog_calls = self.drain_dialog_buffer().await?;
        let url = self.current_url().await?;
        let dom_signature = compute_dom_signature(&visible_text, &snapshot);

        let screenshot_path = self.screenshot(turn).await.ok();

        Ok(BrowserObservation {
            desktop_screenshot_path: screenshot_path,
            mobile_screenshot_path: None,
            visible_text,
            interactive_targets,
            console_errors,
            dom_signature,
            dialog_calls,
            url,
        })
    }

    async fn visible_text(&self) -> Result<String, RunError> {
        let value = self.mcp.evaluate(VISIBLE_TEXT_EXPRESSION).await?;
        Ok(extract_text(&value))
    }

    async fn console_errors(&self) -> Result<Vec<String>, RunError> {
        let value = self.mcp.console_messages().await?;
        Ok(extract_console_errors(&value))
    }

    async fn drain_dialog_buffer(&self) -> Result<u32, RunError> {
        if !self.dialog_installed {
            return Ok(0);
        }
        let value = self.mcp.evaluate(DRAIN_DIALOG_BUFFER_SCRIPT).await?;
        let count = value
            .as_u64()
            .or_else(|| value.as_f64().map(|f| f as u64))
            .or_else(|| extract_text(&value).trim().parse().ok())
            .unwrap_or(0);
        Ok(count as u32)
    }

    async fn current_url(&self) -> Result<String, RunError> {
        let value = self.mcp.evaluate("window.location.href").await?;
        Ok(extract_text(&value))
    }

    async fn screenshot(&self, turn: u32) -> Result<String, RunError> {
        let filename = format!("turn_{turn:03}.png");
        let path = self.screenshots_dir.join(&filename);
        self.mcp
            .screenshot(path.to_string_lossy().as_ref(), true)
            .await?;
        Ok(path.to_string_lossy().to_string())
    }
}

fn extract_text(value: &Value) -> String {
    if let Some(s) = value.as_str() {
        return s.to_string();
    }
    for key in ["result", "value", "text"] {
        if let Some(s) = value.get(key).and_then(Value::as_str) {
            return s.to_string();
        }
    }
    if value.is_null() {
        return String::new();
    }
    value.to_string()
}

fn extract_console_errors(value: &Value) -> Vec<String> {
    let entries = value
        .as_array()
        .cloned()
        .or_else(|| value.get("messages").and_then(Value::as_array).cloned())
        .unwrap_or_default();

    entries
        .into_iter()
        .filter(|entry| {
            entry
                .get("type")
                .or_else(|| entry.get("level"))
                .and_then(Value::as_str)
                .map(|level| level.eq_ignore_ascii_case("error"))
                .unwrap_or(false)
        })
        .map(|entry| {
            entry
                .get("text")
                .or_else(|| entry.get("message"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}

fn compute_dom_signature(visible_text: &str, snapshot: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(visible_text.as_bytes());
    hasher.update(snapshot.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_string_values() {
        assert_eq!(extract_text(&Value::String("hello".to_string())), "hello");
    }

    #[test]
    fn extracts_nested_result_field() {
        let value = serde_json::json!({ "result": "https://example.test/" });
        assert_eq!(extract_text(&value), "https://example.test/");
    }

    #[test]
    fn filters_console_entries_to_errors_only() {
        let value = serde_json::json!([
            { "type": "log", "text": "loaded" },
            { "type": "error", "text": "boom" },
        ]);
        let errors = extract_console_errors(&value);
        assert_eq!(errors, vec!["boom".to_string()]);
    }

    #[test]
    fn dom_signature_changes_when_visible_text_changes() {
        let snapshot = serde_json::json!({"role": "document"});
        let a = compute_dom_signature("hello", &snapshot);
        let b = compute_dom_signature("goodbye", &snapshot);
        assert_ne!(a, b);
    }
}
