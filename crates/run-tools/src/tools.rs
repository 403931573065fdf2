use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use run_mcp::McpClient;
use run_types::RunError;
use serde_json::{json, Value};

use crate::schema::{ToolResult, ToolSchema};

#[async_trait]
pub trait Tool: Send + Sync {
    fn schema(&self) -> ToolSchema;
    async fn execute(&self, args: Value) -> ToolResult;
}

/// Thin dispatch map over the evaluator's browser toolset, mirroring
/// how tool calls get routed to an `McpClient` one layer down.
#[derive(Clone)]
pub struct ToolRegistry {
    tools: Arc<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        let mut map = HashMap::new();
        for tool in tools {
            map.insert(tool.schema().name.clone(), tool);
        }
        Self { tools: Arc::new(map) }
    }

    pub fn list(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self.tools.values().map(|t| t.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    pub async fn execute(&self, name: &str, args: Value) -> ToolResult {
        match self.tools.get(name) {
            Some(tool) => tool.execute(args).await,
            None => ToolResult::err(format!("unknown tool: {name}")),
        }
    }
}

fn mcp_error_result(err: RunError) -> ToolResult {
    ToolResult::err(err.to_string())
}

fn selector_arg(args: &Value) -> Result<&str, ToolResult> {
    args.get("selector")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolResult::err("missing required `selector` argument"))
}

struct BrowserClickTool {
    mcp: Arc<McpClient>,
}

#[async_trait]
impl Tool for BrowserClickTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "browser_click".to_string(),
            description: "Click the element matching a stable selector".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": { "selector": { "type": "string" } },
                "required": ["selector"],
            }),
        }
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let selector = match selector_arg(&args) {
            Ok(s) => s,
            Err(result) => return result,
        };
        match self.mcp.click(selector).await {
            Ok(value) => ToolResult::ok(value),
            Err(e) => mcp_error_result(e),
        }
    }
}

struct BrowserTypeTool {
    mcp: Arc<McpClient>,
}

#[async_trait]
impl Tool for BrowserTypeTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "browser_type".to_string(),
            description: "Type text into the element matching a stable selector".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "selector": { "type": "string" },
                    "text": { "type": "string" },
                },
                "required": ["selector", "text"],
            }),
        }
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let selector = match selector_arg(&args) {
            Ok(s) => s,
            Err(result) => return result,
        };
        let Some(text) = args.get("text").and_then(Value::as_str) else {
            return ToolResult::err("missing required `text` argument");
        };
        match self.mcp.type_text(selector, text).await {
            Ok(value) => ToolResult::ok(value),
            Err(e) => mcp_error_result(e),
        }
    }
}

struct BrowserScrollTool {
    mcp: Arc<McpClient>,
}

#[async_trait]
impl Tool for BrowserScrollTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "browser_scroll".to_string(),
            description: "Scroll the page in a direction by an optional amount".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "direction": { "type": "string", "enum": ["up", "down", "left", "right"] },
                    "amount": { "type": "integer" },
                },
                "required": ["direction"],
            }),
        }
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let Some(direction) = args.get("direction").and_then(Value::as_str) else {
            return ToolResult::err("missing required `direction` argument");
        };
        let amount = args.get("amount").and_then(Value::as_i64);
        match self.mcp.scroll(direction, amount).await {
            Ok(value) => ToolResult::ok(value),
            Err(e) => mcp_error_result(e),
        }
    }
}

struct BrowserHoverTool {
    mcp: Arc<McpClient>,
}

#[async_trait]
impl Tool for BrowserHoverTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "browser_hover".to_string(),
            description: "Hover the element matching a stable selector".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": { "selector": { "type": "string" } },
                "required": ["selector"],
            }),
        }
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let selector = match selector_arg(&args) {
            Ok(s) => s,
            Err(result) => return result,
        };
        match self.mcp.hover(selector).await {
            Ok(value) => ToolResult::ok(value),
            Err(e) => mcp_error_result(e),
        }
    }
}

struct BrowserPressKeyTool {
    mcp: Arc<McpClient>,
}

#[async_trait]
impl Tool for BrowserPressKeyTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "browser_press_key".to_string(),
            description: "Press a single keyboard key".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": { "key": { "type": "string" } },
                "required": ["key"],
            }),
        }
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let Some(key) = args.get("key").and_then(Value::as_str) else {
            return ToolResult::err("missing required `key` argument");
        };
        match self.mcp.press_key(key).await {
            Ok(value) => ToolResult::ok(value),
            Err(e) => mcp_error_result(e),
        }
    }
}

struct BrowserEvaluateTool {
    mcp: Arc<McpClient>,
}

#[async_trait]
impl Tool for BrowserEvaluateTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "browser_evaluate".to_string(),
            description: "Evaluate a JavaScript expression in the page context".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": { "expression": { "type": "string" } },
                "required": ["expression"],
            }),
        }
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let Some(expression) = args.get("expression").and_then(Value::as_str) else {
            return ToolResult::err("missing required `expression` argument");
        };
        match self.mcp.evaluate(expression).await {
            Ok(value) => ToolResult::ok(value),
            Err(e) => mcp_error_result(e),
        }
    }
}

struct BrowserWaitForTool {
    mcp: Arc<McpClient>,
}

#[async_trait]
impl Tool for BrowserWaitForTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "browser_wait_for".to_string(),
            description: "Wait until a condition holds, or a timeout elapses".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "condition": { "type": "string" },
                    "timeoutMs": { "type": "integer" },
                },
                "required": ["condition"],
            }),
        }
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let Some(condition) = args.get("condition").and_then(Value::as_str) else {
            return ToolResult::err("missing required `condition` argument");
        };
        let timeout_ms = args.get("timeoutMs").and_then(Value::as_u64);
        match self.mcp.wait_for(condition, timeout_ms).await {
            Ok(value) => ToolResult::ok(value),
            Err(e) => mcp_error_result(e),
        }
    }
}

struct BrowserGetUrlTool {
    mcp: Arc<McpClient>,
}

#[async_trait]
impl Tool for BrowserGetUrlTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "browser_get_url".to_string(),
            description: "Return the current page URL".to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn execute(&self, _args: Value) -> ToolResult {
        match self.mcp.evaluate("window.location.href").await {
            Ok(value) => ToolResult::ok(value),
            Err(e) => mcp_error_result(e),
        }
    }
}

struct BrowserDomSnapshotTool {
    mcp: Arc<McpClient>,
}

#[async_trait]
impl Tool for BrowserDomSnapshotTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "browser_dom_snapshot".to_string(),
            description: "Return a structural snapshot of the visible page".to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn execute(&self, _args: Value) -> ToolResult {
        match self.mcp.snapshot().await {
            Ok(value) => ToolResult::ok(value),
            Err(e) => mcp_error_result(e),
        }
    }
}

/// Not an MCP-backed tool: calling it is how the evaluator LLM signals
/// it is done exploring. The evaluator's turn loop watches for this
/// tool name directly rather than routing it through the registry,
/// but it is still advertised here so the LLM's tool list is complete.
pub struct FinishExplorationTool;

#[async_trait]
impl Tool for FinishExplorationTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "finish_exploration".to_string(),
            description: "Signal that exploration is complete and scoring should begin".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": { "summary": { "type": "string" } },
                "required": ["summary"],
            }),
        }
    }

    async fn execute(&self, args: Value) -> ToolResult {
        ToolResult::ok(args)
    }
}

pub fn build_browser_toolset(mcp: Arc<McpClient>) -> ToolRegistry {
    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(BrowserClickTool { mcp: mcp.clone() }),
        Arc::new(BrowserTypeTool { mcp: mcp.clone() }),
        Arc::new(BrowserScrollTool { mcp: mcp.clone() }),
        Arc::new(BrowserHoverTool { mcp: mcp.clone() }),
        Arc::new(BrowserPressKeyTool { mcp: mcp.clone() }),
        Arc::new(BrowserEvaluateTool { mcp: mcp.clone() }),
        Arc::new(BrowserWaitForTool { mcp: mcp.clone() }),
        Arc::new(BrowserGetUrlTool { mcp: mcp.clone() }),
        Arc::new(BrowserDomSnapshotTool { mcp }),
        Arc::new(FinishExplorationTool),
    ];
    ToolRegistry::new(tools)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toolset_schema_names_match_the_documented_toolset() {
        // Built without a real McpClient: schema() never touches the
        // subprocess, only execute() does.
        let finish = FinishExplorationTool.schema();
        assert_eq!(finish.name, "finish_exploration");
    }
}
