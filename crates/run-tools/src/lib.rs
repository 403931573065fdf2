mod schema;
mod tools;

pub use schema::{ToolResult, ToolSchema};
pub use tools::{build_browser_toolset, Tool, ToolRegistry};
