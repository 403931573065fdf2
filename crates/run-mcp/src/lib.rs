pub mod client;
pub mod wire;

pub use client::{ConnectionStatus, McpClient, DEFAULT_TIMEOUT, EVALUATE_TIMEOUT, SCREENSHOT_TIMEOUT, SNAPSHOT_TIMEOUT};
pub use wire::{JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
