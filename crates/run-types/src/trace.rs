use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// One line of the append-only trace log. `event_type` and `data` are
/// deliberately loose (`String` / `serde_json::Value`) — new event
/// producers must never break old readers replaying a trace file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEvent {
    pub id: u64,
    pub timestamp: String,
    pub level: EventLevel,
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
}
