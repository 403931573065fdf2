pub mod artifacts;
pub mod config;
pub mod event_bus;
pub mod json_extract;
pub mod paths;
pub mod retry;
pub mod trace;

pub use artifacts::Artifacts;
pub use config::{AgentMode, CliOverrides, Config, ConfigFile};
pub use event_bus::EventBus;
pub use json_extract::extract_json;
pub use paths::PathConfig;
pub use retry::{with_rate_limit_backoff, AttemptOutcome, MAX_RATE_LIMIT_ATTEMPTS};
pub use trace::{default_trace_path, SharedTrace, Trace, TraceReader, TraceRecord, TraceSummary};
