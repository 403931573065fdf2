mod backend;
mod client;
mod diff;
mod snapshot;

pub use backend::{AgentBackend, BackendInvocation, LocalLibraryBackend, MockBackend, SubprocessBackend, AGENT_CALL_TIMEOUT};
pub use client::{AgentClient, GenerateResult, PatchResult, TodoResult};
pub use diff::{diff_snapshots, FileChangeKind, FileDiff};
pub use snapshot::{capture, WorkspaceSnapshot};
