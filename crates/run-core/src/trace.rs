use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use run_types::EventLevel;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

/// A trace line read back off disk. Unlike `run_types::TraceEvent`,
/// `event_type` is kept as a bare `String` and unknown fields are
/// flattened into `extra` rather than rejected — readers must
/// tolerate event shapes newer than themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRecord {
    pub id: u64,
    pub timestamp: String,
    pub level: EventLevel,
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct TraceSummary {
    pub counts_by_event_type: BTreeMap<String, u64>,
    pub errors: Vec<TraceRecord>,
}

/// Append-only line-delimited JSON event log. Writes are serialized
/// through a single `tokio::sync::Mutex`-guarded file handle, matching
/// the single-writer discipline the rest of the stack uses for its
/// own durable state.
pub struct Trace {
    file: Mutex<tokio::fs::File>,
    next_id: AtomicU64,
}

impl Trace {
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path).await?;
        Ok(Self {
            file: Mutex::new(file),
            next_id: AtomicU64::new(1),
        })
    }

    pub async fn emit(&self, level: EventLevel, event_type: &str, data: Value) -> anyhow::Result<u64> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = TraceRecord {
            id,
            timestamp: Utc::now().to_rfc3339(),
            level,
            event_type: event_type.to_string(),
            data,
            extra: serde_json::Map::new(),
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(id)
    }
}

pub type SharedTrace = Arc<Trace>;

/// Replays a `trace.jsonl` file into memory, tolerating unknown
/// `event_type` strings and unknown extra fields per line.
pub struct TraceReader;

impl TraceReader {
    pub async fn read_all(path: &Path) -> anyhow::Result<Vec<TraceRecord>> {
        let file = tokio::fs::File::open(path).await?;
        let mut reader = BufReader::new(file).lines();
        let mut records = Vec::new();
        while let Some(line) = reader.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<TraceRecord>(&line) {
                Ok(record) => records.push(record),
                Err(_) => continue,
            }
        }
        Ok(records)
    }

    pub fn summarize(records: &[TraceRecord]) -> TraceSummary {
        let mut summary = TraceSummary::default();
        for record in records {
            *summary
                .counts_by_event_type
                .entry(record.event_type.clone())
                .or_insert(0) += 1;
            if matches!(record.level, EventLevel::Error) {
                summary.errors.push(record.clone());
            }
        }
        summary
    }
}

pub fn default_trace_path(workspace_dir: &Path) -> PathBuf {
    workspace_dir.join("trace.jsonl")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emitted_ids_are_monotonic() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("trace.jsonl");
        let trace = Trace::open(&path).await.unwrap();
        let a = trace.emit(EventLevel::Info, "run.started", serde_json::json!({})).await.unwrap();
        let b = trace.emit(EventLevel::Info, "iteration.started", serde_json::json!({"index": 1})).await.unwrap();
        assert!(b > a);

        let records = TraceReader::read_all(&path).await.unwrap();
        assert_eq!(records.len(), 2);
        let summary = TraceReader::summarize(&records);
        assert_eq!(summary.counts_by_event_type.get("run.started"), Some(&1));
    }

    #[tokio::test]
    async fn reader_tolerates_unknown_event_shapes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("trace.jsonl");
        tokio::fs::write(
            &path,
            "{\"id\":1,\"timestamp\":\"now\",\"level\":\"info\",\"event_type\":\"future.event\",\"data\":{},\"futureField\":true}\n",
        )
        .await
        .unwrap();
        let records = TraceReader::read_all(&path).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event_type, "future.event");
    }
}
