use std::path::Path;

use chrono::{DateTime, Utc};
use run_types::StopReason;
use serde::{Deserialize, Serialize};

/// Point in the `setup → bootstrap → plan → generate → evaluate →
/// (decide ? passed : patch) → evaluate …` state machine. Written to
/// `state.json` after every transition so a crashed run can be
/// inspected without replaying the trace log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RunPhase {
    Setup,
    Bootstrap,
    Plan,
    Generate { iteration: u32 },
    Evaluate { iteration: u32 },
    Patch { iteration: u32 },
    Finalize,
    Done { stop_reason: StopReason },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    #[serde(flatten)]
    pub phase: RunPhase,
    pub updated_at: DateTime<Utc>,
}

pub async fn persist_phase(state_path: &Path, phase: RunPhase) -> anyhow::Result<()> {
    let state = StateFile {
        phase,
        updated_at: Utc::now(),
    };
    let text = serde_json::to_string_pretty(&state)?;
    if let Some(parent) = state_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(state_path, text).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn persists_and_round_trips_a_phase() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        persist_phase(&path, RunPhase::Evaluate { iteration: 2 }).await.unwrap();

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        let state: StateFile = serde_json::from_str(&text).unwrap();
        assert_eq!(state.phase, RunPhase::Evaluate { iteration: 2 });
    }

    #[tokio::test]
    async fn overwrites_state_on_each_transition() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        persist_phase(&path, RunPhase::Setup).await.unwrap();
        persist_phase(&path, RunPhase::Finalize).await.unwrap();

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        let state: StateFile = serde_json::from_str(&text).unwrap();
        assert_eq!(state.phase, RunPhase::Finalize);
    }
}
