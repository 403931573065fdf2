use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Passed,
    MaxIterations,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VcsMetadata {
    pub branch: String,
    #[serde(default)]
    pub commit_ids: Vec<String>,
}

/// The whole-document summary rewritten to disk after every iteration.
/// Unlike the trace log, the manifest is never appended to — it is
/// always the full, current picture of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub run_id: String,
    pub task: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub planner_model: String,
    pub evaluator_model: String,
    pub rubric_id: String,
    #[serde(default)]
    pub iteration_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs: Option<VcsMetadata>,
    pub workspace_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub site_dir: PathBuf,
    pub preview_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

impl Manifest {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        run_id: impl Into<String>,
        task: impl Into<String>,
        planner_model: impl Into<String>,
        evaluator_model: impl Into<String>,
        rubric_id: impl Into<String>,
        workspace_dir: PathBuf,
        artifacts_dir: PathBuf,
        site_dir: PathBuf,
        preview_url: impl Into<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            task: task.into(),
            started_at: Utc::now(),
            ended_at: None,
            planner_model: planner_model.into(),
            evaluator_model: evaluator_model.into(),
            rubric_id: rubric_id.into(),
            iteration_count: 0,
            final_score: None,
            stop_reason: None,
            vcs: None,
            workspace_dir,
            artifacts_dir,
            site_dir,
            preview_url: preview_url.into(),
            error_message: None,
            artifacts: Vec::new(),
        }
    }

    pub fn record_iteration(&mut self, score: Option<u32>) {
        self.iteration_count += 1;
        if score.is_some() {
            self.final_score = score;
        }
    }

    pub fn finish(&mut self, reason: StopReason, error_message: Option<String>) {
        self.ended_at = Some(Utc::now());
        self.stop_reason = Some(reason);
        self.error_message = error_message;
    }
}
