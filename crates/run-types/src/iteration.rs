use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::verdict::Verdict;

/// One pass through generate/evaluate/(patch). Created at iteration
/// start, finalized exactly once after evaluation, immutable after
/// that — the controller never mutates a past `Iteration`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Iteration {
    pub index: u32,
    #[serde(default)]
    pub files_touched: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub generation_duration_ms: u64,
    #[serde(default)]
    pub evaluation_duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(default)]
    pub passed: bool,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub screenshot_paths: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
}

impl Iteration {
    pub fn start(index: u32) -> Self {
        Self {
            index,
            files_touched: BTreeMap::new(),
            generation_duration_ms: 0,
            evaluation_duration_ms: 0,
            score: None,
            passed: false,
            feedback: String::new(),
            screenshot_paths: Vec::new(),
            verdict: None,
        }
    }

    /// Finalizing is a one-way transition; later calls are rejected by
    /// the controller, not by this type, which just records the data.
    pub fn finalize(&mut self, verdict: Verdict, screenshot_paths: Vec<PathBuf>) {
        self.passed = verdict.passed;
        self.score = Some(verdict.score);
        self.feedback = verdict.feedback.clone();
        self.screenshot_paths = screenshot_paths;
        self.verdict = Some(verdict);
    }
}
