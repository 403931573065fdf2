use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub category: String,
    pub severity: Severity,
    pub description: String,
    #[serde(default)]
    pub repro_steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_ref: Option<String>,
}

/// The evaluator's final structured output for one iteration.
///
/// `category_scores` uses a `BTreeMap` so serialized JSON has a
/// deterministic key order, which keeps golden-file tests stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub score: u32,
    pub passed: bool,
    pub category_scores: BTreeMap<String, u32>,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub fix_suggestions: Vec<String>,
    pub feedback: String,
    pub rubric_id: String,
}

impl Verdict {
    pub const PASS_THRESHOLD: u32 = 70;

    /// Score clamps to [0, 100]; `passed` is recomputed from the
    /// clamped score so a caller can never construct an inconsistent
    /// pair by hand.
    pub fn new(
        score: u32,
        category_scores: BTreeMap<String, u32>,
        issues: Vec<Issue>,
        fix_suggestions: Vec<String>,
        feedback: impl Into<String>,
        rubric_id: impl Into<String>,
    ) -> Self {
        let score = score.min(100);
        Self {
            score,
            passed: score >= Self::PASS_THRESHOLD,
            category_scores,
            issues,
            fix_suggestions,
            feedback: feedback.into(),
            rubric_id: rubric_id.into(),
        }
    }

    /// Degraded verdict emitted when the evaluation subsystem itself
    /// fails (MCP subprocess death, unparseable scoring response).
    pub fn degraded(feedback: impl Into<String>, rubric_id: impl Into<String>) -> Self {
        Self::new(
            50,
            BTreeMap::new(),
            vec![Issue {
                category: "robustness".to_string(),
                severity: Severity::High,
                description: "evaluation failed".to_string(),
                repro_steps: Vec::new(),
                screenshot_ref: None,
            }],
            Vec::new(),
            feedback,
            rubric_id,
        )
    }

    /// Sum of category scores should equal the overall score within
    /// ±1 rounding (Testable Property 7).
    pub fn category_sum_matches_score(&self) -> bool {
        let sum: i64 = self.category_scores.values().map(|v| *v as i64).sum();
        (sum - self.score as i64).abs() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passed_is_derived_from_score() {
        let v = Verdict::new(69, BTreeMap::new(), vec![], vec![], "close", "default-v1");
        assert!(!v.passed);
        let v = Verdict::new(70, BTreeMap::new(), vec![], vec![], "ok", "default-v1");
        assert!(v.passed);
    }

    #[test]
    fn score_clamps_to_one_hundred() {
        let v = Verdict::new(140, BTreeMap::new(), vec![], vec![], "overshoot", "default-v1");
        assert_eq!(v.score, 100);
    }

    #[test]
    fn degraded_verdict_never_passes() {
        let v = Verdict::degraded("browser subprocess died", "default-v1");
        assert!(!v.passed);
        assert_eq!(v.score, 50);
        assert_eq!(v.issues.len(), 1);
    }

    #[test]
    fn category_sum_matches_score_tolerates_rounding() {
        let mut scores = BTreeMap::new();
        scores.insert("functionality".to_string(), 22);
        scores.insert("visual_design".to_string(), 22);
        scores.insert("accessibility".to_string(), 12);
        scores.insert("responsiveness".to_string(), 12);
        scores.insert("robustness".to_string(), 3);
        let v = Verdict::new(72, scores, vec![], vec![], "ok", "default-v1");
        assert!(v.category_sum_matches_score());
    }
}
