use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The delta between the observation taken immediately before a tool
/// call and the one taken immediately after.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub dom_changed: bool,
    pub text_changed: bool,
    pub new_console_errors: Vec<String>,
    pub dialogs_invoked: u32,
    pub url_changed: bool,
}

impl Verification {
    pub fn compute(
        before_signature: &str,
        after_signature: &str,
        before_text: &str,
        after_text: &str,
        before_console_errors: &[String],
        after_console_errors: &[String],
        dialogs_invoked: u32,
        before_url: &str,
        after_url: &str,
    ) -> Self {
        let new_console_errors = after_console_errors
            .iter()
            .filter(|e| !before_console_errors.contains(e))
            .cloned()
            .collect();
        Self {
            dom_changed: before_signature != after_signature,
            text_changed: before_text != after_text,
            new_console_errors,
            dialogs_invoked,
            url_changed: before_url != after_url,
        }
    }
}

/// One entry in the ordered exploration log: a single tool call, its
/// arguments, and the verified effect it had on the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorationStep {
    pub turn: u32,
    pub tool: String,
    pub args: Value,
    pub before_signature: String,
    pub after_signature: String,
    pub verification: Verification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<String>,
}

/// The full exploration log plus the summary the LLM gave when it
/// called `finish_exploration`, if it ever did.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExplorationLog {
    pub steps: Vec<ExplorationStep>,
    pub finish_summary: Option<String>,
}

impl ExplorationLog {
    pub fn push(&mut self, step: ExplorationStep) {
        self.steps.push(step);
    }

    pub fn console_errors_so_far(&self) -> Vec<String> {
        self.steps
            .iter()
            .flat_map(|s| s.verification.new_console_errors.iter().cloned())
            .collect()
    }

    /// Invariant I-12: for every recorded step with tool != finish_exploration,
    /// domChanged must agree with beforeSignature != afterSignature.
    pub fn verifications_are_consistent(&self) -> bool {
        self.steps.iter().all(|s| {
            s.tool == "finish_exploration"
                || (s.verification.dom_changed == (s.before_signature != s.after_signature))
        })
    }

    /// A compact textual rendering suitable for the final scoring prompt:
    /// tool, args, and whether anything observably changed, per step.
    pub fn render_compact(&self) -> String {
        let mut out = String::new();
        for step in &self.steps {
            out.push_str(&format!(
                "turn {}: {}({}) -> domChanged={} textChanged={} newConsoleErrors={} urlChanged={}\n",
                step.turn,
                step.tool,
                step.args,
                step.verification.dom_changed,
                step.verification.text_changed,
                step.verification.new_console_errors.len(),
                step.verification.url_changed,
            ));
        }
        if let Some(summary) = &self.finish_summary {
            out.push_str(&format!("finish_exploration: {summary}\n"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_detects_changed_signature_and_new_errors() {
        let v = Verification::compute(
            "sig-a",
            "sig-b",
            "hello",
            "hello world",
            &["old error".to_string()],
            &["old error".to_string(), "new error".to_string()],
            0,
            "https://x/",
            "https://x/",
        );
        assert!(v.dom_changed);
        assert!(v.text_changed);
        assert_eq!(v.new_console_errors, vec!["new error".to_string()]);
        assert!(!v.url_changed);
    }

    #[test]
    fn consistency_check_flags_contradictory_step() {
        let mut log = ExplorationLog::default();
        log.push(ExplorationStep {
            turn: 1,
            tool: "browser_click".to_string(),
            args: serde_json::json!({"selector": "#go"}),
            before_signature: "a".to_string(),
            after_signature: "a".to_string(),
            verification: Verification {
                dom_changed: true,
                ..Default::default()
            },
            screenshot_path: None,
        });
        assert!(!log.verifications_are_consistent());
    }

    #[test]
    fn finish_exploration_step_is_exempt_from_consistency_check() {
        let mut log = ExplorationLog::default();
        log.push(ExplorationStep {
            turn: 2,
            tool: "finish_exploration".to_string(),
            args: serde_json::json!({"summary": "done"}),
            before_signature: "a".to_string(),
            after_signature: "a".to_string(),
            verification: Verification {
                dom_changed: true,
                ..Default::default()
            },
            screenshot_path: None,
        });
        assert!(log.verifications_are_consistent());
    }
}
