use std::collections::BTreeMap;

use run_providers::{ChatMessage, ImageAttachment, ProviderRegistry};
use run_types::{Issue, RunError, Severity, Verdict};
use serde::Deserialize;

use crate::exploration::ExplorationLog;
use crate::rubric::Rubric;

const SCORING_SYSTEM_PROMPT: &str = "You are scoring a generated web page against a rubric, \
using the task description, the exploration log of tool calls already executed against the \
page, and screenshots from the first, a middle, and the last turn. functionality must weigh at \
least as much as every other category. If any interactive feature was broken during \
exploration, cap the overall score at 40. If the exploration log shows new console errors, the \
robustness category score must be 0. A blank or unreachable page is a critical issue. Respond \
with JSON only, matching: {\"score\": number, \"categoryScores\": {category: number, ...}, \
\"issues\": [{\"category\": string, \"severity\": \"low\"|\"medium\"|\"high\"|\"critical\", \
\"description\": string}], \"fixSuggestions\": [string], \"feedback\": string}.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireIssue {
    category: String,
    severity: Severity,
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoringWireResponse {
    score: u32,
    #[serde(default)]
    category_scores: BTreeMap<String, u32>,
    #[serde(default)]
    issues: Vec<WireIssue>,
    #[serde(default)]
    fix_suggestions: Vec<String>,
    feedback: String,
}

fn pick_screenshots(log: &ExplorationLog) -> Vec<String> {
    let paths: Vec<&String> = log
        .steps
        .iter()
        .filter_map(|s| s.screenshot_path.as_ref())
        .collect();
    if paths.is_empty() {
        return Vec::new();
    }
    let first = paths[0].clone();
    let last = paths[paths.len() - 1].clone();
    let median = paths[paths.len() / 2].clone();
    let mut out = vec![first];
    if median != out[0] {
        out.push(median);
    }
    if last != *out.last().unwrap() {
        out.push(last);
    }
    out
}

async fn load_images(paths: &[String]) -> Vec<ImageAttachment> {
    let mut out = Vec::new();
    for path in paths {
        if let Ok(bytes) = tokio::fs::read(path).await {
            out.push(ImageAttachment {
                media_type: "image/png".to_string(),
                data: bytes,
            });
        }
    }
    out
}

/// Runs the final scoring LLM call and applies the rubric's clamp
/// rules. Parsing failures produce the same degraded verdict as an
/// unrecoverable exploration failure.
pub async fn score(
    providers: &ProviderRegistry,
    model_identifier: &str,
    task: &str,
    log: &ExplorationLog,
    rubric: &Rubric,
) -> Result<Verdict, RunError> {
    let screenshot_paths = pick_screenshots(log);
    let images = load_images(&screenshot_paths).await;

    let prompt = format!(
        "Task:\n{task}\n\nRubric ({}):\n{}\n\nExploration log:\n{}",
        rubric.id,
        rubric.describe(),
        log.render_compact(),
    );

    let messages = vec![
        ChatMessage::system(SCORING_SYSTEM_PROMPT),
        ChatMessage::user(prompt).with_images(images),
    ];

    let response = providers.chat(model_identifier, &messages, &[]).await?;

    let Some(parsed) = run_core::extract_json::<ScoringWireResponse>(&response.text) else {
        return Ok(Verdict::degraded(
            format!("could not parse scoring response: {}", response.text),
            rubric.id.clone(),
        ));
    };

    let issues: Vec<Issue> = parsed
        .issues
        .into_iter()
        .map(|i| Issue {
            category: i.category,
            severity: i.severity,
            description: i.description,
            repro_steps: Vec::new(),
            screenshot_ref: None,
        })
        .collect();

    let broken_interactive = log.steps.iter().any(|s| {
        s.tool != "finish_exploration"
            && !s.verification.dom_changed
            && !s.verification.text_changed
            && !s.verification.url_changed
    });
    let new_console_errors = !log.console_errors_so_far().is_empty();

    let mut category_scores = parsed.category_scores;
    if new_console_errors {
        category_scores.insert("robustness".to_string(), 0);
    }

    let mut score = parsed.score;
    if broken_interactive {
        score = score.min(40);
    }

    Ok(Verdict::new(
        score,
        category_scores,
        issues,
        parsed.fix_suggestions,
        parsed.feedback,
        rubric.id.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exploration::{ExplorationStep, Verification};

    fn step(turn: u32, screenshot: &str) -> ExplorationStep {
        ExplorationStep {
            turn,
            tool: "browser_click".to_string(),
            args: serde_json::json!({}),
            before_signature: "a".to_string(),
            after_signature: "b".to_string(),
            verification: Verification::default(),
            screenshot_path: Some(screenshot.to_string()),
        }
    }

    #[test]
    fn picks_first_median_and_last_screenshots() {
        let mut log = ExplorationLog::default();
        for i in 0..5 {
            log.push(step(i, &format!("shot-{i}.png")));
        }
        let picks = pick_screenshots(&log);
        assert_eq!(picks, vec!["shot-0.png", "shot-2.png", "shot-4.png"]);
    }

    #[test]
    fn single_step_yields_one_screenshot() {
        let mut log = ExplorationLog::default();
        log.push(step(0, "only.png"));
        assert_eq!(pick_screenshots(&log), vec!["only.png"]);
    }
}
