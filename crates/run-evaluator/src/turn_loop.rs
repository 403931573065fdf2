use std::path::PathBuf;
use std::sync::Arc;

use run_mcp::McpClient;
use run_providers::{ChatMessage, ImageAttachment, ProviderRegistry, ToolSchema as ProviderToolSchema};
use run_tools::ToolRegistry;
use run_types::{BrowserObservation, RunError};

use crate::exploration::{ExplorationLog, ExplorationStep, Verification};
use crate::observe::Observer;

pub const DEFAULT_MAX_TURNS: u32 = 30;
const MAX_RECENT_SCREENSHOTS: usize = 3;
const VISIBLE_TEXT_BUDGET: usize = 500;

const SYSTEM_PROMPT: &str = "You are evaluating a generated web page by driving it through a \
real browser, one tool call per turn. You are shown the page's visible text, its stable \
interactive selectors, recent console errors, and the most recent screenshots. Choose exactly \
one tool call per turn that exercises the page's functionality against the stated task. Call \
`finish_exploration` with a short summary as soon as you are confident you have seen enough to \
score the page, or once further exploration stops turning up anything new.";

fn convert_tool_schema(schema: run_tools::ToolSchema) -> ProviderToolSchema {
    ProviderToolSchema {
        name: schema.name,
        description: schema.description,
        input_schema: schema.input_schema,
    }
}

fn compact_text(text: &str) -> String {
    if text.chars().count() <= VISIBLE_TEXT_BUDGET {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(VISIBLE_TEXT_BUDGET).collect();
        format!("{truncated}…")
    }
}

fn render_observation(obs: &BrowserObservation) -> String {
    let targets = obs
        .interactive_targets
        .iter()
        .map(|t| {
            format!(
                "  - {} ({})",
                t.selector,
                t.anchor.clone().unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "url: {}\nvisible text:\n{}\ninteractive targets:\n{}\nconsole errors: {:?}\ndomSignature: {}\ndialog calls since last turn: {}",
        obs.url,
        compact_text(&obs.visible_text),
        targets,
        obs.console_errors,
        obs.dom_signature,
        obs.dialog_calls,
    )
}

async fn load_image(path: &str) -> Option<ImageAttachment> {
    let bytes = tokio::fs::read(path).await.ok()?;
    Some(ImageAttachment {
        media_type: "image/png".to_string(),
        data: bytes,
    })
}

async fn recent_images(paths: &[String]) -> Vec<ImageAttachment> {
    let mut out = Vec::new();
    for path in paths.iter().rev().take(MAX_RECENT_SCREENSHOTS).rev() {
        if let Some(image) = load_image(path).await {
            out.push(image);
        }
    }
    out
}

/// Drives the observe/present/execute/verify/record loop described in
/// the evaluator's turn structure until the model calls
/// `finish_exploration`, `max_turns` is reached, or the browser
/// subprocess becomes unusable (propagated as `Err`).
pub async fn run_turn_loop(
    providers: &ProviderRegistry,
    model_identifier: &str,
    mcp: Arc<McpClient>,
    tools: &ToolRegistry,
    task: &str,
    url: &str,
    screenshots_dir: PathBuf,
    max_turns: u32,
) -> Result<(ExplorationLog, BrowserObservation), RunError> {
    let provider_tools: Vec<ProviderToolSchema> = tools
        .list()
        .into_iter()
        .map(convert_tool_schema)
        .collect();

    let mut observer = Observer::new(mcp, screenshots_dir);
    observer.navigate(url).await?;

    let mut log = ExplorationLog::default();
    let mut screenshot_paths = Vec::new();
    let mut prev = observer.observe(0).await?;
    if let Some(path) = &prev.desktop_screenshot_path {
        screenshot_paths.push(path.clone());
    }

    let mut messages = vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(format!("Task:\n{task}")),
    ];

    for turn in 1..=max_turns {
        let images = recent_images(&screenshot_paths).await;
        messages.push(ChatMessage::user(render_observation(&prev)).with_images(images));

        let response = providers
            .chat(model_identifier, &messages, &provider_tools)
            .await?;

        let Some(call) = response.tool_calls.first() else {
            log.finish_summary = Some(response.text);
            break;
        };

        if call.name == "finish_exploration" {
            let summary = call
                .args
                .get("summary")
                .and_then(|v| v.as_str())
                .unwrap_or(&response.text)
                .to_string();
            log.finish_summary = Some(summary);
            break;
        }

        messages.push(ChatMessage::user(format!(
            "(calling tool {} with args {})",
            call.name, call.args
        )));

        let result = tools.execute(&call.name, call.args.clone()).await;
        let after = observer.observe(turn).await?;
        if let Some(path) = &after.desktop_screenshot_path {
            screenshot_paths.push(path.clone());
        }

        let verification = Verification::compute(
            &prev.dom_signature,
            &after.dom_signature,
            &prev.visible_text,
            &after.visible_text,
            &prev.console_errors,
            &after.console_errors,
            after.dialog_calls,
            &prev.url,
            &after.url,
        );

        messages.push(ChatMessage::tool_result(
            call.id.clone(),
            serde_json::to_string(&result).unwrap_or_default(),
        ));

        log.push(ExplorationStep {
            turn,
            tool: call.name.clone(),
            args: call.args.clone(),
            before_signature: prev.dom_signature.clone(),
            after_signature: after.dom_signature.clone(),
            verification,
            screenshot_path: after.desktop_screenshot_path.clone(),
        });

        prev = after;
    }

    Ok((log, prev))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compacts_text_over_the_budget() {
        let long = "x".repeat(1000);
        let compacted = compact_text(&long);
        assert!(compacted.chars().count() <= VISIBLE_TEXT_BUDGET + 1);
    }

    #[test]
    fn leaves_short_text_untouched() {
        assert_eq!(compact_text("hello"), "hello");
    }
}
