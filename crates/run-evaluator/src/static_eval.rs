use std::path::PathBuf;
use std::sync::Arc;

use run_mcp::McpClient;
use run_providers::ProviderRegistry;
use run_types::RunError;

use crate::exploration::{ExplorationLog, ExplorationStep, Verification};
use crate::observe::Observer;
use crate::rubric::Rubric;
use crate::scoring;

/// The non-agentic fallback evaluator, selected when the agentic
/// toolset is disabled. A single scripted observation (load, settle,
/// screenshot) replaces the tool-use exploration loop; the same final
/// scoring prompt is reused so both paths produce a `Verdict` on the
/// same rubric.
pub async fn evaluate_static(
    providers: &ProviderRegistry,
    model_identifier: &str,
    mcp: Arc<McpClient>,
    task: &str,
    url: &str,
    screenshots_dir: PathBuf,
    rubric: &Rubric,
) -> Result<run_types::Verdict, RunError> {
    let mut observer = Observer::new(mcp, screenshots_dir);
    observer.navigate(url).await?;
    let observation = observer.observe(0).await?;

    let mut log = ExplorationLog::default();
    log.push(ExplorationStep {
        turn: 0,
        tool: "page_load".to_string(),
        args: serde_json::json!({ "url": url }),
        before_signature: observation.dom_signature.clone(),
        after_signature: observation.dom_signature.clone(),
        verification: Verification {
            new_console_errors: observation.console_errors.clone(),
            ..Default::default()
        },
        screenshot_path: observation.desktop_screenshot_path.clone(),
    });
    log.finish_summary = Some("scripted single-pass observation".to_string());

    scoring::score(providers, model_identifier, task, &log, rubric).await
}
