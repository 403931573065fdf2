mod dialog;
mod exploration;
mod observe;
mod patch_plan;
mod rubric;
mod scoring;
mod selector;
mod static_eval;
mod turn_loop;

use std::path::Path;
use std::sync::Arc;

use run_mcp::McpClient;
use run_providers::ProviderRegistry;
use run_types::Verdict;

pub use exploration::{ExplorationLog, ExplorationStep, Verification};
pub use patch_plan::build_patch_plan;
pub use rubric::Rubric;
pub use selector::{derive_stable_selectors, extract_candidates, CandidateElement};
pub use turn_loop::DEFAULT_MAX_TURNS;

/// Agentic, vision-grounded evaluator. Given `{url, mcp, task,
/// artifactsDir, rubric}` it drives a real browser through a
/// tool-use conversation with an evaluator LLM and produces a
/// `Verdict`; never propagates an error, instead returning the
/// degraded verdict mandated by the failure semantics in §4.8.7.
pub struct Evaluator {
    providers: Arc<ProviderRegistry>,
    model_identifier: String,
    max_turns: u32,
    agentic: bool,
}

impl Evaluator {
    pub fn new(providers: Arc<ProviderRegistry>, model_identifier: impl Into<String>) -> Self {
        Self {
            providers,
            model_identifier: model_identifier.into(),
            max_turns: DEFAULT_MAX_TURNS,
            agentic: true,
        }
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Selects the scripted single-pass evaluator (`AGENTIC_EVAL=false`)
    /// instead of the tool-use exploration loop.
    pub fn non_agentic(mut self) -> Self {
        self.agentic = false;
        self
    }

    pub async fn evaluate(
        &self,
        url: &str,
        mcp: Arc<McpClient>,
        task: &str,
        artifacts_dir: &Path,
        rubric: &Rubric,
    ) -> Verdict {
        let screenshots_dir = artifacts_dir.join("screenshots");
        if let Err(e) = observe::ensure_dir(&screenshots_dir) {
            return Verdict::degraded(
                format!("could not create screenshots directory: {e}"),
                rubric.id.clone(),
            );
        }

        if !self.agentic {
            return match static_eval::evaluate_static(
                &self.providers,
                &self.model_identifier,
                mcp,
                task,
                url,
                screenshots_dir,
                rubric,
            )
            .await
            {
                Ok(verdict) => verdict,
                Err(e) => Verdict::degraded(e.to_string(), rubric.id.clone()),
            };
        }

        let tools = run_tools::build_browser_toolset(mcp.clone());
        let log = match turn_loop::run_turn_loop(
            &self.providers,
            &self.model_identifier,
            mcp,
            &tools,
            task,
            url,
            screenshots_dir,
            self.max_turns,
        )
        .await
        {
            Ok((log, _last_observation)) => log,
            Err(e) => return Verdict::degraded(e.to_string(), rubric.id.clone()),
        };

        match scoring::score(&self.providers, &self.model_identifier, task, &log, rubric).await {
            Ok(verdict) => verdict,
            Err(e) => Verdict::degraded(e.to_string(), rubric.id.clone()),
        }
    }
}
