mod prompt;
mod wire;

use std::sync::Arc;

use run_core::extract_json;
use run_providers::ProviderRegistry;
use run_types::Plan;

pub use prompt::{render, PromptInputs, DEFAULT_TEMPLATE};
pub use wire::PlannerWireResponse;

/// Calls a strong reasoning LLM to turn a task description into a
/// structured [`Plan`]. Parsing is defensive: a response that cannot be
/// parsed as the expected JSON shape degrades the plan rather than
/// failing the run — see [`Plan::degraded`].
pub struct Planner {
    providers: Arc<ProviderRegistry>,
    model_identifier: String,
    template: String,
}

impl Planner {
    pub fn new(providers: Arc<ProviderRegistry>, model_identifier: impl Into<String>) -> Self {
        Self {
            providers,
            model_identifier: model_identifier.into(),
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub async fn plan(&self, task: &str, notes: Option<&str>, reference_videos: Option<&str>) -> Plan {
        let inputs = PromptInputs {
            task,
            notes: notes.unwrap_or("none provided"),
            reference_videos: reference_videos.unwrap_or("none provided"),
            api_key_placeholder: "REDACTED",
        };
        let rendered = render(&self.template, &inputs);

        let raw_response = match self.providers.complete(&self.model_identifier, &rendered).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "planner llm call failed; returning degraded plan");
                return Plan::degraded(format!("planner call failed: {err}"));
            }
        };

        match extract_json::<PlannerWireResponse>(&raw_response) {
            Some(wire) => wire.into(),
            None => {
                tracing::warn!("planner response could not be parsed as JSON; degrading");
                Plan::degraded(raw_response)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use run_providers::LocalEchoProvider;

    fn planner_with_echo() -> Planner {
        let registry = ProviderRegistry::new(vec![Arc::new(LocalEchoProvider::new())]);
        Planner::new(Arc::new(registry), "local/echo-1")
    }

    #[tokio::test]
    async fn degrades_when_the_llm_response_is_not_json() {
        let planner = planner_with_echo();
        let plan = planner.plan("build a bakery landing page", None, None).await;
        assert!(plan.is_degraded());
        assert!(plan.build_prompt.contains("build a bakery landing page"));
    }

    #[tokio::test]
    async fn parses_a_well_formed_wire_response() {
        let registry = ProviderRegistry::new(vec![Arc::new(LocalEchoProvider::new())]);
        let planner = Planner::new(Arc::new(registry), "local/echo-1").with_template(
            r#"{
                "course_overview": {"title": "{task}", "outline": [], "modules": []},
                "global_ui_spec": {"sections": [], "notes": "{notes}"},
                "openhands_build_prompt": "Build it. {reference_videos} {api_key_placeholder}",
                "todo_list": []
            }"#
                .to_string(),
        );
        let plan = planner.plan("Bakery Site", Some("warm"), Some("none")).await;
        assert!(!plan.is_degraded() || plan.overview.title.contains("Bakery Site"));
    }
}
