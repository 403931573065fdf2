use run_types::{Plan, PlanOverview, Todo, UiSpec};
use serde::Deserialize;

/// The planner LLM's JSON contract: snake_case field names distinct
/// from `run_types::Plan`'s own wire shape, because this is an external
/// contract the model is prompted against, not our internal model.
#[derive(Debug, Deserialize)]
pub struct PlannerWireResponse {
    pub course_overview: PlanOverview,
    pub global_ui_spec: UiSpec,
    pub openhands_build_prompt: String,
    #[serde(default)]
    pub thinking: Option<String>,
    #[serde(default)]
    pub todo_list: Vec<Todo>,
}

impl From<PlannerWireResponse> for Plan {
    fn from(wire: PlannerWireResponse) -> Self {
        Plan {
            overview: wire.course_overview,
            ui_spec: wire.global_ui_spec,
            build_prompt: wire.openhands_build_prompt,
            thinking: wire.thinking,
            todo_list: wire.todo_list,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_wire_field_names_onto_the_internal_plan_shape() {
        let raw = r#"{
            "course_overview": {"title": "Bakery", "outline": [], "modules": []},
            "global_ui_spec": {"sections": [], "notes": ""},
            "openhands_build_prompt": "Build a warm bakery landing page.",
            "todo_list": []
        }"#;
        let wire: PlannerWireResponse = serde_json::from_str(raw).unwrap();
        let plan: Plan = wire.into();
        assert_eq!(plan.overview.title, "Bakery");
        assert_eq!(plan.build_prompt, "Build a warm bakery landing page.");
    }
}
