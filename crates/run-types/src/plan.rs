use serde::{Deserialize, Serialize};

use crate::todo::Todo;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlanOverview {
    pub title: String,
    #[serde(default)]
    pub outline: Vec<String>,
    #[serde(default)]
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UiSpec {
    #[serde(default)]
    pub sections: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

/// A structured plan produced by the Planner. `build_prompt` is the
/// sole natural-language brief handed to the code-generation agent —
/// callers must never append executable code to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub overview: PlanOverview,
    pub ui_spec: UiSpec,
    pub build_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    pub todo_list: Vec<Todo>,
}

impl Plan {
    /// A plan produced when the planner's LLM response could not be
    /// parsed. `build_prompt` becomes the raw response text so the
    /// agent still has something to work from; an empty `todo_list`
    /// signals the degradation to the controller.
    pub fn degraded(raw_response: impl Into<String>) -> Self {
        Self {
            overview: PlanOverview::default(),
            ui_spec: UiSpec::default(),
            build_prompt: raw_response.into(),
            thinking: None,
            todo_list: Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.todo_list.is_empty()
    }
}
