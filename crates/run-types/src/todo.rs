use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoType {
    Setup,
    Module,
    Validation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    #[serde(rename = "type")]
    pub todo_type: TodoType,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_index: Option<usize>,
    #[serde(default)]
    pub requirements: BTreeMap<String, String>,
    pub priority: i64,
}

/// Checks the plan-level invariant that the list begins with exactly
/// one `setup` item and ends with exactly one `validation` item.
pub fn has_valid_bookends(todos: &[Todo]) -> bool {
    matches!(todos.first(), Some(t) if t.todo_type == TodoType::Setup)
        && matches!(todos.last(), Some(t) if t.todo_type == TodoType::Validation)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todo(id: &str, kind: TodoType, priority: i64) -> Todo {
        Todo {
            id: id.to_string(),
            todo_type: kind,
            title: id.to_string(),
            description: String::new(),
            module_index: None,
            requirements: BTreeMap::new(),
            priority,
        }
    }

    #[test]
    fn bookend_check_requires_setup_first_validation_last() {
        let todos = vec![
            todo("t0", TodoType::Setup, 0),
            todo("t1", TodoType::Module, 1),
            todo("t2", TodoType::Validation, 2),
        ];
        assert!(has_valid_bookends(&todos));
    }

    #[test]
    fn bookend_check_rejects_missing_validation() {
        let todos = vec![todo("t0", TodoType::Setup, 0), todo("t1", TodoType::Module, 1)];
        assert!(!has_valid_bookends(&todos));
    }
}
