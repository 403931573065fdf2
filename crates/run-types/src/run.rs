use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity and static configuration for one run. Derived filesystem
/// paths (`workspaceDir`, `projectRoot`, `siteDir`, `artifactsDir`) are
/// computed by `PathConfig`, not stored here, so this type stays a
/// plain value the controller can clone freely.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSpec {
    pub run_id: String,
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub max_iterations: u32,
    pub base_dir: PathBuf,
}

impl RunSpec {
    pub fn new(task: impl Into<String>, max_iterations: u32, base_dir: PathBuf) -> Self {
        Self {
            run_id: generate_run_id(),
            task: task.into(),
            notes: None,
            max_iterations: max_iterations.max(1),
            base_dir,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Sortable timestamp + random suffix, so run directories list in
/// creation order on disk without reading any metadata.
pub fn generate_run_id() -> String {
    let timestamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("run-{timestamp}-{}", &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_ids_are_unique_and_sortable_by_creation() {
        let a = generate_run_id();
        let b = generate_run_id();
        assert_ne!(a, b);
        assert!(a.starts_with("run-"));
    }

    #[test]
    fn max_iterations_floors_at_one() {
        let spec = RunSpec::new("build a landing page", 0, PathBuf::from("/tmp/base"));
        assert_eq!(spec.max_iterations, 1);
    }
}
