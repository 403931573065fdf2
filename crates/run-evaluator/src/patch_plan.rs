use run_types::{PatchAction, PatchFile, PatchPlan, Verdict};

const KEYWORDS: &[(&str, &str)] = &[
    ("colour", "adjust color palette"),
    ("color", "adjust color palette"),
    ("spacing", "fix layout spacing"),
    ("typography", "fix typography"),
    ("font", "fix typography"),
    ("responsive", "fix responsive layout"),
    ("mobile", "fix responsive layout"),
    ("error", "fix a runtime error"),
    ("broken", "fix a runtime error"),
    ("accessib", "fix accessibility issue"),
];

fn change_hints(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut hints: Vec<String> = KEYWORDS
        .iter()
        .filter(|(keyword, _)| lower.contains(keyword))
        .map(|(_, hint)| hint.to_string())
        .collect();
    hints.dedup();
    hints
}

/// Pure transform from a failing verdict into a structured patch plan.
/// Issues that name files (`screenshot_ref` doubling as a path hint, or
/// a category name matching an entry in `files_touched`) drive targeted
/// `modify` entries; anything left unaccounted for when the overall
/// score is still below threshold falls back to a generic modify pass
/// over every touched file.
pub fn build_patch_plan(verdict: &Verdict, task: &str, files_touched: &[String]) -> PatchPlan {
    let mut files: Vec<PatchFile> = Vec::new();
    let mut pinned: Vec<String> = Vec::new();

    for issue in &verdict.issues {
        let changes = change_hints(&issue.description);
        if let Some(path) = issue
            .screenshot_ref
            .as_ref()
            .and_then(|r| files_touched.iter().find(|f| r.contains(f.as_str())))
        {
            pinned.push(path.clone());
            files.push(PatchFile {
                path: path.clone(),
                action: PatchAction::Modify,
                description: issue.description.clone(),
                changes,
            });
        }
    }

    if files.is_empty() && !verdict.passed {
        for path in files_touched {
            files.push(PatchFile {
                path: path.clone(),
                action: PatchAction::Modify,
                description: "address evaluator feedback".to_string(),
                changes: Vec::new(),
            });
        }
    }

    let instructions = format!(
        "Task:\n{task}\n\nEvaluator feedback (score {}):\n{}\n\nIssues:\n{}",
        verdict.score,
        verdict.feedback,
        verdict
            .issues
            .iter()
            .map(|i| format!("- [{:?}/{:?}] {}", i.category, i.severity, i.description))
            .collect::<Vec<_>>()
            .join("\n"),
    );

    PatchPlan {
        instructions,
        files,
        original_score: verdict.score,
        issues_count: verdict.issues.len() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use run_types::{Issue, Severity};
    use std::collections::BTreeMap;

    fn failing_verdict(issues: Vec<Issue>) -> Verdict {
        Verdict::new(40, BTreeMap::new(), issues, vec![], "needs work", "default-v1")
    }

    #[test]
    fn falls_back_to_modifying_every_touched_file_when_no_issue_pins_one() {
        let verdict = failing_verdict(vec![Issue {
            category: "visual_design".to_string(),
            severity: Severity::Medium,
            description: "layout looks off".to_string(),
            repro_steps: Vec::new(),
            screenshot_ref: None,
        }]);
        let plan = build_patch_plan(&verdict, "build a landing page", &["index.html".to_string()]);
        assert_eq!(plan.files.len(), 1);
        assert_eq!(plan.files[0].path, "index.html");
    }

    #[test]
    fn derives_change_hints_from_issue_keywords() {
        assert_eq!(
            change_hints("the color contrast is too low and spacing is cramped"),
            vec!["adjust color palette".to_string(), "fix layout spacing".to_string()]
        );
    }

    #[test]
    fn passing_verdict_with_no_pinned_files_yields_an_empty_plan() {
        let verdict = Verdict::new(90, BTreeMap::new(), vec![], vec![], "great", "default-v1");
        let plan = build_patch_plan(&verdict, "task", &["index.html".to_string()]);
        assert!(plan.files.is_empty());
    }
}
