/// Default planner prompt template. Each of the four named placeholders
/// below is substituted exactly once; none of the substituted values
/// may themselves contain a placeholder token, which the caller is
/// responsible for before calling [`render`].
pub const DEFAULT_TEMPLATE: &str = r#"CRITICAL: You are a PLANNER, not a CODER. Your output must be 100% natural language text inside `openhands_build_prompt` — no HTML, no JavaScript, no code snippets elsewhere in the response.

TASK:
{task}

NOTES:
{notes}

REFERENCE VIDEOS:
{reference_videos}

Respond with a single JSON object shaped like:
{{
  "course_overview": {{"title": "...", "outline": ["..."], "modules": ["..."]}},
  "global_ui_spec": {{"sections": ["..."], "notes": "..."}},
  "openhands_build_prompt": "natural language brief, no code",
  "thinking": "optional reasoning trace",
  "todo_list": [
    {{"id": "...", "type": "setup|module|validation", "title": "...", "description": "...", "moduleIndex": 0, "requirements": {{}}, "priority": 0}}
  ]
}}

API KEY PLACEHOLDER (do not echo literally): {api_key_placeholder}
"#;

pub struct PromptInputs<'a> {
    pub task: &'a str,
    pub notes: &'a str,
    pub reference_videos: &'a str,
    pub api_key_placeholder: &'a str,
}

/// Substitutes each of the four named placeholders exactly once.
pub fn render(template: &str, inputs: &PromptInputs<'_>) -> String {
    template
        .replacen("{task}", inputs.task, 1)
        .replacen("{notes}", inputs.notes, 1)
        .replacen("{reference_videos}", inputs.reference_videos, 1)
        .replacen("{api_key_placeholder}", inputs.api_key_placeholder, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_each_placeholder_exactly_once() {
        let rendered = render(
            DEFAULT_TEMPLATE,
            &PromptInputs {
                task: "build a bakery landing page",
                notes: "warm colors",
                reference_videos: "none",
                api_key_placeholder: "REDACTED",
            },
        );
        assert!(rendered.contains("build a bakery landing page"));
        assert!(rendered.contains("warm colors"));
        assert!(!rendered.contains("{task}"));
        assert!(!rendered.contains("{notes}"));
        assert!(!rendered.contains("{reference_videos}"));
        assert!(!rendered.contains("{api_key_placeholder}"));
    }
}
