use serde::de::DeserializeOwned;

/// Shared defensive JSON extraction for planner and evaluator
/// final-scoring: strip fenced code blocks, then scan for the first
/// balanced-brace substring that parses, then give up.
pub fn extract_json<T: DeserializeOwned>(raw: &str) -> Option<T> {
    if let Some(stripped) = strip_code_fence(raw) {
        if let Ok(value) = serde_json::from_str(&stripped) {
            return Some(value);
        }
    }

    if let Ok(value) = serde_json::from_str(raw.trim()) {
        return Some(value);
    }

    for candidate in balanced_brace_candidates(raw) {
        if let Ok(value) = serde_json::from_str(&candidate) {
            return Some(value);
        }
    }

    None
}

fn strip_code_fence(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let start = trimmed.find("```")?;
    let after_open = &trimmed[start + 3..];
    let after_open = after_open
        .strip_prefix("json")
        .or_else(|| after_open.strip_prefix("JSON"))
        .unwrap_or(after_open);
    let after_open = after_open.trim_start_matches('\n');
    let end = after_open.find("```")?;
    Some(after_open[..end].trim().to_string())
}

/// Scans left to right for every substring that starts at a `{` and
/// ends at its matching `}`, tracking string/escape state so braces
/// inside string literals don't confuse the scan. Returns candidates
/// in order of first `{` encountered, longest-match first per start.
fn balanced_brace_candidates(raw: &str) -> Vec<String> {
    let chars: Vec<char> = raw.chars().collect();
    let mut candidates = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '{' {
            if let Some(end) = find_matching_brace(&chars, i) {
                candidates.push(chars[i..=end].iter().collect());
            }
        }
        i += 1;
    }
    candidates
}

fn find_matching_brace(chars: &[char], start: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &ch) in chars.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(offset);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        score: u32,
    }

    #[test]
    fn extracts_from_fenced_code_block() {
        let raw = "Here is the plan:\n```json\n{\"score\": 88}\n```\nthanks";
        let parsed: Payload = extract_json(raw).unwrap();
        assert_eq!(parsed, Payload { score: 88 });
    }

    #[test]
    fn extracts_from_plain_prefixed_text() {
        let raw = "Sure, the result is {\"score\": 91} — done.";
        let parsed: Payload = extract_json(raw).unwrap();
        assert_eq!(parsed, Payload { score: 91 });
    }

    #[test]
    fn returns_none_when_nothing_parses() {
        let raw = "no json here at all";
        let parsed: Option<Payload> = extract_json(raw);
        assert!(parsed.is_none());
    }

    #[test]
    fn tolerates_braces_inside_string_values() {
        let raw = "{\"score\": 10, \"note\": \"contains a { brace }\"}";
        #[derive(Debug, Deserialize, PartialEq)]
        struct Noted {
            score: u32,
            note: String,
        }
        let parsed: Noted = extract_json(raw).unwrap();
        assert_eq!(parsed.score, 10);
    }
}
