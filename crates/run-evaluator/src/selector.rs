use run_types::InteractiveTarget;
use serde_json::Value;

/// An element discovered in a DOM/accessibility snapshot, prior to
/// selector derivation. Kept independent of the MCP wire shape so the
/// derivation logic is unit-testable without a live browser.
#[derive(Debug, Clone, Default)]
pub struct CandidateElement {
    pub id: Option<String>,
    pub data_attrs: Vec<(String, String)>,
    pub role: Option<String>,
    pub text: Option<String>,
    pub tag: String,
    pub classes: Vec<String>,
}

const MAX_TARGETS: usize = 20;

/// Derives a bounded list of stable selectors, preferring element IDs,
/// then `data-*` attributes, then role+text anchors, then tag+class.
/// Never emits XPath with positional indices.
pub fn derive_stable_selectors(elements: &[CandidateElement]) -> Vec<InteractiveTarget> {
    elements
        .iter()
        .take(MAX_TARGETS)
        .map(|el| {
            let (selector, anchor) = if let Some(id) = &el.id {
                (format!("#{id}"), format!("id={id}"))
            } else if let Some((name, value)) = el.data_attrs.first() {
                (
                    format!("[{name}=\"{value}\"]"),
                    format!("{name}={value}"),
                )
            } else if let (Some(role), Some(text)) = (&el.role, &el.text) {
                (
                    format!("[role=\"{role}\"]:has-text(\"{text}\")"),
                    format!("role={role} text={text}"),
                )
            } else {
                let class_selector = el
                    .classes
                    .first()
                    .map(|c| format!(".{c}"))
                    .unwrap_or_default();
                (
                    format!("{}{}", el.tag, class_selector),
                    format!("tag={}", el.tag),
                )
            };
            InteractiveTarget {
                selector,
                role: el.role.clone(),
                text: el.text.clone(),
                anchor: Some(anchor),
            }
        })
        .collect()
}

/// Parses an MCP `browser_snapshot` result's accessibility tree into a
/// flat list of candidate elements. The exact tree shape is server
/// dependent; this walks any nested `children` array looking for nodes
/// that carry at least a role or a name, which is the common subset
/// every MCP accessibility snapshot exposes.
pub fn extract_candidates(snapshot: &Value) -> Vec<CandidateElement> {
    let mut out = Vec::new();
    walk(snapshot, &mut out);
    out
}

fn walk(node: &Value, out: &mut Vec<CandidateElement>) {
    if let Some(obj) = node.as_object() {
        let role = obj.get("role").and_then(Value::as_str).map(str::to_string);
        let text = obj
            .get("name")
            .or_else(|| obj.get("text"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let id = obj.get("id").and_then(Value::as_str).map(str::to_string);
        let tag = obj
            .get("tag")
            .or_else(|| obj.get("tagName"))
            .and_then(Value::as_str)
            .unwrap_or("div")
            .to_string();
        let classes = obj
            .get("className")
            .and_then(Value::as_str)
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        let data_attrs = obj
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix("data-")
                    .and_then(|_| v.as_str())
                    .map(|value| (k.clone(), value.to_string()))
            })
            .collect();

        if role.is_some() || text.is_some() || id.is_some() {
            out.push(CandidateElement {
                id,
                data_attrs,
                role,
                text,
                tag,
                classes,
            });
        }

        if let Some(children) = obj.get("children").and_then(Value::as_array) {
            for child in children {
                walk(child, out);
            }
        }
    } else if let Some(arr) = node.as_array() {
        for item in arr {
            walk(item, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_id_over_other_anchors() {
        let el = CandidateElement {
            id: Some("submit-btn".to_string()),
            data_attrs: vec![("data-testid".to_string(), "submit".to_string())],
            role: Some("button".to_string()),
            text: Some("Submit".to_string()),
            tag: "button".to_string(),
            classes: vec![],
        };
        let targets = derive_stable_selectors(&[el]);
        assert_eq!(targets[0].selector, "#submit-btn");
    }

    #[test]
    fn falls_back_to_data_attribute_without_an_id() {
        let el = CandidateElement {
            id: None,
            data_attrs: vec![("data-testid".to_string(), "submit".to_string())],
            role: None,
            text: None,
            tag: "button".to_string(),
            classes: vec![],
        };
        let targets = derive_stable_selectors(&[el]);
        assert_eq!(targets[0].selector, "[data-testid=\"submit\"]");
    }

    #[test]
    fn caps_the_target_list_at_twenty() {
        let elements: Vec<CandidateElement> = (0..40)
            .map(|i| CandidateElement {
                id: Some(format!("el-{i}")),
                ..Default::default()
            })
            .collect();
        let targets = derive_stable_selectors(&elements);
        assert_eq!(targets.len(), 20);
    }

    #[test]
    fn extracts_candidates_from_a_nested_snapshot_tree() {
        let snapshot = serde_json::json!({
            "role": "document",
            "children": [
                { "role": "button", "name": "Go", "id": "go-btn" },
                { "role": "textbox", "name": "Email" }
            ]
        });
        let candidates = extract_candidates(&snapshot);
        assert_eq!(candidates.len(), 3);
    }
}
