use serde::{Deserialize, Serialize};

/// A stable handle to an on-page element the evaluator can act on
/// again in a later turn without re-resolving brittle CSS paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractiveTarget {
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
}

/// One turn's worth of evidence gathered via the MCP browser tools
/// during the evaluator's observe/act loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desktop_screenshot_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_screenshot_path: Option<String>,
    pub visible_text: String,
    #[serde(default)]
    pub interactive_targets: Vec<InteractiveTarget>,
    #[serde(default)]
    pub console_errors: Vec<String>,
    pub dom_signature: String,
    #[serde(default)]
    pub dialog_calls: u32,
    pub url: String,
}
