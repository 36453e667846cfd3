//! Response normalization: raw detect result -> fixed extras record with documented defaults.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::DetectResult;

/// Fixed-shape NLU result. Serializes with the extras key names downstream handlers read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedExtras {
    #[serde(rename = "apiReply")]
    pub reply: String,
    #[serde(rename = "apiAction")]
    pub action: String,
    #[serde(rename = "apiActionIncomplete")]
    pub action_incomplete: bool,
    #[serde(rename = "apiIntent")]
    pub intent: String,
    #[serde(rename = "apiParameters")]
    pub parameters: Map<String, Value>,
}

/// Convert a raw result. Total: missing or null fields become "", false, or an empty map.
pub fn normalize(raw: &DetectResult) -> NormalizedExtras {
    let Some(q) = raw.query_result.as_ref() else {
        return NormalizedExtras::default();
    };
    NormalizedExtras {
        reply: q.fulfillment_text.clone().unwrap_or_default(),
        action: q.action.clone().unwrap_or_default(),
        action_incomplete: q
            .all_required_params_collected
            .as_ref()
            .map(truthy)
            .unwrap_or(false),
        intent: raw.intent_name().unwrap_or_default().to_string(),
        parameters: match &q.parameters {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        },
    }
}

/// Loose boolean cast: 0, 0.0, "", "0", [] and null are false.
fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(a) => !a.is_empty(),
        Value::Object(_) => true,
    }
}
