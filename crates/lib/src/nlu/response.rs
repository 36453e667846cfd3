//! Raw detect-intent response as returned by the provider (v2 JSON). Every field is optional;
//! absence is normal and handled by `normalize`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::NluError;

/// Top-level detect-intent response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectResult {
    #[serde(default)]
    pub response_id: Option<String>,
    #[serde(default)]
    pub query_result: Option<QueryResult>,
}

/// The query result block. Field names follow the provider's JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default)]
    pub query_text: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    /// Struct of detected parameters. Kept loose: only an object is used, anything else counts as absent.
    #[serde(default)]
    pub parameters: Option<Value>,
    /// Kept loose and cast to bool during normalization.
    #[serde(default)]
    pub all_required_params_collected: Option<Value>,
    #[serde(default)]
    pub fulfillment_text: Option<String>,
    #[serde(default)]
    pub intent: Option<Intent>,
    #[serde(default)]
    pub intent_detection_confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    /// Resource name (projects/.../agent/intents/<uuid>).
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl DetectResult {
    /// Parse a response body. Anything that is not a JSON object of this shape is `MalformedResponse`.
    pub fn from_json(body: &str) -> Result<Self, NluError> {
        serde_json::from_str(body).map_err(|e| NluError::MalformedResponse(e.to_string()))
    }

    pub fn from_value(value: Value) -> Result<Self, NluError> {
        serde_json::from_value(value).map_err(|e| NluError::MalformedResponse(e.to_string()))
    }

    /// Display name of the detected intent, if any.
    pub fn intent_name(&self) -> Option<&str> {
        self.query_result
            .as_ref()
            .and_then(|q| q.intent.as_ref())
            .and_then(|i| i.display_name.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_response() {
        let body = r#"{
            "responseId": "r-1",
            "queryResult": {
                "queryText": "hi",
                "languageCode": "en",
                "action": "greet",
                "parameters": {"name": "Bob"},
                "allRequiredParamsCollected": true,
                "fulfillmentText": "Hi!",
                "intent": {"name": "projects/p/agent/intents/1", "displayName": "Greeting"},
                "intentDetectionConfidence": 0.87
            }
        }"#;
        let res = DetectResult::from_json(body).unwrap();
        assert_eq!(res.response_id.as_deref(), Some("r-1"));
        assert_eq!(res.intent_name(), Some("Greeting"));
        let q = res.query_result.unwrap();
        assert_eq!(q.action.as_deref(), Some("greet"));
        assert_eq!(q.intent_detection_confidence, Some(0.87));
    }

    #[test]
    fn empty_object_is_valid() {
        let res = DetectResult::from_json("{}").unwrap();
        assert!(res.query_result.is_none());
        assert!(res.intent_name().is_none());
    }

    #[test]
    fn null_fields_are_absent() {
        let res = DetectResult::from_json(r#"{"queryResult": {"action": null, "intent": null}}"#).unwrap();
        let q = res.query_result.unwrap();
        assert!(q.action.is_none());
        assert!(q.intent.is_none());
    }

    #[test]
    fn non_object_is_malformed() {
        assert!(matches!(
            DetectResult::from_json("[1, 2]"),
            Err(NluError::MalformedResponse(_))
        ));
        assert!(matches!(
            DetectResult::from_json("not json"),
            Err(NluError::MalformedResponse(_))
        ));
    }

    #[test]
    fn wrong_field_type_is_malformed() {
        assert!(matches!(
            DetectResult::from_json(r#"{"queryResult": {"action": 42}}"#),
            Err(NluError::MalformedResponse(_))
        ));
    }
}
