//! Detect-intent client: the single point of contact with the NLU provider.
//! One HTTP round trip per call, no retries, no caching.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;

use super::{resolve_token, session_path, DetectResult};

pub const DEFAULT_ENDPOINT: &str = "https://dialogflow.googleapis.com";

#[derive(Debug, thiserror::Error)]
pub enum NluError {
    /// Network or auth failure reaching the provider.
    #[error("nlu provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// The provider (or local validation) refused the request.
    #[error("nlu provider rejected request: {0}")]
    ProviderRejected(String),
    #[error("nlu response malformed: {0}")]
    MalformedResponse(String),
}

/// Immutable settings for one middleware instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NluConfig {
    /// Credential reference: path to a token file or an inline token.
    pub credentials: String,
    pub project_id: String,
    pub language: String,
    /// Match handler patterns against the detected action instead of the text.
    pub listen_for_action: bool,
    /// Provider base URL (no trailing slash).
    pub endpoint: String,
}

impl NluConfig {
    pub fn new(credentials: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            credentials: credentials.into(),
            project_id: project_id.into(),
            language: "en".to_string(),
            listen_for_action: false,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

/// Provider seam. Implemented by `DialogflowClient`; tests substitute their own.
#[async_trait]
pub trait NluClient: Send + Sync {
    /// Run one detect-intent query for `text` in the session identified by `session_key`.
    async fn detect_intent(
        &self,
        config: &NluConfig,
        session_key: &str,
        text: &str,
    ) -> Result<DetectResult, NluError>;
}

/// Dialogflow v2 REST client.
#[derive(Clone, Default)]
pub struct DialogflowClient {
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectIntentRequest<'a> {
    query_input: QueryInput<'a>,
}

#[derive(Debug, Serialize)]
struct QueryInput<'a> {
    text: TextInput<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TextInput<'a> {
    text: &'a str,
    language_code: &'a str,
}

impl DialogflowClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn detect_url(config: &NluConfig, session_key: &str) -> String {
        format!(
            "{}/v2/{}:detectIntent",
            config.endpoint.trim_end_matches('/'),
            session_path(&config.project_id, session_key)
        )
    }
}

fn validate(config: &NluConfig) -> Result<(), NluError> {
    if config.project_id.trim().is_empty() {
        return Err(NluError::ProviderRejected("project id is empty".to_string()));
    }
    if config.language.trim().is_empty() {
        return Err(NluError::ProviderRejected("language code is empty".to_string()));
    }
    Ok(())
}

/// Error body text for the error detail; a body that cannot be read is described instead.
fn body_or_reason<E: std::fmt::Display>(body: Result<String, E>) -> String {
    body.unwrap_or_else(|e| format!("<body unreadable: {}>", e))
}

fn status_error(status: StatusCode, body: String) -> NluError {
    let detail = format!("{} {}", status, body);
    let unavailable = status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error();
    if unavailable {
        NluError::ProviderUnavailable(detail)
    } else {
        NluError::ProviderRejected(detail)
    }
}

#[async_trait]
impl NluClient for DialogflowClient {
    /// POST {endpoint}/v2/projects/{project}/agent/sessions/{key}:detectIntent
    async fn detect_intent(
        &self,
        config: &NluConfig,
        session_key: &str,
        text: &str,
    ) -> Result<DetectResult, NluError> {
        validate(config)?;
        let token = resolve_token(&config.credentials)?;
        let url = Self::detect_url(config, session_key);
        let body = DetectIntentRequest {
            query_input: QueryInput {
                text: TextInput {
                    text,
                    language_code: config.language.trim(),
                },
            },
        };
        let res = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| NluError::ProviderUnavailable(e.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            let body = body_or_reason(res.text().await);
            return Err(status_error(status, body));
        }
        let body = res
            .text()
            .await
            .map_err(|e| NluError::ProviderUnavailable(e.to_string()))?;
        DetectResult::from_json(&body)
    }
}
