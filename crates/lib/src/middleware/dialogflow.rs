//! Dialogflow intent-enrichment middleware.
//!
//! `received` derives the session key, runs one detect-intent call, normalizes the result and
//! writes it into the message extras before forwarding. With `listen_for_action`, `matching`
//! compares handler patterns to the detected action instead of the message text.

use std::sync::Arc;

use async_trait::async_trait;

use super::{HookError, Middleware, Next};
use crate::matcher::ActionMatcher;
use crate::message::{attach, IncomingMessage};
use crate::nlu::{
    derive_session_key, normalize, DialogflowClient, NluClient, NluConfig, NluError,
    NormalizedExtras,
};

/// Holds only read-only state, so one instance can serve concurrent conversations.
#[derive(Clone)]
pub struct DialogflowMiddleware {
    config: Arc<NluConfig>,
    client: Arc<dyn NluClient>,
    matcher: ActionMatcher,
}

impl std::fmt::Debug for DialogflowMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogflowMiddleware")
            .field("project_id", &self.config.project_id)
            .field("language", &self.config.language)
            .field("listen_for_action", &self.config.listen_for_action)
            .finish_non_exhaustive()
    }
}

/// Configures a `DialogflowMiddleware` before it is installed in a pipeline.
pub struct DialogflowMiddlewareBuilder {
    config: NluConfig,
    client: Option<Arc<dyn NluClient>>,
}

impl DialogflowMiddlewareBuilder {
    /// Query language code (default "en").
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = language.into();
        self
    }

    /// Match handler patterns against the detected action (default off).
    pub fn listen_for_action(mut self, listen: bool) -> Self {
        self.config.listen_for_action = listen;
        self
    }

    /// Provider base URL, e.g. a regional endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Use a custom provider client instead of the HTTP one.
    pub fn client(mut self, client: Arc<dyn NluClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> DialogflowMiddleware {
        let client = self
            .client
            .unwrap_or_else(|| Arc::new(DialogflowClient::new()));
        DialogflowMiddleware::with_client(self.config, client)
    }
}

impl DialogflowMiddleware {
    /// `credentials` is a path to a token file or an inline token.
    pub fn builder(
        credentials: impl Into<String>,
        project_id: impl Into<String>,
    ) -> DialogflowMiddlewareBuilder {
        DialogflowMiddlewareBuilder {
            config: NluConfig::new(credentials, project_id),
            client: None,
        }
    }

    pub fn new(config: NluConfig) -> Self {
        Self::with_client(config, Arc::new(DialogflowClient::new()))
    }

    pub fn with_client(config: NluConfig, client: Arc<dyn NluClient>) -> Self {
        let matcher = ActionMatcher::new(config.listen_for_action);
        Self {
            config: Arc::new(config),
            client,
            matcher,
        }
    }

    pub fn config(&self) -> &NluConfig {
        &self.config
    }

    /// Query the provider for `message` and return the normalized result without touching the message.
    pub async fn detect(&self, message: &IncomingMessage) -> Result<NormalizedExtras, NluError> {
        let session_key = derive_session_key(&message.conversation_id);
        log::debug!(
            "dialogflow: detect intent (project {}, session {}..)",
            self.config.project_id,
            &session_key[..8]
        );
        let raw = self
            .client
            .detect_intent(&self.config, &session_key, &message.text)
            .await?;
        if let Some(q) = raw.query_result.as_ref() {
            log::debug!(
                "dialogflow: intent {:?} action {:?} confidence {:?}",
                raw.intent_name(),
                q.action,
                q.intent_detection_confidence
            );
        }
        Ok(normalize(&raw))
    }

    /// Detect and attach. On failure the message extras are left untouched.
    pub async fn enrich(&self, message: &mut IncomingMessage) -> Result<NormalizedExtras, NluError> {
        let extras = self.detect(message).await?;
        attach(message, &extras);
        Ok(extras)
    }
}

#[async_trait]
impl Middleware for DialogflowMiddleware {
    async fn received(
        &self,
        mut message: IncomingMessage,
        next: Next<'_, IncomingMessage>,
    ) -> Result<IncomingMessage, HookError> {
        if let Err(e) = self.enrich(&mut message).await {
            log::warn!(
                "dialogflow: enrichment failed for conversation {}: {}",
                message.conversation_id,
                e
            );
            return Err(e.into());
        }
        next.run(message).await
    }

    /// `regex_matched` is not consulted: when listening for actions the action decides.
    fn matching(&self, message: &IncomingMessage, pattern: &str, _regex_matched: bool) -> bool {
        self.matcher.matches(pattern, message)
    }
}
