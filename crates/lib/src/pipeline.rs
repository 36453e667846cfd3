//! Host pipeline: runs middleware stages around pattern handlers for one message at a time.
//!
//! Per message: received chain -> handler matching (text regex, or the handler's matching
//! middleware when it has any) -> heard chain + handler for the first match (fallback if none)
//! -> sending chain for the reply.

use std::sync::Arc;

use crate::matcher;
use crate::message::{IncomingMessage, OutgoingPayload};
use crate::middleware::{HookError, Middleware, Next};

/// Middleware stage a middleware can be installed in. Matching middleware is per handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Captured,
    Received,
    Heard,
    Sending,
}

/// Produces an optional reply for a matched message.
pub trait Handler: Send + Sync {
    fn handle(&self, message: &IncomingMessage) -> Result<Option<String>, String>;
}

impl<F> Handler for F
where
    F: Fn(&IncomingMessage) -> Result<Option<String>, String> + Send + Sync,
{
    fn handle(&self, message: &IncomingMessage) -> Result<Option<String>, String> {
        self(message)
    }
}

struct Listener {
    pattern: String,
    handler: Arc<dyn Handler>,
    matching: Vec<Arc<dyn Middleware>>,
}

/// Ordered middleware per stage plus registered handlers. Cheap to share behind an `Arc`;
/// `handle` takes `&self` so different conversations can be processed concurrently.
#[derive(Default)]
pub struct Pipeline {
    captured: Vec<Arc<dyn Middleware>>,
    received: Vec<Arc<dyn Middleware>>,
    heard: Vec<Arc<dyn Middleware>>,
    sending: Vec<Arc<dyn Middleware>>,
    listeners: Vec<Listener>,
    fallback: Option<Arc<dyn Handler>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `middleware` to the given stage; stages run in insertion order.
    pub fn middleware(mut self, stage: Stage, middleware: Arc<dyn Middleware>) -> Self {
        match stage {
            Stage::Captured => self.captured.push(middleware),
            Stage::Received => self.received.push(middleware),
            Stage::Heard => self.heard.push(middleware),
            Stage::Sending => self.sending.push(middleware),
        }
        self
    }

    /// Register a handler for messages whose text fully matches `pattern` (case-insensitive).
    pub fn hears(self, pattern: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.hears_with(pattern, handler, Vec::new())
    }

    /// Like `hears`, but the handler fires only when every middleware in `matching` agrees.
    /// The text match result is passed to them as `regex_matched`.
    pub fn hears_with(
        mut self,
        pattern: impl Into<String>,
        handler: impl Handler + 'static,
        matching: Vec<Arc<dyn Middleware>>,
    ) -> Self {
        self.listeners.push(Listener {
            pattern: pattern.into(),
            handler: Arc::new(handler),
            matching,
        });
        self
    }

    /// Handler for messages no listener matched.
    pub fn fallback(mut self, handler: impl Handler + 'static) -> Self {
        self.fallback = Some(Arc::new(handler));
        self
    }

    /// Run only the captured chain (for hosts resuming a pending conversation).
    pub async fn capture(&self, message: IncomingMessage) -> Result<IncomingMessage, HookError> {
        Next::captured(&self.captured).run(message).await
    }

    /// Process one inbound message and return the reply (if any) after the sending stage.
    /// Only the first matching handler, in registration order, runs.
    /// A failing received stage aborts the message; nothing is matched or sent.
    pub async fn handle(&self, message: IncomingMessage) -> Result<Vec<OutgoingPayload>, HookError> {
        let message = Next::received(&self.received).run(message).await?;

        let matched = self
            .listeners
            .iter()
            .find(|l| Self::is_match(l, &message));

        let reply = match (matched, &self.fallback) {
            (Some(listener), _) => {
                log::debug!("pipeline: handler {:?} matched", listener.pattern);
                self.run_handler(listener.handler.as_ref(), &message).await?
            }
            (None, Some(fallback)) => {
                log::debug!("pipeline: no handler matched, using fallback");
                self.run_handler(fallback.as_ref(), &message).await?
            }
            (None, None) => {
                log::debug!("pipeline: no handler matched {:?}", message.text);
                None
            }
        };

        let mut sent = Vec::new();
        if let Some(payload) = reply {
            sent.push(Next::sending(&self.sending).run(payload).await?);
        }
        Ok(sent)
    }

    fn is_match(listener: &Listener, message: &IncomingMessage) -> bool {
        let regex_matched = matcher::full_match(&listener.pattern, &message.text);
        if listener.matching.is_empty() {
            return regex_matched;
        }
        listener
            .matching
            .iter()
            .all(|m| m.matching(message, &listener.pattern, regex_matched))
    }

    async fn run_handler(
        &self,
        handler: &dyn Handler,
        message: &IncomingMessage,
    ) -> Result<Option<OutgoingPayload>, HookError> {
        let message = Next::heard(&self.heard).run(message.clone()).await?;
        let reply = handler.handle(&message).map_err(HookError::Handler)?;
        Ok(reply.map(|text| OutgoingPayload::reply_to(&message, text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    fn echo(prefix: &'static str) -> impl Handler {
        move |m: &IncomingMessage| -> Result<Option<String>, String> {
            Ok(Some(format!("{}{}", prefix, m.text)))
        }
    }

    struct Shout;

    #[async_trait]
    impl Middleware for Shout {
        async fn sending(
            &self,
            mut payload: OutgoingPayload,
            next: Next<'_, OutgoingPayload>,
        ) -> Result<OutgoingPayload, HookError> {
            payload.text = payload.text.to_uppercase();
            next.run(payload).await
        }
    }

    /// Appends its tag to the message text in every message stage.
    struct Tag(&'static str);

    #[async_trait]
    impl Middleware for Tag {
        async fn captured(
            &self,
            mut message: IncomingMessage,
            next: Next<'_, IncomingMessage>,
        ) -> Result<IncomingMessage, HookError> {
            message.text.push_str(self.0);
            next.run(message).await
        }

        async fn received(
            &self,
            mut message: IncomingMessage,
            next: Next<'_, IncomingMessage>,
        ) -> Result<IncomingMessage, HookError> {
            message.text.push_str(self.0);
            next.run(message).await
        }

        async fn heard(
            &self,
            mut message: IncomingMessage,
            next: Next<'_, IncomingMessage>,
        ) -> Result<IncomingMessage, HookError> {
            message.text.push_str(self.0);
            next.run(message).await
        }
    }

    struct Never;

    impl Middleware for Never {
        fn matching(&self, _m: &IncomingMessage, _p: &str, _r: bool) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn text_pattern_routes_to_handler() {
        let p = Pipeline::new()
            .hears("hi|hello", echo("greet:"))
            .hears("bye", echo("bye:"));
        let out = p.handle(IncomingMessage::new("c", "Hello")).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "greet:Hello");
        assert_eq!(out[0].conversation_id, "c");
    }

    #[tokio::test]
    async fn fallback_when_nothing_matches() {
        let p = Pipeline::new()
            .hears("hi", echo("greet:"))
            .fallback(|_: &IncomingMessage| -> Result<Option<String>, String> {
                Ok(Some("sorry?".to_string()))
            });
        let out = p.handle(IncomingMessage::new("c", "what")).await.unwrap();
        assert_eq!(out[0].text, "sorry?");

        let silent = Pipeline::new().hears("hi", echo(""));
        assert!(silent.handle(IncomingMessage::new("c", "what")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sending_stage_sees_replies() {
        let p = Pipeline::new()
            .middleware(Stage::Sending, Arc::new(Shout))
            .hears(".*", echo("re:"));
        let out = p.handle(IncomingMessage::new("c", "ok")).await.unwrap();
        assert_eq!(out[0].text, "RE:OK");
    }

    #[tokio::test]
    async fn matching_middleware_overrides_text_match() {
        let p = Pipeline::new().hears_with("hi", echo(""), vec![Arc::new(Never)]);
        let out = p.handle(IncomingMessage::new("c", "hi")).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn handler_error_is_returned() {
        let p = Pipeline::new().hears(".*", |_: &IncomingMessage| -> Result<Option<String>, String> {
            Err("boom".to_string())
        });
        let err = p.handle(IncomingMessage::new("c", "x")).await.unwrap_err();
        assert!(matches!(err, HookError::Handler(ref s) if s == "boom"));
    }

    #[tokio::test]
    async fn invalid_pattern_does_not_match() {
        let p = Pipeline::new().hears("(", echo(""));
        assert!(p.handle(IncomingMessage::new("c", "(")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_first_matching_handler_runs() {
        let p = Pipeline::new()
            .middleware(Stage::Heard, Arc::new(Tag("+")))
            .hears("hi", echo("first:"))
            .hears(".*", echo("second:"));
        let out = p.handle(IncomingMessage::new("c", "hi")).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "first:hi+");

        let out = p.handle(IncomingMessage::new("c", "other")).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "second:other+");
    }

    #[tokio::test]
    async fn heard_chain_runs_before_handler() {
        let p = Pipeline::new()
            .middleware(Stage::Heard, Arc::new(Tag("[a]")))
            .middleware(Stage::Heard, Arc::new(Tag("[b]")))
            .hears("ok", echo("re:"))
            .fallback(echo("fallback:"));
        let out = p.handle(IncomingMessage::new("c", "ok")).await.unwrap();
        assert_eq!(out[0].text, "re:ok[a][b]");
        let out = p.handle(IncomingMessage::new("c", "nope")).await.unwrap();
        assert_eq!(out[0].text, "fallback:nope[a][b]");
    }

    #[tokio::test]
    async fn received_chain_runs_before_matching() {
        let p = Pipeline::new()
            .middleware(Stage::Received, Arc::new(Tag("!")))
            .hears("hi!", echo("re:"));
        let out = p.handle(IncomingMessage::new("c", "hi")).await.unwrap();
        assert_eq!(out[0].text, "re:hi!");
    }

    #[tokio::test]
    async fn capture_runs_captured_chain_only() {
        let p = Pipeline::new()
            .middleware(Stage::Captured, Arc::new(Tag("<captured>")))
            .middleware(Stage::Received, Arc::new(Tag("<received>")))
            .middleware(Stage::Heard, Arc::new(Tag("<heard>")))
            .hears(".*", |_: &IncomingMessage| -> Result<Option<String>, String> {
                Err("handler must not run on capture".to_string())
            });
        let msg = p.capture(IncomingMessage::new("c", "yes")).await.unwrap();
        assert_eq!(msg.text, "yes<captured>");
    }
}
