//! Middleware contract: five interception points a pipeline stage exposes to the host.
//!
//! `captured`, `received`, `heard` and `sending` take a `Next` continuation that owns the rest
//! of the stage; forwarding means calling `next.run(..)`. `matching` is a plain predicate.

mod dialogflow;

pub use dialogflow::{DialogflowMiddleware, DialogflowMiddlewareBuilder};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::message::{IncomingMessage, OutgoingPayload};
use crate::nlu::NluError;

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error(transparent)]
    Nlu(#[from] NluError),
    #[error("handler failed: {0}")]
    Handler(String),
}

pub type HookFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, HookError>> + Send + 'a>>;

type Hook<T> = for<'a> fn(&'a dyn Middleware, T, Next<'a, T>) -> HookFuture<'a, T>;

/// A pipeline stage. Every hook forwards unchanged by default.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// A message answering a pending question was captured.
    async fn captured(
        &self,
        message: IncomingMessage,
        next: Next<'_, IncomingMessage>,
    ) -> Result<IncomingMessage, HookError> {
        next.run(message).await
    }

    /// A message arrived, before any handler matching.
    async fn received(
        &self,
        message: IncomingMessage,
        next: Next<'_, IncomingMessage>,
    ) -> Result<IncomingMessage, HookError> {
        next.run(message).await
    }

    /// Whether a handler registered with `pattern` should fire. `regex_matched` is the host's
    /// own text match result.
    fn matching(&self, _message: &IncomingMessage, _pattern: &str, _regex_matched: bool) -> bool {
        true
    }

    /// A handler matched and is about to run.
    async fn heard(
        &self,
        message: IncomingMessage,
        next: Next<'_, IncomingMessage>,
    ) -> Result<IncomingMessage, HookError> {
        next.run(message).await
    }

    /// A reply is about to leave the bot.
    async fn sending(
        &self,
        payload: OutgoingPayload,
        next: Next<'_, OutgoingPayload>,
    ) -> Result<OutgoingPayload, HookError> {
        next.run(payload).await
    }
}

/// The remainder of one stage's middleware chain. Consumed by `run`.
pub struct Next<'a, T> {
    chain: &'a [Arc<dyn Middleware>],
    hook: Hook<T>,
}

fn captured_hook<'a>(
    m: &'a dyn Middleware,
    message: IncomingMessage,
    next: Next<'a, IncomingMessage>,
) -> HookFuture<'a, IncomingMessage> {
    m.captured(message, next)
}

fn received_hook<'a>(
    m: &'a dyn Middleware,
    message: IncomingMessage,
    next: Next<'a, IncomingMessage>,
) -> HookFuture<'a, IncomingMessage> {
    m.received(message, next)
}

fn heard_hook<'a>(
    m: &'a dyn Middleware,
    message: IncomingMessage,
    next: Next<'a, IncomingMessage>,
) -> HookFuture<'a, IncomingMessage> {
    m.heard(message, next)
}

fn sending_hook<'a>(
    m: &'a dyn Middleware,
    payload: OutgoingPayload,
    next: Next<'a, OutgoingPayload>,
) -> HookFuture<'a, OutgoingPayload> {
    m.sending(payload, next)
}

impl<'a> Next<'a, IncomingMessage> {
    pub fn captured(chain: &'a [Arc<dyn Middleware>]) -> Self {
        Self {
            chain,
            hook: captured_hook,
        }
    }

    pub fn received(chain: &'a [Arc<dyn Middleware>]) -> Self {
        Self {
            chain,
            hook: received_hook,
        }
    }

    pub fn heard(chain: &'a [Arc<dyn Middleware>]) -> Self {
        Self {
            chain,
            hook: heard_hook,
        }
    }
}

impl<'a> Next<'a, OutgoingPayload> {
    pub fn sending(chain: &'a [Arc<dyn Middleware>]) -> Self {
        Self {
            chain,
            hook: sending_hook,
        }
    }
}

impl<'a, T: Send + 'a> Next<'a, T> {
    /// Hand `value` to the next middleware in the stage; at the end of the chain, return it.
    pub fn run(self, value: T) -> HookFuture<'a, T> {
        match self.chain.split_first() {
            Some((first, rest)) => (self.hook)(
                &**first,
                value,
                Next {
                    chain: rest,
                    hook: self.hook,
                },
            ),
            None => Box::pin(async move { Ok(value) }),
        }
    }
}
