//! Messages flowing through the pipeline and the extras side-channel.
//!
//! Middleware only ever mutates `extras`; text and identifiers are owned by the channel
//! that produced the message.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::nlu::NormalizedExtras;

/// Per-message side-channel: string keys to arbitrary JSON values.
pub type Extras = Map<String, Value>;

/// Extras key holding the fulfillment text returned by the NLU provider.
pub const API_REPLY: &str = "apiReply";
/// Extras key holding the detected action name.
pub const API_ACTION: &str = "apiAction";
/// Extras key holding the "all required parameters collected" flag.
pub const API_ACTION_INCOMPLETE: &str = "apiActionIncomplete";
/// Extras key holding the detected intent display name.
pub const API_INTENT: &str = "apiIntent";
/// Extras key holding the detected parameter mapping.
pub const API_PARAMETERS: &str = "apiParameters";

/// A message from a channel, passed through the middleware stages before any handler sees it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    pub channel_id: String,
    pub conversation_id: String,
    pub text: String,
    #[serde(default)]
    pub extras: Extras,
}

impl IncomingMessage {
    pub fn new(conversation_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel_id: String::new(),
            conversation_id: conversation_id.into(),
            text: text.into(),
            extras: Extras::new(),
        }
    }

    /// Set the originating channel id (e.g. "stdin").
    pub fn with_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = channel_id.into();
        self
    }

    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extras.get(key)
    }

    /// Insert or overwrite a single extras key.
    pub fn add_extra(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.extras.insert(key.into(), value.into());
    }

    /// The detected action, or "" when no NLU stage has written one.
    pub fn api_action(&self) -> &str {
        self.extra(API_ACTION).and_then(Value::as_str).unwrap_or("")
    }

    /// The provider's fulfillment text, or "".
    pub fn api_reply(&self) -> &str {
        self.extra(API_REPLY).and_then(Value::as_str).unwrap_or("")
    }
}

/// Outbound reply produced by a handler, passed through the sending stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingPayload {
    pub conversation_id: String,
    pub text: String,
    #[serde(default)]
    pub extras: Extras,
}

impl OutgoingPayload {
    pub fn reply_to(message: &IncomingMessage, text: impl Into<String>) -> Self {
        Self {
            conversation_id: message.conversation_id.clone(),
            text: text.into(),
            extras: Extras::new(),
        }
    }
}

/// Write the five NLU keys into the message extras. Overwrites those keys, leaves every other key alone.
pub fn attach(message: &mut IncomingMessage, extras: &NormalizedExtras) {
    message.add_extra(API_REPLY, extras.reply.clone());
    message.add_extra(API_ACTION, extras.action.clone());
    message.add_extra(API_ACTION_INCOMPLETE, extras.action_incomplete);
    message.add_extra(API_INTENT, extras.intent.clone());
    message.add_extra(API_PARAMETERS, Value::Object(extras.parameters.clone()));
}
