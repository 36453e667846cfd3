//! Pipeline used by `sift chat`: Dialogflow on the received stage, replies from the agent's
//! fulfillment text. With `listen_for_action`, messages with a detected action are routed
//! through an action-gated listener that also reports the action.

use std::sync::Arc;

use crate::message::IncomingMessage;
use crate::middleware::{DialogflowMiddleware, Middleware};
use crate::pipeline::{Pipeline, Stage};

fn fulfillment_reply(m: &IncomingMessage) -> Result<Option<String>, String> {
    let reply = m.api_reply().trim();
    if reply.is_empty() {
        Ok(None)
    } else {
        Ok(Some(reply.to_string()))
    }
}

fn action_reply(m: &IncomingMessage) -> Result<Option<String>, String> {
    let reply = m.api_reply().trim();
    let action = m.api_action();
    if reply.is_empty() {
        Ok(Some(format!("[{}]", action)))
    } else {
        Ok(Some(format!("[{}] {}", action, reply)))
    }
}

/// Build the chat pipeline around `dialogflow`.
pub fn chat_pipeline(dialogflow: DialogflowMiddleware) -> Pipeline {
    let listen_for_action = dialogflow.config().listen_for_action;
    let dialogflow: Arc<dyn Middleware> = Arc::new(dialogflow);
    let pipeline = Pipeline::new().middleware(Stage::Received, dialogflow.clone());
    let pipeline = if listen_for_action {
        pipeline.hears_with(".+", action_reply, vec![dialogflow])
    } else {
        pipeline
    };
    pipeline.fallback(fulfillment_reply)
}
