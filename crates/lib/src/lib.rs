//! Sift core library: Dialogflow intent enrichment as a message-pipeline middleware,
//! plus the pipeline that drives it. Used by the CLI.

pub mod chat;
pub mod config;
pub mod init;
pub mod matcher;
pub mod message;
pub mod middleware;
pub mod nlu;
pub mod pipeline;
