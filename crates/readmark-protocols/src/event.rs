//! Duplex-channel message definitions.
//!
//! Inbound messages form a closed set tagged by `type`; dispatch over
//! `ChannelEvent` is a total `match`, so adding a variant forces every
//! router arm to be revisited at build time.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound event pushed by the backend over the duplex channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelEvent {
    /// A derived document is ready to render.
    Document {
        #[serde(default)]
        document_id: Option<String>,
        data: Value,
    },
    /// Document generation started or advanced; payload carries the
    /// bookmark record(s) to reconcile into the cache.
    DocumentInProgress { data: Value },
    /// Document generation failed; payload carries the failed record(s).
    DocumentError { data: Value },
    /// Generation progress, 0-100.
    ProgressPercentage { data: Value },
    /// Chat for a document became available.
    ChatReady { data: Value },
    /// Chat requested before the document finished processing.
    ChatNotReady { data: Value },
    /// Backend-reported error.
    Error { data: Value },
    /// Server-suggested questions for the current document.
    SuggestedQuestions { data: Value },
}

impl ChannelEvent {
    /// Wire tag of this event, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ChannelEvent::Document { .. } => "document",
            ChannelEvent::DocumentInProgress { .. } => "document_in_progress",
            ChannelEvent::DocumentError { .. } => "document_error",
            ChannelEvent::ProgressPercentage { .. } => "progress_percentage",
            ChannelEvent::ChatReady { .. } => "chat_ready",
            ChannelEvent::ChatNotReady { .. } => "chat_not_ready",
            ChannelEvent::Error { .. } => "error",
            ChannelEvent::SuggestedQuestions { .. } => "suggested_questions",
        }
    }
}

/// Outbound frame sent by the client over the duplex channel.
///
/// Heartbeats are the only client-initiated traffic on the channel; all
/// request/response work goes over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    Ping,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
