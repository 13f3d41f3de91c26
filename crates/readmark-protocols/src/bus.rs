//! Internal message bus between UI surfaces and the background core.
//!
//! Each request is paired with a oneshot responder; the channel stays open
//! until a response is produced, and every failure path is converted into a
//! structured `BusResponse` before it crosses back to the caller.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::error::BusError;
use crate::types::{BookmarkRecord, TabInfo};

/// A request from a UI surface to the background core.
#[derive(Debug, Clone, PartialEq)]
pub enum BusRequest {
    /// Fetch the enriched document for a bookmark (long retry budget).
    FetchDocument { bookmark_id: i64 },
    /// Retry generation of a failed document, then fetch the result.
    RegenerateDocument { document: Value },
    /// Fetch the Q&A set for a document.
    FetchQanda { document_id: String },
    /// Fetch the chat transcript for a document.
    FetchChat { document_id: String },
    /// Submit a question about the current document.
    AskQuestion { payload: Value },
    /// Delete a chat message / Q&A entry.
    DeleteQanda { message_id: String },
    /// Delete a bookmark on the server.
    DeleteBookmark { bookmark_id: i64 },
    /// Bookmark the page in the given tab.
    BookmarkPage { tab: TabInfo },
    /// Locate and highlight a citation in the active page.
    HighlightCitation { verbatim: String },
    /// Look up whether a URL is already bookmarked.
    CheckForBookmarks { url: String },
    /// Refresh the action badge for a tab.
    UpdateBadge { tab: TabInfo },
    /// Probe backend health and kick the channel if it answers.
    ServerIs,
}

/// The asynchronous reply to a [`BusRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum BusResponse {
    Document { document: Option<Value> },
    Qanda { qanda: Option<Value> },
    Chat { chat: Option<Value>, error: Option<String> },
    Answer { answer: Option<Value> },
    Deleted { deleted: bool },
    BookmarkCreated { status: u16, content: Value },
    Highlight { success: bool, error: Option<String> },
    Bookmark { bookmark: Option<BookmarkRecord> },
    BadgeUpdated,
    ServerStatus { up: bool },
    /// No session; network work was short-circuited.
    NotAuthenticated,
    /// Terminal failure of the requested action.
    Failed { error: String },
}

/// A request together with its response slot.
#[derive(Debug)]
pub struct BusEnvelope {
    pub request: BusRequest,
    pub respond_to: oneshot::Sender<BusResponse>,
}

/// Cloneable sender half of the bus.
#[derive(Debug, Clone)]
pub struct Bus {
    tx: mpsc::Sender<BusEnvelope>,
}

impl Bus {
    /// Create a bus with the given queue depth, returning the receiver the
    /// router consumes.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<BusEnvelope>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Send a request and wait for its response.
    pub async fn call(&self, request: BusRequest) -> Result<BusResponse, BusError> {
        let (respond_to, rx) = oneshot::channel();
        self.tx
            .send(BusEnvelope {
                request,
                respond_to,
            })
            .await
            .map_err(|_| BusError::Closed)?;
        rx.await.map_err(|_| BusError::Closed)
    }
}

/// Push notification from the core to a UI surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum PanelNotice {
    /// A freshly generated document arrived over the channel.
    NewDoc { data: Value },
    ChatReady { data: Value },
    ChatNotReady { data: Value },
    #[serde(rename = "progress_percentage")]
    ProgressPercentage { data: Value },
    ErrorBookmarking { data: Value },
    SuggestedQuestions { data: Value },
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
