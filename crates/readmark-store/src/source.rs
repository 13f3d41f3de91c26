//! Authoritative bookmark source for cache rebuilds.

use async_trait::async_trait;
use thiserror::Error;

use readmark_protocols::BookmarkRecord;

/// Failure fetching the authoritative bookmark list.
#[derive(Debug, Error)]
#[error("Bookmark source error: {0}")]
pub struct SourceError(pub String);

/// Where `rebuild` gets the server's authoritative bookmark list from.
///
/// The HTTP client implements this; tests hand in fixed lists.
#[async_trait]
pub trait BookmarkSource: Send + Sync {
    async fn fetch_all(&self, user_id: &str) -> Result<Vec<BookmarkRecord>, SourceError>;
}
