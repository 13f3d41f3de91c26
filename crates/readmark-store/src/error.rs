//! Error types for local storage.

use thiserror::Error;

use crate::source::SourceError;

/// Errors that can occur in the bookmark store and cache.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying file IO failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A cache rebuild could not fetch the authoritative list.
    #[error(transparent)]
    Source(#[from] SourceError),
}
