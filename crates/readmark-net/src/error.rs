//! Error types for backend fetches.

use thiserror::Error;

/// Errors that can occur while fetching from the backend.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure; not retried beyond the bounded-retry ladder.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend kept answering "not ready" through the whole budget.
    #[error("Resource at {url} not ready after {attempts} attempts")]
    RetryExhausted { url: String, attempts: u32 },

    /// Response body was not the JSON we expected.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl FetchError {
    /// Whether this failure is the terminal "backend never became ready".
    pub fn is_retry_exhausted(&self) -> bool {
        matches!(self, FetchError::RetryExhausted { .. })
    }
}
