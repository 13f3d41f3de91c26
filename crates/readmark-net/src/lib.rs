//! # Readmark Net
//!
//! Everything that talks HTTP to the backend: the bounded-retry fetch
//! primitive for eventually-ready resources, and a typed client over the
//! backend's endpoints.

mod api;
mod error;
mod retry;

pub use api::{ApiClient, BookmarkOutcome};
pub use error::FetchError;
pub use retry::{fetch_with_retry, RequestSpec, NOT_READY};
