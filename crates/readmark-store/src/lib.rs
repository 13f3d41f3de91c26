//! # Readmark Store
//!
//! Local durable state: the bookmark cache reconciled against server pushes
//! and session transitions, the stores backing it, and the session record
//! whose login/logout transitions drive cache and channel lifecycle.

mod cache;
mod error;
mod session;
mod source;
mod store;

pub use cache::BookmarkCache;
pub use error::StoreError;
pub use session::{SessionStore, SessionTransition};
pub use source::{BookmarkSource, SourceError};
pub use store::{BookmarkStore, FileBookmarkStore, MemoryBookmarkStore};
