//! # Readmark Locator
//!
//! Finds a quoted citation inside a page's text nodes, tolerant of
//! whitespace and quote-character drift and of spans that cross node
//! boundaries. The locator plans byte-exact highlight spans; applying them
//! to a live page is the host's job.

mod locate;
mod page;
mod text;

pub use locate::{HighlightSpan, Locator};
pub use page::PageModel;
