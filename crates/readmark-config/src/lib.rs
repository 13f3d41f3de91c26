//! # Readmark Config
//!
//! Configuration management for the readmark background core.

mod error;
mod loader;
mod schema;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
