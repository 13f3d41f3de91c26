//! Configuration errors.

use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse failure.
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A referenced environment variable is not set.
    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    /// A value failed validation.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
