//! Configuration schema.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub retry: RetryConfig,
    pub channel: ChannelConfig,
    pub highlight: HighlightConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Sanity-check values that would otherwise fail deep inside a task.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.backend.base_url.starts_with("http://")
            && !self.backend.base_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid(format!(
                "backend.base_url must be http(s), got '{}'",
                self.backend.base_url
            )));
        }
        if self.retry.quick_attempts == 0 || self.retry.document_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry attempts must be at least 1".to_string(),
            ));
        }
        if self.channel.backoff_cap_ms < self.channel.backoff_base_ms {
            return Err(ConfigError::Invalid(
                "channel.backoff_cap_ms must be >= channel.backoff_base_ms".to_string(),
            ));
        }
        if self.highlight.anchor_words == 0 {
            return Err(ConfigError::Invalid(
                "highlight.anchor_words must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Backend service endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// HTTP base URL of the backend.
    pub base_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8889".to_string(),
        }
    }
}

impl BackendConfig {
    /// Duplex channel URL for a user, derived from the HTTP base.
    pub fn ws_url(&self, uid: &str) -> String {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.base_url.clone()
        };
        format!("{}/ws/{}/extension", ws_base.trim_end_matches('/'), uid)
    }
}

/// Bounded-retry fetch tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Fixed delay between attempts while the backend answers "not ready".
    /// No jitter: worst-case latency stays predictable.
    pub not_ready_delay_ms: u64,
    /// Budget for quick reads (ping, Q&A, chat, bookmark list).
    pub quick_attempts: u32,
    /// Budget for enriched-document polling; generation can take a while.
    pub document_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            not_ready_delay_ms: 1500,
            quick_attempts: 3,
            document_attempts: 30,
        }
    }
}

impl RetryConfig {
    pub fn not_ready_delay(&self) -> Duration {
        Duration::from_millis(self.not_ready_delay_ms)
    }
}

/// Duplex channel lifecycle tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Heartbeat ping interval, seconds.
    pub heartbeat_secs: u64,
    /// Watchdog period, seconds; forces a connect when the channel is down.
    pub watchdog_secs: u64,
    /// Reconnect backoff base, milliseconds.
    pub backoff_base_ms: u64,
    /// Reconnect backoff ceiling, milliseconds.
    pub backoff_cap_ms: u64,
    /// Reconnect attempts before giving up until the next external trigger.
    pub max_reconnect_attempts: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            heartbeat_secs: 30,
            watchdog_secs: 60,
            backoff_base_ms: 200,
            backoff_cap_ms: 30_000,
            max_reconnect_attempts: 10,
        }
    }
}

impl ChannelConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_secs(self.watchdog_secs)
    }

    /// Exponential backoff with ceiling for the given attempt count.
    pub fn backoff_delay(&self, attempts: u32) -> Duration {
        let exp = self
            .backoff_base_ms
            .saturating_mul(1u64.checked_shl(attempts).unwrap_or(u64::MAX));
        Duration::from_millis(exp.min(self.backoff_cap_ms))
    }
}

/// Text locator and highlight round-trip tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Hard cap on the page round trip, milliseconds.
    pub script_timeout_ms: u64,
    /// Boundary anchor length in words.
    pub anchor_words: usize,
    /// How many nodes past the start anchor the end anchor may sit.
    pub node_window: usize,
    /// Sentence fragments shorter than this many words are skipped.
    pub min_fragment_words: usize,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            script_timeout_ms: 2000,
            anchor_words: 3,
            node_window: 12,
            min_fragment_words: 3,
        }
    }
}

impl HighlightConfig {
    pub fn script_timeout(&self) -> Duration {
        Duration::from_millis(self.script_timeout_ms)
    }
}

/// Local persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the bookmark store file.
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "~/.readmark".to_string(),
        }
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
