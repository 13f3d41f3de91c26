//! Channel errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    /// The WebSocket handshake or transport failed.
    #[error("Channel connect failed: {0}")]
    Connect(String),
}
