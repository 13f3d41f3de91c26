//! Connection lifecycle state.

use std::fmt;

/// Where the channel is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and none being attempted.
    Idle,
    /// A handshake is in flight.
    Connecting,
    /// Connected; events are flowing.
    Open,
    /// The connection dropped; backoff reconnects are running.
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Reconnecting => "reconnecting",
        };
        write!(f, "{s}")
    }
}
