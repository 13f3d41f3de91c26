//! # Readmark Channel
//!
//! The duplex channel carrying server-push events: document readiness, chat
//! state, generation progress. One connection per signed-in user, kept alive
//! by a heartbeat and revived by backoff reconnects plus a periodic watchdog.

mod error;
mod manager;
mod state;

pub use error::ChannelError;
pub use manager::ConnectionManager;
pub use state::ConnectionState;
