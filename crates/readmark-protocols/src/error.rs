//! Error types shared across the protocol seams.

use thiserror::Error;

/// Errors crossing a browser capability boundary.
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// The capability is not available (e.g. no tab, surface detached).
    #[error("Surface unavailable: {0}")]
    Unavailable(String),

    /// Script injection or execution failed.
    #[error("Script error: {0}")]
    Script(String),

    /// The page side did not answer in time.
    #[error("Surface round trip timed out")]
    Timeout,
}

/// Errors on the internal message bus.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BusError {
    /// The router side of the bus is gone.
    #[error("Bus closed")]
    Closed,
}
