//! # Readmark Runtime
//!
//! Wires the background core together: the process-scoped context, the bus
//! router that serves UI requests, the channel event fan-out, and the
//! session lifecycle that rebuilds state on login and tears it down on
//! logout.

mod context;
mod highlight;
mod hosts;
mod lifecycle;
mod router;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use readmark_protocols::Bus;

pub use context::{ExtensionContext, Surfaces};
pub use hosts::{DetachedBadge, DetachedPanel, DetachedTabs, LocalPageHost};
pub use lifecycle::run_session_lifecycle;
pub use router::{run_channel_events, EventRouter};

/// Start the background core over a context. Spawns the router, the channel
/// event listener, and the session lifecycle, and returns the bus handle UI
/// surfaces talk to.
pub fn start(ctx: Arc<ExtensionContext>) -> Bus {
    let (bus, bus_rx) = Bus::new(32);
    tokio::spawn(EventRouter::new(ctx.clone()).run(bus_rx));
    tokio::spawn(run_channel_events(ctx.clone(), ctx.connection.subscribe()));
    tokio::spawn(run_session_lifecycle(ctx.clone(), ctx.session.subscribe()));
    bus
}
