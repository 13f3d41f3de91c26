//! Session-driven lifecycle.
//!
//! Login rebuilds the bookmark cache from the server and opens the channel;
//! logout clears the cache and tears the channel down.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use readmark_store::SessionTransition;

use crate::context::ExtensionContext;

pub async fn run_session_lifecycle(
    ctx: Arc<ExtensionContext>,
    mut transitions: broadcast::Receiver<SessionTransition>,
) {
    loop {
        match transitions.recv().await {
            Ok(SessionTransition::LoggedIn(user)) => {
                info!("Login for uid {}, rebuilding state", user.uid);
                match ctx.cache.rebuild(&user.uid, &ctx.api).await {
                    Ok(count) => debug!("Cache rebuilt with {count} bookmark(s)"),
                    Err(e) => warn!("Cache rebuild on login failed: {e}"),
                }
                if let Err(e) = ctx.connection.connect(&user.uid).await {
                    warn!("Channel connect on login failed: {e}");
                }
            }
            Ok(SessionTransition::LoggedOut) => {
                info!("Logout, clearing state");
                if let Err(e) = ctx.cache.clear().await {
                    warn!("Cache clear on logout failed: {e}");
                }
                ctx.connection.shutdown().await;
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Session lifecycle lagged, {n} transition(s) skipped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    debug!("Session transition stream closed");
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
