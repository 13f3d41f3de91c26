//! Citation highlighting round trip.

use tracing::{debug, warn};

use readmark_protocols::BusResponse;

use crate::context::ExtensionContext;

/// Resolve the active tab, make sure the highlighter is present, and ask the
/// page to mark the citation. The page round trip races a fixed timeout and
/// resolves to a failure result rather than hanging.
pub(crate) async fn handle_highlight(ctx: &ExtensionContext, verbatim: &str) -> BusResponse {
    if verbatim.trim().is_empty() {
        return BusResponse::Highlight {
            success: false,
            error: None,
        };
    }

    let tab_id = match ctx.session.active_tab() {
        Some(id) => id,
        // Nothing recorded yet; fall back to asking the host and remember
        // the answer for next time.
        None => match ctx.surfaces.tabs.active_tab().await {
            Ok(Some(tab)) => {
                ctx.session.set_active_tab(tab.id);
                tab.id
            }
            Ok(None) => {
                return BusResponse::Highlight {
                    success: false,
                    error: Some("no active tab".to_string()),
                }
            }
            Err(e) => {
                return BusResponse::Highlight {
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        },
    };

    if let Err(e) = ctx.surfaces.scripting.ensure_highlighter(tab_id).await {
        // The script may already be present from an earlier injection.
        warn!("Highlighter injection into tab {tab_id} failed: {e}");
    }

    let timeout = ctx.config.highlight.script_timeout();
    let request = ctx.surfaces.scripting.request_highlight(tab_id, verbatim);
    match tokio::time::timeout(timeout, request).await {
        Ok(Ok(success)) => {
            debug!("Highlight in tab {tab_id}: found={success}");
            BusResponse::Highlight {
                success,
                error: None,
            }
        }
        Ok(Err(e)) => BusResponse::Highlight {
            success: false,
            error: Some(e.to_string()),
        },
        Err(_) => BusResponse::Highlight {
            success: false,
            error: Some("page did not respond in time".to_string()),
        },
    }
}
