//! Capability traits over browser-provided primitives.
//!
//! The background core never touches tab, scripting, badge, or panel APIs
//! directly; it goes through these seams. Production builds bind them to the
//! extension host, tests bind hand-rolled fakes.

use async_trait::async_trait;

use crate::bus::PanelNotice;
use crate::error::SurfaceError;
use crate::types::TabInfo;

/// Tab queries.
#[async_trait]
pub trait TabHost: Send + Sync {
    /// The currently active tab, if any.
    async fn active_tab(&self) -> Result<Option<TabInfo>, SurfaceError>;
}

/// Script execution inside a page.
#[async_trait]
pub trait PageScripting: Send + Sync {
    /// Capture the page's HTML. `None` when capture failed but the caller
    /// should continue without it.
    async fn capture_html(&self, tab_id: i64) -> Result<Option<String>, SurfaceError>;

    /// Make sure the highlighter script is present in the page. Injecting
    /// over an already-loaded script is a no-op.
    async fn ensure_highlighter(&self, tab_id: i64) -> Result<(), SurfaceError>;

    /// Ask the in-page highlighter to locate and mark `verbatim`.
    /// Returns whether a match was found.
    async fn request_highlight(&self, tab_id: i64, verbatim: &str) -> Result<bool, SurfaceError>;
}

/// Action badge control.
#[async_trait]
pub trait BadgeSurface: Send + Sync {
    async fn badge_on(&self, tab_id: i64) -> Result<(), SurfaceError>;
    async fn badge_off(&self, tab_id: i64) -> Result<(), SurfaceError>;
}

/// Outbound port to the side panel / popup.
#[async_trait]
pub trait PanelPort: Send + Sync {
    /// Deliver a notice to the surface. Delivery to a closed surface is not
    /// an error; the notice is simply dropped.
    async fn notify(&self, notice: PanelNotice) -> Result<(), SurfaceError>;

    /// Whether a surface is currently attached. Gates the cache-miss
    /// server fall-through.
    fn is_active(&self) -> bool;
}
