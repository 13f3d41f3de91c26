//! Surface bindings for embedders without a browser attached.
//!
//! `LocalPageHost` serves hosts that already extracted a page's text nodes
//! and want highlighting done in-process; the `Detached*` bindings are
//! inert stand-ins for running the core headless.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, info};

use readmark_config::HighlightConfig;
use readmark_locator::{Locator, PageModel};
use readmark_protocols::{
    BadgeSurface, PageScripting, PanelNotice, PanelPort, SurfaceError, TabHost, TabInfo,
};

/// In-process page scripting over pre-extracted text nodes, one page per
/// tab id.
pub struct LocalPageHost {
    locator: Locator,
    pages: Mutex<HashMap<i64, PageModel>>,
}

impl LocalPageHost {
    pub fn new(config: HighlightConfig) -> Self {
        Self {
            locator: Locator::new(config),
            pages: Mutex::new(HashMap::new()),
        }
    }

    /// Register (or replace) the text nodes backing a tab.
    pub fn load_page(&self, tab_id: i64, nodes: Vec<String>) {
        self.pages.lock().insert(tab_id, PageModel::new(nodes));
    }

    /// Highlight count for a tab, for callers inspecting the outcome.
    pub fn highlight_count(&self, tab_id: i64) -> usize {
        self.pages
            .lock()
            .get(&tab_id)
            .map(|page| page.highlights().len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl PageScripting for LocalPageHost {
    async fn capture_html(&self, _tab_id: i64) -> Result<Option<String>, SurfaceError> {
        // Pages here are text nodes, not markup.
        Ok(None)
    }

    async fn ensure_highlighter(&self, _tab_id: i64) -> Result<(), SurfaceError> {
        Ok(())
    }

    async fn request_highlight(&self, tab_id: i64, verbatim: &str) -> Result<bool, SurfaceError> {
        let mut pages = self.pages.lock();
        let page = pages
            .get_mut(&tab_id)
            .ok_or_else(|| SurfaceError::Unavailable(format!("no page for tab {tab_id}")))?;
        Ok(page.apply(&self.locator, verbatim))
    }
}

/// Tab host with no browser behind it.
pub struct DetachedTabs;

#[async_trait]
impl TabHost for DetachedTabs {
    async fn active_tab(&self) -> Result<Option<TabInfo>, SurfaceError> {
        Ok(None)
    }
}

/// Badge surface that only logs.
pub struct DetachedBadge;

#[async_trait]
impl BadgeSurface for DetachedBadge {
    async fn badge_on(&self, tab_id: i64) -> Result<(), SurfaceError> {
        debug!("Badge on for tab {tab_id}");
        Ok(())
    }

    async fn badge_off(&self, tab_id: i64) -> Result<(), SurfaceError> {
        debug!("Badge off for tab {tab_id}");
        Ok(())
    }
}

/// Panel port that logs notices and reports no attached surface.
pub struct DetachedPanel;

#[async_trait]
impl PanelPort for DetachedPanel {
    async fn notify(&self, notice: PanelNotice) -> Result<(), SurfaceError> {
        info!("Panel notice: {notice:?}");
        Ok(())
    }

    fn is_active(&self) -> bool {
        false
    }
}
