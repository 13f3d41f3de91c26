//! Shared fixtures for runtime tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use wiremock::MockServer;

use readmark_channel::ConnectionManager;
use readmark_config::Config;
use readmark_net::ApiClient;
use readmark_protocols::{
    BadgeSurface, PageScripting, PanelNotice, PanelPort, SurfaceError, TabHost, TabInfo,
};
use readmark_store::{BookmarkCache, MemoryBookmarkStore, SessionStore};

use crate::context::{ExtensionContext, Surfaces};
use crate::hosts::LocalPageHost;

#[derive(Default)]
pub struct RecordingBadge {
    /// (tab id, on/off) in call order.
    pub states: Mutex<Vec<(i64, bool)>>,
}

#[async_trait]
impl BadgeSurface for RecordingBadge {
    async fn badge_on(&self, tab_id: i64) -> Result<(), SurfaceError> {
        self.states.lock().push((tab_id, true));
        Ok(())
    }

    async fn badge_off(&self, tab_id: i64) -> Result<(), SurfaceError> {
        self.states.lock().push((tab_id, false));
        Ok(())
    }
}

pub struct RecordingPanel {
    pub notices: Mutex<Vec<PanelNotice>>,
    active: bool,
}

impl RecordingPanel {
    pub fn new(active: bool) -> Self {
        Self {
            notices: Mutex::new(Vec::new()),
            active,
        }
    }
}

#[async_trait]
impl PanelPort for RecordingPanel {
    async fn notify(&self, notice: PanelNotice) -> Result<(), SurfaceError> {
        self.notices.lock().push(notice);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

pub struct FixedTabs(pub Option<TabInfo>);

#[async_trait]
impl TabHost for FixedTabs {
    async fn active_tab(&self) -> Result<Option<TabInfo>, SurfaceError> {
        Ok(self.0.clone())
    }
}

/// Scripting whose highlight request never answers within any test timeout.
pub struct HangingScripting;

#[async_trait]
impl PageScripting for HangingScripting {
    async fn capture_html(&self, _tab_id: i64) -> Result<Option<String>, SurfaceError> {
        Ok(None)
    }

    async fn ensure_highlighter(&self, _tab_id: i64) -> Result<(), SurfaceError> {
        Ok(())
    }

    async fn request_highlight(&self, _tab_id: i64, _verbatim: &str) -> Result<bool, SurfaceError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(false)
    }
}

/// Scripting with a canned HTML capture.
pub struct CannedScripting {
    pub html: Option<String>,
}

#[async_trait]
impl PageScripting for CannedScripting {
    async fn capture_html(&self, _tab_id: i64) -> Result<Option<String>, SurfaceError> {
        Ok(self.html.clone())
    }

    async fn ensure_highlighter(&self, _tab_id: i64) -> Result<(), SurfaceError> {
        Ok(())
    }

    async fn request_highlight(&self, _tab_id: i64, _verbatim: &str) -> Result<bool, SurfaceError> {
        Ok(false)
    }
}

pub struct TestCore {
    pub ctx: Arc<ExtensionContext>,
    pub server: MockServer,
    pub badge: Arc<RecordingBadge>,
    pub panel: Arc<RecordingPanel>,
    pub pages: Arc<LocalPageHost>,
}

/// A context wired against a mock backend, recording surfaces, and an
/// in-process page host.
pub async fn core(panel_active: bool) -> TestCore {
    let server = MockServer::start().await;
    core_against(server, panel_active, None).await
}

/// Like [`core`] but with a caller-supplied scripting surface.
pub async fn core_with_scripting(
    panel_active: bool,
    scripting: Arc<dyn PageScripting>,
) -> TestCore {
    let server = MockServer::start().await;
    core_against(server, panel_active, Some(scripting)).await
}

async fn core_against(
    server: MockServer,
    panel_active: bool,
    scripting: Option<Arc<dyn PageScripting>>,
) -> TestCore {
    let mut config = Config::default();
    config.backend.base_url = server.uri();
    config.retry.not_ready_delay_ms = 5;
    config.highlight.script_timeout_ms = 200;
    config.channel.backoff_base_ms = 10;
    config.channel.backoff_cap_ms = 20;

    let api = ApiClient::new(&config.backend, config.retry.clone()).unwrap();
    let connection = ConnectionManager::new(config.backend.clone(), config.channel.clone());
    let cache = BookmarkCache::new(Arc::new(MemoryBookmarkStore::new()));
    let session = Arc::new(SessionStore::new());
    let badge = Arc::new(RecordingBadge::default());
    let panel = Arc::new(RecordingPanel::new(panel_active));
    let pages = Arc::new(LocalPageHost::new(config.highlight.clone()));

    let surfaces = Surfaces {
        tabs: Arc::new(FixedTabs(Some(TabInfo {
            id: 7,
            url: "https://a.com/x".to_string(),
        }))),
        scripting: scripting.unwrap_or_else(|| pages.clone()),
        badge: badge.clone(),
        panel: panel.clone(),
    };

    let ctx = Arc::new(ExtensionContext::new(
        config, session, cache, api, connection, surfaces,
    ));
    TestCore {
        ctx,
        server,
        badge,
        panel,
        pages,
    }
}
