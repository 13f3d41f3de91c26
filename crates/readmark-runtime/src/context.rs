//! Process-scoped context.
//!
//! Everything the core needs lives here explicitly and is passed to the
//! components that use it; there is no ambient module state to reset on
//! logout or suspend.

use std::sync::Arc;

use readmark_channel::ConnectionManager;
use readmark_config::Config;
use readmark_net::ApiClient;
use readmark_protocols::{BadgeSurface, PageScripting, PanelPort, TabHost};
use readmark_store::{BookmarkCache, SessionStore};

/// Bindings to the host browser's capabilities.
pub struct Surfaces {
    pub tabs: Arc<dyn TabHost>,
    pub scripting: Arc<dyn PageScripting>,
    pub badge: Arc<dyn BadgeSurface>,
    pub panel: Arc<dyn PanelPort>,
}

/// The background core's shared state.
pub struct ExtensionContext {
    pub config: Config,
    pub session: Arc<SessionStore>,
    pub cache: BookmarkCache,
    pub api: ApiClient,
    pub connection: ConnectionManager,
    pub surfaces: Surfaces,
}

impl ExtensionContext {
    pub fn new(
        config: Config,
        session: Arc<SessionStore>,
        cache: BookmarkCache,
        api: ApiClient,
        connection: ConnectionManager,
        surfaces: Surfaces,
    ) -> Self {
        Self {
            config,
            session,
            cache,
            api,
            connection,
            surfaces,
        }
    }
}
