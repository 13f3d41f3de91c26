//! Session state and login/logout transitions.

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::info;

use readmark_protocols::SessionUser;

/// A session boundary crossing.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionTransition {
    /// Absent -> present. Subscribers rebuild the cache and connect the
    /// channel.
    LoggedIn(SessionUser),
    /// Present -> absent. Subscribers clear the cache and tear the channel
    /// down.
    LoggedOut,
}

#[derive(Default)]
struct SessionInner {
    user: Option<SessionUser>,
    active_tab_id: Option<i64>,
}

/// Process-wide session record plus the active tab.
///
/// Only boundary crossings are published: logging in while already logged in
/// updates the record silently, matching the storage-change semantics the
/// lifecycle is driven by.
pub struct SessionStore {
    inner: RwLock<SessionInner>,
    events: broadcast::Sender<SessionTransition>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: RwLock::new(SessionInner::default()),
            events,
        }
    }

    /// Record a login. Publishes `LoggedIn` only on absent -> present.
    pub fn login(&self, user: SessionUser) {
        let was_absent = {
            let mut inner = self.inner.write();
            let was_absent = inner.user.is_none();
            inner.user = Some(user.clone());
            was_absent
        };
        if was_absent {
            info!("Session login detected for uid {}", user.uid);
            let _ = self.events.send(SessionTransition::LoggedIn(user));
        }
    }

    /// Record a logout. Clears the active tab too and publishes `LoggedOut`
    /// only on present -> absent.
    pub fn logout(&self) {
        let was_present = {
            let mut inner = self.inner.write();
            let was_present = inner.user.is_some();
            inner.user = None;
            inner.active_tab_id = None;
            was_present
        };
        if was_present {
            info!("Session logout detected");
            let _ = self.events.send(SessionTransition::LoggedOut);
        }
    }

    /// The current session user, if any.
    pub fn user(&self) -> Option<SessionUser> {
        self.inner.read().user.clone()
    }

    /// Whether a session exists.
    pub fn is_authenticated(&self) -> bool {
        self.inner.read().user.is_some()
    }

    pub fn set_active_tab(&self, tab_id: i64) {
        self.inner.write().active_tab_id = Some(tab_id);
    }

    pub fn active_tab(&self) -> Option<i64> {
        self.inner.read().active_tab_id
    }

    /// Subscribe to session boundary crossings.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionTransition> {
        self.events.subscribe()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
