//! Core domain records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A bookmarked page and its server-side derived document.
///
/// Deserializing from a server payload projects onto exactly these fields;
/// anything extra the server sends is dropped. Structural equality over the
/// full record drives cache deduplication, so the derives matter here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BookmarkRecord {
    /// Server-assigned bookmark ID.
    pub id: i64,
    /// Canonical page URL.
    pub url: String,
    /// Page title, if the server extracted one.
    #[serde(default)]
    pub title: Option<String>,
    /// Last server-side modification time.
    pub updated_at: DateTime<Utc>,
    /// Owning user.
    pub user_id: String,
    /// Server-side snapshot filename.
    #[serde(default)]
    pub filename: Option<String>,
    /// Derived document ID, present once generation started.
    #[serde(default)]
    pub document_id: Option<String>,
}

impl BookmarkRecord {
    /// Parse bookmark records out of a channel or HTTP payload.
    ///
    /// The backend sends either a single record or an array of them; both
    /// shapes collapse to a `Vec`. Entries that do not deserialize into a
    /// record are dropped, matching the drop-malformed policy for inbound
    /// payloads.
    pub fn from_payload(payload: &Value) -> Vec<BookmarkRecord> {
        match payload {
            Value::Array(items) => items
                .iter()
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect(),
            other => serde_json::from_value(other.clone())
                .map(|r| vec![r])
                .unwrap_or_default(),
        }
    }
}

/// The authenticated user for this process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionUser {
    /// Stable user ID; keys the duplex channel URL and bookmark queries.
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl SessionUser {
    /// Create a session user from a uid.
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
        }
    }
}

/// A browser tab as seen by the background core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TabInfo {
    pub id: i64,
    pub url: String,
}

impl TabInfo {
    pub fn new(id: i64, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
        }
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
