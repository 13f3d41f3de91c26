//! Bookmark cache reconciled against server state.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use readmark_protocols::{normalize_url, BookmarkRecord};

use crate::error::StoreError;
use crate::source::BookmarkSource;
use crate::store::BookmarkStore;

/// Read-through/write-through cache of bookmark records.
///
/// Mutations are read-modify-write against the backing store and hold a
/// write lock across the load and the save, so a push-driven upsert racing
/// a login-time rebuild cannot clobber the other's records.
#[derive(Clone)]
pub struct BookmarkCache {
    store: Arc<dyn BookmarkStore>,
    write_lock: Arc<Mutex<()>>,
}

impl BookmarkCache {
    /// Create a cache over the given store.
    pub fn new(store: Arc<dyn BookmarkStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Look up a bookmark by canonical URL in the local store only.
    ///
    /// A miss returns `None`; the server fall-through (and its surface
    /// gating) happens in the router, and a miss-triggered server hit never
    /// populates the cache; only `rebuild` does.
    ///
    /// When duplicate records share a URL (possible between a push-driven
    /// upsert and the next rebuild), the most recently updated one wins.
    pub async fn lookup(&self, canonical_url: &str) -> Result<Option<BookmarkRecord>, StoreError> {
        let records = self.store.load().await?;
        Ok(records
            .into_iter()
            .filter(|r| r.url == canonical_url)
            .max_by_key(|r| r.updated_at))
    }

    /// Merge records into the cache.
    ///
    /// Each incoming record's URL is normalized, the record set is
    /// deduplicated by structural equality over the full record, and the
    /// merged set is persisted atomically. Two records sharing a URL but
    /// differing elsewhere both survive until the next `rebuild`.
    pub async fn upsert_many(&self, incoming: Vec<BookmarkRecord>) -> Result<(), StoreError> {
        let _write = self.write_lock.lock().await;
        self.merge(incoming).await
    }

    async fn merge(&self, incoming: Vec<BookmarkRecord>) -> Result<(), StoreError> {
        let mut merged = self.store.load().await?;
        let mut seen: HashSet<BookmarkRecord> = merged.iter().cloned().collect();

        for record in incoming {
            let record = BookmarkRecord {
                url: normalize_url(&record.url),
                ..record
            };
            if seen.insert(record.clone()) {
                merged.push(record);
            }
        }

        debug!("Cache upsert, {} record(s) total", merged.len());
        self.store.save(&merged).await
    }

    /// Rebuild the cache from the server's authoritative list.
    ///
    /// Clears first: the fetched list fully replaces local state, including
    /// any same-URL duplicates accumulated from push events.
    pub async fn rebuild(
        &self,
        user_id: &str,
        source: &dyn BookmarkSource,
    ) -> Result<usize, StoreError> {
        let fresh = source.fetch_all(user_id).await?;
        let count = fresh.len();
        let _write = self.write_lock.lock().await;
        self.store.clear().await?;
        self.merge(fresh).await?;
        info!("Cache rebuilt for user {} with {} bookmark(s)", user_id, count);
        Ok(count)
    }

    /// Drop all cached records. Triggered on logout.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let _write = self.write_lock.lock().await;
        self.store.clear().await
    }

    /// Number of cached records.
    pub async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.store.load().await?.len())
    }

    /// Whether the cache holds anything.
    pub async fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len().await? == 0)
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
