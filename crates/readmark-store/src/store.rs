//! Bookmark persistence.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use readmark_protocols::BookmarkRecord;

use crate::error::StoreError;

/// Bookmark storage trait.
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// Load the full record set.
    async fn load(&self) -> Result<Vec<BookmarkRecord>, StoreError>;

    /// Replace the full record set.
    async fn save(&self, records: &[BookmarkRecord]) -> Result<(), StoreError>;

    /// Drop everything.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// In-memory bookmark store for testing and ephemeral sessions.
pub struct MemoryBookmarkStore {
    records: tokio::sync::RwLock<Vec<BookmarkRecord>>,
}

impl MemoryBookmarkStore {
    /// Create an empty memory store.
    pub fn new() -> Self {
        Self {
            records: tokio::sync::RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryBookmarkStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookmarkStore for MemoryBookmarkStore {
    async fn load(&self) -> Result<Vec<BookmarkRecord>, StoreError> {
        Ok(self.records.read().await.clone())
    }

    async fn save(&self, records: &[BookmarkRecord]) -> Result<(), StoreError> {
        *self.records.write().await = records.to_vec();
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.records.write().await.clear();
        Ok(())
    }
}

/// File-backed bookmark store.
///
/// The whole collection lives in one JSON file; saves write a sibling temp
/// file and rename over the original so a crash mid-write cannot leave a
/// half-written collection behind.
pub struct FileBookmarkStore {
    path: PathBuf,
}

impl FileBookmarkStore {
    /// Create a store rooted at `dir`, ensuring the directory exists.
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        let path = dir.join("bookmarks.json");
        debug!("FileBookmarkStore initialized at {:?}", path);
        Ok(Self { path })
    }

    fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

#[async_trait]
impl BookmarkStore for FileBookmarkStore {
    async fn load(&self) -> Result<Vec<BookmarkRecord>, StoreError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, records: &[BookmarkRecord]) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(records)?;
        let tmp = self.tmp_path();
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!("Saved {} bookmark(s) to {:?}", records.len(), self.path);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
