//! In-memory content store for tests and dry runs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::app::hash::CacheKey;
use crate::errors::{CacheError, CacheResult};

use super::path::{PathGenerator, Stage};
use super::store::ContentStore;

/// Content store keeping every entry in a map
///
/// Reports the same canonical paths a [`CacheManager`](super::CacheManager)
/// rooted at `root` would, without touching the filesystem.
#[derive(Debug)]
pub struct MemoryStore {
    root: PathBuf,
    entries: RwLock<HashMap<(CacheKey, Stage), Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store reporting paths under `root`
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    fn path(&self, key: &CacheKey, stage: Stage) -> PathBuf {
        PathGenerator::get_file_path(&self.root, key, stage)
    }

    async fn has(&self, key: &CacheKey, stage: Stage) -> bool {
        self.entries.read().await.contains_key(&(*key, stage))
    }

    async fn read(&self, key: &CacheKey, stage: Stage) -> CacheResult<Vec<u8>> {
        self.entries
            .read()
            .await
            .get(&(*key, stage))
            .cloned()
            .ok_or_else(|| CacheError::Missing {
                path: self.path(key, stage),
            })
    }

    async fn write_atomic(
        &self,
        key: &CacheKey,
        stage: Stage,
        content: &[u8],
    ) -> CacheResult<PathBuf> {
        self.entries
            .write()
            .await
            .insert((*key, stage), content.to_vec());
        Ok(self.path(key, stage))
    }
}
