//! Content store abstraction
//!
//! The converter chain only talks to a [`ContentStore`]. The disk-backed
//! [`CacheManager`](super::CacheManager) is used for real runs, the
//! [`MemoryStore`](super::MemoryStore) stands in for it in tests.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::app::hash::CacheKey;
use crate::errors::CacheResult;

use super::path::Stage;

/// Keyed, stage-aware byte store
///
/// Implementations must never let a partially written entry be observed by
/// [`has`](ContentStore::has) or [`read`](ContentStore::read).
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Canonical path of an entry, whether or not it exists yet
    fn path(&self, key: &CacheKey, stage: Stage) -> PathBuf;

    /// Whether a complete entry exists
    async fn has(&self, key: &CacheKey, stage: Stage) -> bool;

    /// Read an entry's bytes
    async fn read(&self, key: &CacheKey, stage: Stage) -> CacheResult<Vec<u8>>;

    /// Store an entry so it appears all at once, returning its path
    async fn write_atomic(
        &self,
        key: &CacheKey,
        stage: Stage,
        content: &[u8],
    ) -> CacheResult<PathBuf>;
}
