//! Disk-backed content store with atomic writes
//!
//! Entries are written to a uniquely named temporary sibling and renamed into
//! place, so a crash mid-write never leaves a truncated file under a
//! canonical name. There is no locking: two processes sharing a cache
//! directory may both compute the same entry, and the last rename wins.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, error, info};

use crate::app::hash::CacheKey;
use crate::errors::{CacheError, CacheResult};

use super::config::CacheConfig;
use super::path::{PathGenerator, Stage};
use super::stats::{CacheStats, DirectoryScanner};
use super::store::ContentStore;

/// Main cache management system
#[derive(Debug)]
pub struct CacheManager {
    /// Configuration
    config: CacheConfig,
    /// Counter distinguishing concurrent temporary files
    temp_counter: AtomicU64,
}

impl CacheManager {
    /// Create a new cache manager, creating the cache directory if needed
    ///
    /// # Errors
    ///
    /// Returns `CacheError::DirectoryNotAccessible` if the directory cannot be
    /// created. This is fatal for a run.
    pub async fn new(config: CacheConfig) -> CacheResult<Self> {
        Self::ensure_directory_exists(&config.cache_root).await?;

        info!(
            "Initialized cache manager with root: {}",
            config.cache_root.display()
        );

        Ok(Self {
            config,
            temp_counter: AtomicU64::new(0),
        })
    }

    /// Get the cache root directory
    pub fn cache_root(&self) -> &Path {
        &self.config.cache_root
    }

    /// Get the cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Ensure a directory exists, creating it if necessary
    async fn ensure_directory_exists(path: &Path) -> CacheResult<()> {
        fs::create_dir_all(path).await.map_err(|e| {
            error!("Failed to create cache directory {}: {}", path.display(), e);
            CacheError::DirectoryNotAccessible {
                path: path.to_path_buf(),
            }
        })?;
        Ok(())
    }

    /// Count cached entries per stage
    pub async fn stats(&self) -> CacheStats {
        DirectoryScanner::scan_cache_directory(self.cache_root()).await
    }
}

/// Write `content` to a temporary sibling of `path` and rename it into place
///
/// `nonce` must differ between concurrent writes of the same path. The
/// temporary file is removed when either step fails.
pub async fn write_file_atomic(path: &Path, content: &[u8], nonce: u64) -> std::io::Result<()> {
    let temp_path = PathGenerator::get_temp_path(path, nonce);

    if let Err(e) = fs::write(&temp_path, content).await {
        error!("Failed to write temporary file {}: {}", temp_path.display(), e);
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp_path, path).await {
        error!("Failed to rename temporary file {}: {}", temp_path.display(), e);
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }
    Ok(())
}

#[async_trait]
impl ContentStore for CacheManager {
    fn path(&self, key: &CacheKey, stage: Stage) -> PathBuf {
        PathGenerator::get_file_path(self.cache_root(), key, stage)
    }

    async fn has(&self, key: &CacheKey, stage: Stage) -> bool {
        fs::try_exists(self.path(key, stage)).await.unwrap_or(false)
    }

    async fn read(&self, key: &CacheKey, stage: Stage) -> CacheResult<Vec<u8>> {
        let path = self.path(key, stage);
        fs::read(&path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                CacheError::Missing { path }
            } else {
                CacheError::Read { path, source }
            }
        })
    }

    async fn write_atomic(
        &self,
        key: &CacheKey,
        stage: Stage,
        content: &[u8],
    ) -> CacheResult<PathBuf> {
        let final_path = self.path(key, stage);
        let nonce = self.temp_counter.fetch_add(1, Ordering::Relaxed);

        write_file_atomic(&final_path, content, nonce)
            .await
            .map_err(|source| CacheError::Write {
                path: final_path.clone(),
                source,
            })?;

        debug!("Cached {} entry: {}", stage, final_path.display());
        Ok(final_path)
    }
}
