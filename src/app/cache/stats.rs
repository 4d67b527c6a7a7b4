//! Cache statistics
//!
//! Counts finished entries per stage by scanning the flat cache directory.
//! Temporary files and unrelated files (such as the aggregate output) are
//! not counted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::warn;

use super::path::{PathGenerator, Stage};

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Cache root directory
    pub cache_root: PathBuf,
    /// Entries per stage
    pub entries: BTreeMap<Stage, usize>,
    /// Total size of cached entries in bytes
    pub total_size: u64,
}

impl CacheStats {
    /// Create empty statistics for a cache root
    pub fn new(cache_root: PathBuf) -> Self {
        Self {
            cache_root,
            entries: BTreeMap::new(),
            total_size: 0,
        }
    }

    /// Number of entries for one stage
    pub fn count(&self, stage: Stage) -> usize {
        self.entries.get(&stage).copied().unwrap_or(0)
    }

    /// Number of entries across all stages
    pub fn total_entries(&self) -> usize {
        self.entries.values().sum()
    }

    /// Format cache size in human-readable format
    pub fn format_size(&self) -> String {
        format_bytes(self.total_size)
    }
}

/// Directory scanner for cache statistics
pub struct DirectoryScanner;

impl DirectoryScanner {
    /// Scan the cache directory without blocking the async runtime
    pub async fn scan_cache_directory(cache_root: &Path) -> CacheStats {
        let cache_root = cache_root.to_path_buf();
        let fallback = CacheStats::new(cache_root.clone());

        tokio::task::spawn_blocking(move || Self::scan_directory(&cache_root))
            .await
            .unwrap_or_else(|e| {
                warn!("Failed to scan cache directory: {}", e);
                fallback
            })
    }

    fn scan_directory(cache_root: &Path) -> CacheStats {
        let mut stats = CacheStats::new(cache_root.to_path_buf());

        let Ok(entries) = std::fs::read_dir(cache_root) else {
            return stats;
        };

        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some((_, stage)) = name.to_str().and_then(PathGenerator::parse_file_name) else {
                continue;
            };
            *stats.entries.entry(stage).or_default() += 1;
            if let Ok(metadata) = entry.metadata() {
                stats.total_size += metadata.len();
            }
        }

        stats
    }
}

/// Format bytes in human-readable format
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: u64 = 1024;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD as f64 && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD as f64;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
    }

    #[tokio::test]
    async fn test_scan_ignores_foreign_files() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("perms.json"), b"[]").unwrap();
        std::fs::write(temp_dir.path().join("notes.gpx"), b"x").unwrap();

        let stats = DirectoryScanner::scan_cache_directory(temp_dir.path()).await;
        assert_eq!(stats.total_entries(), 0);
        assert_eq!(stats.total_size, 0);
    }

    #[tokio::test]
    async fn test_scan_missing_directory() {
        let stats = DirectoryScanner::scan_cache_directory(Path::new("/nonexistent/cache")).await;
        assert_eq!(stats.total_entries(), 0);
    }
}
