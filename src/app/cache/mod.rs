//! Content-addressed cache of pipeline stage products
//!
//! Each source URL maps to a [`CacheKey`](crate::app::CacheKey) and each
//! converter stage to a file extension. An entry exists exactly when its file
//! exists under the canonical name; there is no separate index.
//!
//! # Module Organization
//!
//! - [`config`] - Configuration types and defaults
//! - [`path`] - Stage definitions and file naming
//! - [`store`] - The [`ContentStore`] trait
//! - [`manager`] - Disk-backed store with atomic writes
//! - [`memory`] - In-memory store
//! - [`stats`] - Entry counts per stage
//!
//! # Examples
//!
//! ```rust,no_run
//! use perms_fetcher::app::cache::{CacheConfig, CacheManager, ContentStore, Stage};
//! use perms_fetcher::app::CacheKey;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = CacheManager::new(CacheConfig::default()).await?;
//! let key = CacheKey::from_url("https://ridewithgps.com/routes/12345");
//!
//! if !cache.has(&key, Stage::Track).await {
//!     let path = cache.write_atomic(&key, Stage::Track, b"<gpx/>").await?;
//!     println!("cached {}", path.display());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod manager;
pub mod memory;
pub mod path;
pub mod stats;
pub mod store;

pub use config::CacheConfig;
pub use manager::{write_file_atomic, CacheManager};
pub use memory::MemoryStore;
pub use path::{PathGenerator, Stage};
pub use stats::CacheStats;
pub use store::ContentStore;
