//! Prelude module for the permanents fetcher library
//!
//! Re-exports the items needed for typical usage with a single
//! `use perms_fetcher::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use perms_fetcher::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let cache = Arc::new(CacheManager::new(CacheConfig::default()).await?);
//!     let fetcher = HttpTrackFetcher::new(Arc::new(TrackClient::new()?));
//!     let pipeline = Pipeline::new(ConverterChain::new(fetcher, cache));
//!
//!     let routes = load_routes(Path::new(DEFAULT_INPUT)).await?;
//!     let output = pipeline.run(&routes).await?;
//!     write_output(Path::new(DEFAULT_OUTPUT), &output.routes).await?;
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

pub use crate::app::pipeline::{load_routes, write_output};
pub use crate::app::{
    Attachment, CacheConfig, CacheKey, CacheManager, ClientConfig, ContentStore, ConvertedRoute,
    ConverterChain, HttpTrackFetcher, Pipeline, PortalHarvester, Route, SourceKind, Stage,
    TrackClient, TrackFetcher,
};
pub use crate::config::AppConfig;

// Commonly used constants
pub use crate::constants::{DEFAULT_INPUT, DEFAULT_OUTPUT, USER_AGENT};

pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

pub use tokio;
