//! Route conversion pipeline
//!
//! - [`chain`] - cache-checked track, geometry and topology stages
//! - [`aggregator`] - per-route fan-out over attachments
//! - [`driver`] - whole-run fan-out, route list input and aggregate output
//!
//! All work runs as cooperatively scheduled futures on the calling task.
//! Results are collected by position, so output order never depends on
//! which fetch finishes first.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use perms_fetcher::app::cache::{CacheConfig, CacheManager};
//! use perms_fetcher::app::client::TrackClient;
//! use perms_fetcher::app::fetcher::HttpTrackFetcher;
//! use perms_fetcher::app::pipeline::{load_routes, write_output, ConverterChain, Pipeline};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Arc::new(CacheManager::new(CacheConfig::default()).await?);
//! let fetcher = HttpTrackFetcher::new(Arc::new(TrackClient::new()?));
//! let pipeline = Pipeline::new(ConverterChain::new(fetcher, cache));
//!
//! let routes = load_routes(Path::new("perms.json")).await?;
//! let output = pipeline.run(&routes).await?;
//! write_output(Path::new("data/perms.json"), &output.routes).await?;
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod chain;
pub mod driver;

pub use aggregator::{RouteAggregator, RouteOutcome};
pub use chain::ConverterChain;
pub use driver::{load_routes, write_output, Pipeline, PipelineOutput, RunSummary};
