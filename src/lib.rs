//! Permanents Fetcher Library
//!
//! Harvests the Audax Australia permanent route list and converts each
//! route's attached GPX tracks into cached GeoJSON and TopoJSON files, with
//! an aggregate index for the route map front-end.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
