//! HTTP client for the portal and the track hosting services
//!
//! - `config`: client configuration and building
//! - `http`: single-attempt request helpers with optional rate limiting

pub mod config;
pub mod http;

pub use config::ClientConfig;
pub use http::HttpHandler;

use crate::errors::FetchResult;

/// Shared HTTP client used by the track fetcher and the portal harvester
#[derive(Debug)]
pub struct TrackClient {
    http_handler: HttpHandler,
}

impl TrackClient {
    /// Creates a client with default configuration
    pub fn new() -> FetchResult<Self> {
        Self::with_config(&ClientConfig::default())
    }

    /// Creates a client with custom configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if the HTTP client cannot be built or the rate
    /// limit is invalid
    pub fn with_config(config: &ClientConfig) -> FetchResult<Self> {
        let client = config.build_http_client()?;
        let http_handler = HttpHandler::new(client, config.rate_limit_rps)?;
        tracing::debug!("Created HTTP client ({})", config.user_agent);
        Ok(Self { http_handler })
    }

    /// Request helpers
    pub fn http(&self) -> &HttpHandler {
        &self.http_handler
    }
}
