//! HTTP client configuration and building logic

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::constants::http;
use crate::errors::{FetchError, FetchResult};

/// Configuration for the HTTP client shared by all upstream services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Connect timeout
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// User agent sent with every request
    pub user_agent: String,
    /// Maximum idle connections kept per host
    pub pool_max_per_host: usize,
    /// Requests per second across all hosts (None = unlimited)
    pub rate_limit_rps: Option<u32>,
    /// Honour `HTTP_PROXY`/`HTTPS_PROXY`/`NO_PROXY` from the environment
    pub use_system_proxy: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            user_agent: http::USER_AGENT.to_string(),
            pool_max_per_host: http::POOL_MAX_PER_HOST,
            rate_limit_rps: None,
            use_system_proxy: true,
        }
    }
}

impl ClientConfig {
    /// Builds the HTTP client with the specified configuration
    pub fn build_http_client(&self) -> FetchResult<Client> {
        let mut builder = Client::builder()
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.as_str())
            .pool_max_idle_per_host(self.pool_max_per_host);
        if !self.use_system_proxy {
            builder = builder.no_proxy();
        }
        builder.build().map_err(FetchError::Http)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.request_timeout, http::DEFAULT_TIMEOUT);
        assert_eq!(config.rate_limit_rps, None);
        assert!(config.user_agent.starts_with("perms-fetcher/"));
        assert!(config.use_system_proxy);
    }

    #[test]
    fn test_http_client_creation() {
        let config = ClientConfig {
            request_timeout: Duration::from_secs(5),
            ..Default::default()
        };
        assert!(config.build_http_client().is_ok());

        let direct = ClientConfig {
            use_system_proxy: false,
            ..Default::default()
        };
        assert!(direct.build_http_client().is_ok());
    }

    #[test]
    fn test_durations_serialize_human_readable() {
        let config = ClientConfig::default();
        let toml_text = toml::to_string(&config).unwrap();
        assert!(toml_text.contains("request_timeout = \"1m\""));
        let back: ClientConfig = toml::from_str(&toml_text).unwrap();
        assert_eq!(back, config);
    }
}
