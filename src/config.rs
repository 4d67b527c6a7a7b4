//! Configuration management for the permanents fetcher
//!
//! Every setting has a default reproducing the zero-configuration behaviour:
//! read `perms.json`, cache under `data/`, write `data/perms.json`. A TOML
//! file can override any of them, and command-line flags override the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{CacheConfig, ClientConfig};
use crate::constants::{cache, files, logging};
use crate::errors::{ConfigError, ConfigResult};

/// Log levels accepted in the `[logging]` section
const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Input, output and cache locations
    pub paths: PathsConfig,
    /// HTTP client settings
    pub client: ClientConfig,
    /// Conversion pipeline settings
    pub pipeline: PipelineConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// File locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Route list read by `convert` and written by `harvest`
    pub input: PathBuf,
    /// Aggregate file written by `convert`
    pub output: PathBuf,
    /// Directory of cached tracks, geometries and topologies
    pub cache_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(files::DEFAULT_INPUT),
            output: PathBuf::from(files::DEFAULT_OUTPUT),
            cache_dir: PathBuf::from(cache::DEFAULT_CACHE_DIR),
        }
    }
}

/// Conversion pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Upper bound on concurrent track downloads (None = unbounded)
    pub max_concurrent_fetches: Option<usize>,
    /// Show a progress bar while converting
    pub progress_bar: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: None,
            progress_bar: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level used when neither `-q`, `-v` nor `RUST_LOG` says otherwise
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration
    ///
    /// An explicitly named file must exist. Without one, the first file found
    /// among the standard locations is used, and defaults apply when there
    /// is none.
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path });
                }
                Some(path)
            }
            None => Self::find_config_file(),
        };

        let config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Find a configuration file in the standard locations
    pub fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(files::CONFIG_FILE_NAME)];
        if let Some(user_config) = Self::default_config_path() {
            search_paths.push(user_config);
        }

        search_paths.into_iter().find(|path| {
            let found = path.exists();
            if found {
                debug!("Found config file: {}", path.display());
            }
            found
        })
    }

    /// Per-user configuration file path, if the platform has a config directory
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(files::APP_DIR_NAME).join("config.toml"))
    }

    /// Load configuration from a TOML file
    pub async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let config: AppConfig = toml::from_str(&content)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Reject values that would only fail later, mid-run
    pub fn validate(&self) -> ConfigResult<()> {
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                value: self.logging.level.clone(),
                reason: format!("Expected one of {}", LOG_LEVELS.join(", ")),
            });
        }

        if self.client.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "client.request_timeout".to_string(),
                value: "0s".to_string(),
                reason: "Timeout must be greater than zero".to_string(),
            });
        }

        if self.client.rate_limit_rps == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "client.rate_limit_rps".to_string(),
                value: "0".to_string(),
                reason: "Omit the setting to disable rate limiting".to_string(),
            });
        }

        Ok(())
    }

    /// Cache configuration for the configured cache directory
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::with_cache_root(self.paths.cache_dir.clone())
    }

    /// Write the commented default configuration to `path`
    ///
    /// Creates the parent directory. An existing file is only replaced when
    /// `force` is set.
    pub async fn write_default_config(path: &Path, force: bool) -> ConfigResult<()> {
        if path.exists() && !force {
            return Err(ConfigError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }

        let write_error = |source: std::io::Error| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(write_error)?;
        }
        tokio::fs::write(path, Self::default_config_content())
            .await
            .map_err(write_error)?;

        info!("Wrote default configuration to {}", path.display());
        Ok(())
    }

    /// Commented default configuration, suitable as a starting point
    pub fn default_config_content() -> String {
        format!(
            r#"# Permanents fetcher configuration
# Every setting is optional; the values below are the defaults.

[paths]
# Route list read by `convert` and written by `harvest`
input = "{input}"
# Aggregate file written by `convert`
output = "{output}"
# Cached tracks, geometries and topologies
cache_dir = "{cache_dir}"

[client]
request_timeout = "1m"
connect_timeout = "30s"
pool_max_per_host = 25
# Requests per second across all hosts, unlimited when omitted
# rate_limit_rps = 5
# Set to false to ignore HTTP_PROXY/HTTPS_PROXY from the environment
use_system_proxy = true

[pipeline]
# Concurrent track downloads, unlimited when omitted
# max_concurrent_fetches = 16
progress_bar = true

[logging]
level = "{level}"  # error, warn, info, debug, trace
"#,
            input = files::DEFAULT_INPUT,
            output = files::DEFAULT_OUTPUT,
            cache_dir = cache::DEFAULT_CACHE_DIR,
            level = logging::DEFAULT_LOG_LEVEL,
        )
    }
}
