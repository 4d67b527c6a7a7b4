//! Error types for the permanents fetcher
//!
//! Errors are split by component. Per-source errors (resolution, fetching,
//! conversion) are recoverable and contained at the route boundary; cache,
//! input and output errors are fatal for a run.

use std::path::PathBuf;

use thiserror::Error;

/// Attachment classification errors
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Attachment URL could not be parsed
    #[error("Invalid attachment URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    /// BikeRouteToaster link without a recognizable course id
    #[error("No course id found in BikeRouteToaster URL: {url}")]
    MissingCourseId { url: String },
}

/// Track download errors
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// Invalid URL provided
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Server returned an error status other than not-found
    #[error("Server error: HTTP {status} from {url}")]
    ServerError { status: u16, url: String },

    /// Server answered with a body we cannot use
    #[error("Unexpected response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    /// Rate limit configuration was rejected
    #[error("Invalid rate limit: {reason}")]
    InvalidRateLimit { reason: String },
}

/// Track and geometry conversion errors
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Track text is not well-formed XML
    #[error("Malformed track XML")]
    Xml(#[from] quick_xml::Error),

    /// Document parsed but has no gpx root element
    #[error("Document is not a GPX track (root element: {root})")]
    NotGpx { root: String },

    /// Document ended inside an element
    #[error("Track XML ended inside <{element}>")]
    Unclosed { element: String },

    /// Coordinate attribute or elevation is missing or not a number
    #[error("Invalid coordinate {name}={value:?}")]
    InvalidCoordinate { name: String, value: String },

    /// Cached geometry or topology could not be (de)serialized
    #[error("JSON conversion failed")]
    Json(#[from] serde_json::Error),
}

/// Cache store errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Cache directory not found or could not be created
    #[error("Cache directory not accessible: {path}")]
    DirectoryNotAccessible { path: PathBuf },

    /// Reading a cache entry failed
    #[error("Failed to read cache entry {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing or renaming a cache entry failed
    #[error("Atomic write failed for cache entry {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Entry expected to be present is missing
    #[error("Cache entry not found: {path}")]
    Missing { path: PathBuf },
}

/// Failure of a single attachment on its way through the converter chain
#[derive(Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    /// Fatal for the whole run
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Portal harvesting errors
#[derive(Error, Debug)]
pub enum PortalError {
    /// HTTP request error
    #[error("Portal request failed")]
    Http(#[from] FetchError),

    /// Ride list was not a JSON object keyed by permanent id
    #[error("Unexpected ride list for region {region}: {reason}")]
    InvalidRideList { region: u32, reason: String },
}

/// Route list and aggregate file errors
#[derive(Error, Debug)]
pub enum InputError {
    /// Route list could not be read
    #[error("Failed to read route list {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Route list is not a JSON array of routes
    #[error("Malformed route list {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Aggregate output could not be written
    #[error("Failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output could not be serialized
    #[error("Failed to serialize output")]
    Serialize(#[from] serde_json::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Explicitly requested configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Configuration file could not be read
    #[error("Failed to read configuration file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be written
    #[error("Failed to write configuration file {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Refusing to replace an existing configuration file
    #[error("Configuration file already exists: {path} (use --force to overwrite)")]
    AlreadyExists { path: PathBuf },

    /// No per-user configuration directory on this platform
    #[error("No configuration directory available, pass --config")]
    NoConfigDir,

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Portal(#[from] PortalError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// Generic error for other issues
    #[error("{message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic error with a custom message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Fetch(_) => "fetch",
            AppError::Cache(_) => "cache",
            AppError::Portal(_) => "portal",
            AppError::Input(_) => "input",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Resolution result type alias
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

/// Fetch result type alias
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Conversion result type alias
pub type ConvertResult<T> = std::result::Result<T, ConvertError>;

/// Cache result type alias
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Per-source result type alias
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Portal result type alias
pub type PortalResult<T> = std::result::Result<T, PortalError>;

/// Input/output result type alias
pub type InputResult<T> = std::result::Result<T, InputError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
