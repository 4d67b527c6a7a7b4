//! Command-line argument parsing for the permanents fetcher
//!
//! This module defines the CLI structure using clap derive macros. Running
//! the binary without a subcommand converts the route list.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Permanents Fetcher - Convert audax permanent route tracks for the route map
#[derive(Parser, Debug)]
#[command(
    name = "perms-fetcher",
    version,
    about = "Convert audax permanent route tracks to cached GeoJSON and TopoJSON",
    long_about = "Fetches the GPX tracks attached to Audax Australia permanents, converts them to GeoJSON and TopoJSON
in a content-addressed cache, and writes an aggregate index of the converted routes."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand, `convert` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - only report errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Cache directory path
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Convert every route's tracks and write the aggregate file
    Convert(ConvertArgs),

    /// Download the permanent route list from the portal
    Harvest(HarvestArgs),

    /// Inspect the track cache
    Cache(CacheArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Arguments for the convert command
#[derive(Args, Debug, Clone, Default)]
pub struct ConvertArgs {
    /// Route list to read
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Aggregate file to write
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Maximum number of concurrent track downloads (0 = unlimited)
    #[arg(long, value_name = "N")]
    pub max_concurrent_fetches: Option<usize>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments for the harvest command
#[derive(Args, Debug, Clone, Default)]
pub struct HarvestArgs {
    /// Where to save the route list
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Region code to harvest, repeatable (default: all regions)
    #[arg(long = "region", value_name = "CODE")]
    pub regions: Vec<u32>,
}

/// Arguments for cache management
#[derive(Args, Debug, Clone)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache management actions
#[derive(Subcommand, Debug, Clone)]
pub enum CacheAction {
    /// Show cache statistics and information
    Info,

    /// Show the cache key and entry paths of an attachment URL
    Key {
        /// Attachment URL as written in the route list
        url: String,
    },
}

/// Arguments for configuration management
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration management actions
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Write a commented default configuration file
    ///
    /// Written to `--config` when given, else to the per-user location.
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The subcommand to run, defaulting to `convert`
    pub fn command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Convert(ConvertArgs::default()))
    }

    /// Get the logging level based on global arguments
    ///
    /// `None` when no flag was given and the configured level applies.
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }
}
