//! Command-line interface components
//!
//! This module contains CLI-specific code for the permanents fetcher,
//! including argument parsing, command handlers and progress display.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{
    CacheAction, CacheArgs, Cli, Commands, ConfigAction, ConfigArgs, ConvertArgs, GlobalArgs,
    HarvestArgs,
};
pub use commands::{handle_cache, handle_config, handle_convert, handle_harvest};
pub use progress::{route_progress_bar, spinner};
