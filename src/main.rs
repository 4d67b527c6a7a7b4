//! Permanents Fetcher CLI application
//!
//! Command-line interface for harvesting audax permanents and converting
//! their tracks for the route map.

use std::error::Error;
use std::process;

use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

// Import CLI modules through the library (module is public but not re-exported)
use perms_fetcher::cli::{
    handle_cache, handle_config, handle_convert, handle_harvest, Cli, Commands,
};
use perms_fetcher::config::AppConfig;
use perms_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        debug!("Fatal {} error", e.category());
        eprintln!("Error: {}", e);
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let command = cli.command();

    // `config init` may be creating the file `--config` names
    let config = match command {
        Commands::Config(_) => Ok(AppConfig::default()),
        _ => AppConfig::load(cli.global.config.clone()).await,
    };
    let level = match &config {
        Ok(config) => config.logging.level.clone(),
        Err(_) => perms_fetcher::constants::logging::DEFAULT_LOG_LEVEL.to_string(),
    };
    init_logging(&cli, &level);
    let config = config?;

    info!("Permanents Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    match command {
        Commands::Convert(args) => {
            info!("Executing convert command");
            handle_convert(&cli.global, &config, args).await
        }
        Commands::Harvest(args) => {
            info!("Executing harvest command");
            handle_harvest(&cli.global, &config, args).await
        }
        Commands::Cache(args) => {
            info!("Executing cache command");
            handle_cache(&cli.global, &config, args).await
        }
        Commands::Config(args) => {
            info!("Executing config command");
            handle_config(&cli.global, args).await
        }
    }
}

/// Initialize logging from the CLI flags, else the configured level
///
/// `RUST_LOG` takes precedence over both.
fn init_logging(cli: &Cli, configured_level: &str) {
    let level = cli
        .log_level()
        .map(|level| level.to_string().to_lowercase())
        .unwrap_or_else(|| configured_level.to_lowercase());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .with_writer(std::io::stderr)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
