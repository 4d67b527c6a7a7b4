//! Command handlers for the CLI
//!
//! Each handler merges its flags over the loaded configuration, builds the
//! components it needs and reports the outcome on stdout. Fatal errors are
//! returned to `main`.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::app::cache::{CacheConfig, CacheManager, ContentStore, PathGenerator, Stage};
use crate::app::client::TrackClient;
use crate::app::fetcher::HttpTrackFetcher;
use crate::app::hash::CacheKey;
use crate::app::pipeline::{load_routes, write_output, ConverterChain, Pipeline};
use crate::app::portal::{save_perms, PortalHarvester};
use crate::app::source::resolve_url;
use crate::config::AppConfig;
use crate::errors::{ConfigError, Result};

use super::args::{
    CacheAction, CacheArgs, ConfigAction, ConfigArgs, ConvertArgs, GlobalArgs, HarvestArgs,
};
use super::progress::{route_progress_bar, spinner};

/// Cache directory from the command line, else from the configuration
fn cache_config(global: &GlobalArgs, config: &AppConfig) -> CacheConfig {
    match &global.cache_dir {
        Some(dir) => CacheConfig::with_cache_root(dir.clone()),
        None => config.cache_config(),
    }
}

/// Handle the convert command
pub async fn handle_convert(
    global: &GlobalArgs,
    config: &AppConfig,
    args: ConvertArgs,
) -> Result<()> {
    let start_time = Instant::now();
    let input = args.input.unwrap_or_else(|| config.paths.input.clone());
    let output_path = args.output.unwrap_or_else(|| config.paths.output.clone());
    let max_concurrent_fetches = args
        .max_concurrent_fetches
        .or(config.pipeline.max_concurrent_fetches);

    let routes = load_routes(&input).await?;

    let cache = Arc::new(CacheManager::new(cache_config(global, config)).await?);
    let client = Arc::new(TrackClient::with_config(&config.client)?);
    let chain = ConverterChain::new(HttpTrackFetcher::new(client), cache)
        .with_fetch_limit(max_concurrent_fetches);

    let show_progress = config.pipeline.progress_bar && !args.no_progress && !global.quiet;
    let progress = route_progress_bar(routes.len(), show_progress)?;
    let pipeline = Pipeline::new(chain).with_progress(progress);

    let output = pipeline.run(&routes).await?;
    write_output(&output_path, &output.routes).await?;

    if !global.quiet {
        let summary = &output.summary;
        println!(
            "✅ Converted {} of {} routes",
            summary.routes_converted, summary.routes_total
        );
        println!("   Tracks: {}", summary.tracks);
        println!("   Dropped routes: {}", summary.routes_dropped);
        if summary.sources_failed > 0 {
            println!("   Failed sources: {} (see warnings)", summary.sources_failed);
        }
        println!("   Output: {}", output_path.display());
        println!("   Time: {:.1}s", start_time.elapsed().as_secs_f64());
    }
    Ok(())
}

/// Handle the harvest command
pub async fn handle_harvest(
    global: &GlobalArgs,
    config: &AppConfig,
    args: HarvestArgs,
) -> Result<()> {
    let output_path = args.output.unwrap_or_else(|| config.paths.input.clone());
    let client = Arc::new(TrackClient::with_config(&config.client)?);

    let mut harvester = PortalHarvester::new(client);
    if !args.regions.is_empty() {
        harvester = harvester.with_regions(args.regions);
    }
    info!("Harvesting regions {:?}", harvester.regions());

    let progress = if global.quiet {
        None
    } else {
        Some(spinner("Fetching permanents from the portal...")?)
    };
    let perms = harvester.harvest().await;
    if let Some(progress) = progress {
        progress.finish_and_clear();
    }
    let perms = perms?;

    save_perms(&output_path, &perms).await?;

    if !global.quiet {
        println!(
            "✅ Saved {} permanents to {}",
            perms.len(),
            output_path.display()
        );
    }
    Ok(())
}

/// Handle cache management commands
pub async fn handle_cache(global: &GlobalArgs, config: &AppConfig, args: CacheArgs) -> Result<()> {
    match args.action {
        CacheAction::Info => handle_cache_info(global, config).await,
        CacheAction::Key { url } => handle_cache_key(global, config, &url).await,
    }
}

async fn handle_cache_info(global: &GlobalArgs, config: &AppConfig) -> Result<()> {
    let cache = CacheManager::new(cache_config(global, config)).await?;
    let stats = cache.stats().await;

    println!("💾 Cache Information");
    println!("===================");
    println!("Location: {}", cache.cache_root().display());
    for stage in Stage::ALL {
        println!("{:>9} entries: {}", stage.to_string(), stats.count(stage));
    }
    println!("Cache size: {}", stats.format_size());
    Ok(())
}

async fn handle_cache_key(global: &GlobalArgs, config: &AppConfig, url: &str) -> Result<()> {
    let cache = CacheManager::new(cache_config(global, config)).await?;
    let key = CacheKey::from_url(url);

    println!("URL: {}", url);
    match resolve_url(url) {
        Ok(kind) => println!("Source: {}", kind.label()),
        Err(e) => println!("Source: unresolvable ({})", e),
    }
    println!("Key: {}", key);
    for stage in Stage::ALL {
        let marker = if cache.has(&key, stage).await { "✅" } else { "  " };
        println!(
            "{} {}",
            marker,
            PathGenerator::get_file_path(cache.cache_root(), &key, stage).display()
        );
    }
    Ok(())
}

/// Handle configuration management commands
pub async fn handle_config(global: &GlobalArgs, args: ConfigArgs) -> Result<()> {
    match args.action {
        ConfigAction::Init { force } => {
            let path = global
                .config
                .clone()
                .or_else(AppConfig::default_config_path)
                .ok_or(ConfigError::NoConfigDir)?;
            AppConfig::write_default_config(&path, force).await?;

            if !global.quiet {
                println!("📁 Created default configuration file:");
                println!("   {}", path.display());
                println!("   You can customize settings by editing this file.");
            }
            Ok(())
        }
    }
}
