//! Whole-run driver: route list in, aggregate file out

use std::fmt;
use std::path::Path;

use futures::future::join_all;
use indicatif::ProgressBar;
use serde_json::Value;
use tokio::fs;
use tracing::{info, warn};

use crate::app::cache::{write_file_atomic, ContentStore};
use crate::app::fetcher::TrackFetcher;
use crate::app::models::{ConvertedRoute, Route};
use crate::errors::{CacheError, InputError, InputResult};

use super::aggregator::RouteAggregator;
use super::chain::ConverterChain;

/// Counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub routes_total: usize,
    pub routes_converted: usize,
    pub routes_dropped: usize,
    pub tracks: usize,
    pub sources_failed: usize,
    pub sources_absent: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} routes converted ({} dropped), {} tracks, {} sources failed, {} absent",
            self.routes_converted,
            self.routes_total,
            self.routes_dropped,
            self.tracks,
            self.sources_failed,
            self.sources_absent
        )
    }
}

/// Aggregate produced by a run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// Converted routes in input order
    pub routes: Vec<ConvertedRoute>,
    pub summary: RunSummary,
}

/// Runs the aggregator over a whole route list
#[derive(Debug)]
pub struct Pipeline<F, S> {
    aggregator: RouteAggregator<F, S>,
    progress: Option<ProgressBar>,
}

impl<F, S> Pipeline<F, S>
where
    F: TrackFetcher,
    S: ContentStore,
{
    pub fn new(chain: ConverterChain<F, S>) -> Self {
        Self {
            aggregator: RouteAggregator::new(chain),
            progress: None,
        }
    }

    /// Tick a progress bar once per finished route
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn aggregator(&self) -> &RouteAggregator<F, S> {
        &self.aggregator
    }

    /// Convert every route concurrently
    ///
    /// Output order matches input order. A cache failure on any route fails
    /// the run once all routes have settled, and no output is produced.
    pub async fn run(&self, routes: &[Route]) -> Result<PipelineOutput, CacheError> {
        info!("Converting {} routes", routes.len());
        if let Some(progress) = &self.progress {
            progress.set_length(routes.len() as u64);
        }

        let outcomes = join_all(routes.iter().map(|route| async move {
            let outcome = self.aggregator.convert_route(route).await;
            if let Some(progress) = &self.progress {
                progress.inc(1);
            }
            outcome
        }))
        .await;

        let mut summary = RunSummary {
            routes_total: routes.len(),
            ..RunSummary::default()
        };
        let mut converted = Vec::new();
        for outcome in outcomes {
            let outcome = outcome?;
            summary.sources_failed += outcome.failed_sources;
            summary.sources_absent += outcome.absent_sources;
            match outcome.converted {
                Some(route) => {
                    summary.tracks += route.topology_paths.len();
                    converted.push(route);
                }
                None => summary.routes_dropped += 1,
            }
        }
        summary.routes_converted = converted.len();

        if let Some(progress) = &self.progress {
            progress.finish_and_clear();
        }
        info!("Run complete: {}", summary);

        Ok(PipelineOutput {
            routes: converted,
            summary,
        })
    }
}

/// Read the route list
///
/// # Errors
///
/// A missing file or anything other than a JSON array is fatal. Entries of
/// the array that are not route records are logged and skipped.
pub async fn load_routes(path: &Path) -> InputResult<Vec<Route>> {
    let content = fs::read(path).await.map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let entries: Vec<Value> =
        serde_json::from_slice(&content).map_err(|source| InputError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut routes = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<Route>(entry) {
            Ok(route) => routes.push(route),
            Err(e) => warn!("Skipping route list entry {}: {}", index, e),
        }
    }
    info!("Loaded {} routes from {}", routes.len(), path.display());
    Ok(routes)
}

/// Replace the aggregate file with compact JSON
///
/// Written to a temporary sibling first and renamed into place, creating the
/// parent directory if needed.
pub async fn write_output(path: &Path, routes: &[ConvertedRoute]) -> InputResult<()> {
    let content = serde_json::to_vec(routes)?;
    let write_error = |source: std::io::Error| InputError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(write_error)?;
    }

    write_file_atomic(path, &content, u64::from(std::process::id()))
        .await
        .map_err(write_error)?;

    info!("Wrote {} routes to {}", routes.len(), path.display());
    Ok(())
}
