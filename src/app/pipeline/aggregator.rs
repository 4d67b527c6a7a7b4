//! Per-route fan-out over attachments
//!
//! Every resolvable attachment of a route runs through the converter chain
//! concurrently. Topology paths are collected in attachment order regardless
//! of completion order. A source that fails is logged and left out; a route
//! left with no topology at all is dropped.

use std::path::PathBuf;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::app::cache::ContentStore;
use crate::app::fetcher::TrackFetcher;
use crate::app::hash::CacheKey;
use crate::app::models::{ConvertedRoute, Route};
use crate::app::source::{resolve, ResolvedSource, SourceKind};
use crate::errors::{CacheError, SourceError, SourceResult};

use super::chain::ConverterChain;

/// Outcome of converting one route
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouteOutcome {
    /// Summary for the aggregate, `None` when the route is dropped
    pub converted: Option<ConvertedRoute>,
    /// Sources that failed to resolve, fetch or convert
    pub failed_sources: usize,
    /// Sources whose track is gone upstream
    pub absent_sources: usize,
}

/// Converts routes into aggregate entries
#[derive(Debug)]
pub struct RouteAggregator<F, S> {
    chain: ConverterChain<F, S>,
}

impl<F, S> RouteAggregator<F, S>
where
    F: TrackFetcher,
    S: ContentStore,
{
    pub fn new(chain: ConverterChain<F, S>) -> Self {
        Self { chain }
    }

    pub fn chain(&self) -> &ConverterChain<F, S> {
        &self.chain
    }

    /// Convert every resolvable attachment of a route
    ///
    /// # Errors
    ///
    /// Only cache failures are returned; they abort the whole run. Every
    /// other per-source failure is logged and counted.
    pub async fn convert_route(&self, route: &Route) -> Result<RouteOutcome, CacheError> {
        let mut outcome = RouteOutcome::default();
        let sources = self.resolve_sources(route, &mut outcome);

        let results = join_all(sources.iter().map(|source| self.convert_source(source))).await;

        let mut topology_paths = Vec::with_capacity(results.len());
        for (source, result) in sources.iter().zip(results) {
            match result {
                Ok(Some(path)) => topology_paths.push(path),
                Ok(None) => {
                    info!(
                        "Track not found for {}: {}",
                        route.name, source.original_url
                    );
                    outcome.absent_sources += 1;
                }
                Err(SourceError::Cache(e)) => return Err(e),
                Err(e) => {
                    warn!(
                        "Dropping {} for {}: {}",
                        source.original_url, route.name, e
                    );
                    outcome.failed_sources += 1;
                }
            }
        }

        if topology_paths.is_empty() {
            let attachments: Vec<_> = route.attachments.iter().map(|a| &a.url).collect();
            warn!("No track links found for {}: {:?}", route.name, attachments);
            return Ok(outcome);
        }

        outcome.converted = Some(ConvertedRoute::from_route(route, topology_paths));
        Ok(outcome)
    }

    /// Resolvable sources of a route, in attachment order
    fn resolve_sources(&self, route: &Route, outcome: &mut RouteOutcome) -> Vec<ResolvedSource> {
        let mut sources = Vec::new();
        for attachment in &route.attachments {
            match resolve(attachment) {
                Ok(SourceKind::Unknown { host }) => {
                    warn!(
                        "Unknown track host {} in {}",
                        host.as_deref().unwrap_or("<none>"),
                        route.name
                    );
                }
                Ok(SourceKind::Ignored) => {
                    debug!("Ignoring attachment {:?} of {}", attachment.url, route.name);
                }
                Ok(kind) => sources.push(ResolvedSource {
                    original_url: attachment.url_str().unwrap_or_default().to_string(),
                    kind,
                }),
                Err(e) => {
                    warn!("Cannot resolve attachment of {}: {}", route.name, e);
                    outcome.failed_sources += 1;
                }
            }
        }
        sources
    }

    async fn convert_source(&self, source: &ResolvedSource) -> SourceResult<Option<PathBuf>> {
        let key = CacheKey::from_url(&source.original_url);
        self.chain.topology(&key, &source.kind).await
    }
}
