//! Cache-checked converter stages
//!
//! Each stage looks for its own product in the store first and only falls
//! back to the previous stage on a miss. A fully cached source therefore costs
//! one existence check and no network traffic.
//!
//! The check-then-write sequence is not atomic across processes: two runs
//! sharing a cache directory may both compute an entry. Whichever rename lands
//! last wins, and both contents are equivalent.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::app::cache::{ContentStore, Stage};
use crate::app::convert::{to_geojson, topology, FeatureCollection};
use crate::app::fetcher::TrackFetcher;
use crate::app::hash::CacheKey;
use crate::app::source::SourceKind;
use crate::errors::{ConvertError, SourceResult};

/// Track, geometry and topology stages over one store and one fetcher
#[derive(Debug)]
pub struct ConverterChain<F, S> {
    fetcher: F,
    store: Arc<S>,
    fetch_limit: Option<Arc<Semaphore>>,
}

impl<F, S> ConverterChain<F, S>
where
    F: TrackFetcher,
    S: ContentStore,
{
    /// Create a chain without a limit on concurrent fetches
    pub fn new(fetcher: F, store: Arc<S>) -> Self {
        Self {
            fetcher,
            store,
            fetch_limit: None,
        }
    }

    /// Cap the number of fetches in flight, `None` or zero for no cap
    pub fn with_fetch_limit(mut self, max_concurrent_fetches: Option<usize>) -> Self {
        self.fetch_limit = max_concurrent_fetches
            .filter(|&max| max > 0)
            .map(|max| Arc::new(Semaphore::new(max)));
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Path of the source's topology, producing it if needed
    ///
    /// `Ok(None)` when the source has no track.
    pub async fn topology(&self, key: &CacheKey, source: &SourceKind) -> SourceResult<Option<PathBuf>> {
        if self.store.has(key, Stage::Topology).await {
            debug!("Cache hit: {} topology", key);
            return Ok(Some(self.store.path(key, Stage::Topology)));
        }

        let Some(collection) = self.geometry(key, source).await? else {
            return Ok(None);
        };

        let topology = topology(&collection);
        let content = serde_json::to_vec(&topology).map_err(ConvertError::from)?;
        let path = self
            .store
            .write_atomic(key, Stage::Topology, &content)
            .await?;
        debug!("Wrote topology {}", path.display());
        Ok(Some(path))
    }

    /// GeoJSON for the source, from the store or converted from its track
    pub async fn geometry(
        &self,
        key: &CacheKey,
        source: &SourceKind,
    ) -> SourceResult<Option<FeatureCollection>> {
        if self.store.has(key, Stage::Geometry).await {
            debug!("Cache hit: {} geometry", key);
            let content = self.store.read(key, Stage::Geometry).await?;
            let collection = serde_json::from_slice(&content).map_err(ConvertError::from)?;
            return Ok(Some(collection));
        }

        let Some((_, collection)) = self.converted_track(key, source).await? else {
            return Ok(None);
        };

        let content = serde_json::to_vec(&collection).map_err(ConvertError::from)?;
        self.store
            .write_atomic(key, Stage::Geometry, &content)
            .await?;
        Ok(Some(collection))
    }

    /// Raw GPX for the source, from the store or fetched upstream
    ///
    /// Only text that converts cleanly is cached. Absent tracks are not
    /// cached either, so a route that reappears upstream is picked up on a
    /// later run.
    pub async fn track(&self, key: &CacheKey, source: &SourceKind) -> SourceResult<Option<String>> {
        Ok(self
            .converted_track(key, source)
            .await?
            .map(|(track, _)| track))
    }

    /// Track text together with its conversion
    ///
    /// A cached track that no longer converts is treated as a miss and
    /// fetched again.
    async fn converted_track(
        &self,
        key: &CacheKey,
        source: &SourceKind,
    ) -> SourceResult<Option<(String, FeatureCollection)>> {
        if self.store.has(key, Stage::Track).await {
            debug!("Cache hit: {} track", key);
            let content = self.store.read(key, Stage::Track).await?;
            let track = String::from_utf8_lossy(&content).into_owned();
            match to_geojson(&track) {
                Ok(collection) => return Ok(Some((track, collection))),
                Err(e) => warn!("Cached track {} is unusable, fetching again: {}", key, e),
            }
        }

        let track = {
            let _permit = match &self.fetch_limit {
                Some(limit) => limit.acquire().await.ok(),
                None => None,
            };
            self.fetcher.fetch(source).await?
        };
        let Some(track) = track else {
            return Ok(None);
        };

        let collection = to_geojson(&track)?;
        self.store
            .write_atomic(key, Stage::Track, track.as_bytes())
            .await?;
        info!("Fetched {} track {}", source.label(), key);
        Ok(Some((track, collection)))
    }
}
