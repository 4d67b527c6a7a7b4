//! Harvesting the permanent route list from the Audax Australia portal
//!
//! Each region's ride list is a JSON object keyed by permanent id. Every id
//! is then fetched individually and the raw records are saved as the route
//! list the converter reads. Any failure aborts the harvest.

use std::path::Path;
use std::sync::Arc;

use futures::future::try_join_all;
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info};

use crate::app::cache::write_file_atomic;
use crate::app::client::{HttpHandler, TrackClient};
use crate::constants::portal;
use crate::errors::{InputError, InputResult, PortalError, PortalResult};

/// Client for the portal's ride list and permanent endpoints
#[derive(Debug)]
pub struct PortalHarvester {
    client: Arc<TrackClient>,
    regions: Vec<u32>,
}

impl PortalHarvester {
    /// Harvester over the default regions
    pub fn new(client: Arc<TrackClient>) -> Self {
        Self {
            client,
            regions: portal::REGIONS.to_vec(),
        }
    }

    pub fn with_regions(mut self, regions: Vec<u32>) -> Self {
        self.regions = regions;
        self
    }

    pub fn regions(&self) -> &[u32] {
        &self.regions
    }

    /// Permanent ids listed for one region
    pub async fn fetch_region_ids(&self, region: u32) -> PortalResult<Vec<u64>> {
        let url = HttpHandler::parse_url(&format!("{}{}", portal::RIDE_LIST_URL, region))?;
        let ride_list: Value = self.client.http().get_json(&url).await?;
        let ids = parse_ride_list(region, &ride_list)?;
        debug!("Region {} lists {} permanents", region, ids.len());
        Ok(ids)
    }

    /// Ids of every region, concatenated in region order
    pub async fn fetch_all_ids(&self) -> PortalResult<Vec<u64>> {
        let per_region = try_join_all(
            self.regions
                .iter()
                .map(|&region| self.fetch_region_ids(region)),
        )
        .await?;
        Ok(per_region.into_iter().flatten().collect())
    }

    /// Raw record of one permanent
    pub async fn fetch_permanent(&self, id: u64) -> PortalResult<Value> {
        let url = HttpHandler::parse_url(&permanent_url(id))?;
        Ok(self.client.http().get_json(&url).await?)
    }

    /// Every permanent of every region, in id list order
    pub async fn harvest(&self) -> PortalResult<Vec<Value>> {
        let ids = self.fetch_all_ids().await?;
        info!(
            "Fetching {} permanents from {} regions",
            ids.len(),
            self.regions.len()
        );
        try_join_all(ids.iter().map(|&id| self.fetch_permanent(id))).await
    }
}

/// Endpoint of a single permanent
pub fn permanent_url(id: u64) -> String {
    format!("{}{}", portal::PERMANENT_URL, id)
}

/// Ids from a ride list object, ascending, without the sentinel
///
/// Keys that are not integers are skipped.
pub fn parse_ride_list(region: u32, ride_list: &Value) -> PortalResult<Vec<u64>> {
    let object = ride_list
        .as_object()
        .ok_or_else(|| PortalError::InvalidRideList {
            region,
            reason: format!("expected an object, got {}", json_type(ride_list)),
        })?;

    let mut ids: Vec<u64> = object
        .keys()
        .filter_map(|key| key.trim().parse::<u64>().ok())
        .filter(|&id| id != portal::SENTINEL_ID)
        .collect();
    ids.sort_unstable();
    Ok(ids)
}

/// Save harvested records as a pretty-printed JSON array
///
/// Record fields keep the order the portal sent them in. The file is
/// replaced atomically, creating its parent directory if needed.
pub async fn save_perms(path: &Path, perms: &[Value]) -> InputResult<()> {
    let content = serde_json::to_string_pretty(perms)?;
    let write_error = |source: std::io::Error| InputError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(write_error)?;
    }
    write_file_atomic(path, content.as_bytes(), u64::from(std::process::id()))
        .await
        .map_err(write_error)?;

    info!("Saved {} permanents to {}", perms.len(), path.display());
    Ok(())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
