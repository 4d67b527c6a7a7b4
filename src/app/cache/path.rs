//! Stage-aware cache file naming
//!
//! Every entry lives directly under the cache root as
//! `<key hex>.<stage extension>`. The presence of that file is the cache hit.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::app::hash::CacheKey;
use crate::constants::{cache, files};

/// Product of one step of the converter chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// Raw GPX track text
    Track,
    /// GeoJSON feature collection
    Geometry,
    /// TopoJSON topology
    Topology,
}

impl Stage {
    /// All stages in pipeline order
    pub const ALL: [Stage; 3] = [Stage::Track, Stage::Geometry, Stage::Topology];

    /// File extension of this stage's cache entries
    pub fn extension(self) -> &'static str {
        match self {
            Stage::Track => cache::TRACK_EXTENSION,
            Stage::Geometry => cache::GEOMETRY_EXTENSION,
            Stage::Topology => cache::TOPOLOGY_EXTENSION,
        }
    }

    /// Stage owning a file extension
    pub fn from_extension(extension: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.extension() == extension)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Track => "track",
            Stage::Geometry => "geometry",
            Stage::Topology => "topology",
        };
        f.write_str(name)
    }
}

/// Path generation utility for cache files
pub struct PathGenerator;

impl PathGenerator {
    /// File name of an entry, `<hex>.<ext>`
    pub fn file_name(key: &CacheKey, stage: Stage) -> String {
        format!("{}.{}", key.to_hex(), stage.extension())
    }

    /// Canonical path of an entry under `cache_root`
    pub fn get_file_path(cache_root: &Path, key: &CacheKey, stage: Stage) -> PathBuf {
        cache_root.join(Self::file_name(key, stage))
    }

    /// Temporary sibling used while writing an entry
    ///
    /// `nonce` keeps two in-flight writes of the same entry apart.
    pub fn get_temp_path(final_path: &Path, nonce: u64) -> PathBuf {
        let mut name = final_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}{}", nonce, files::TEMP_FILE_SUFFIX));
        final_path.with_file_name(name)
    }

    /// Split a cache file name back into key and stage
    ///
    /// Returns `None` for anything that is not a finished cache entry,
    /// including temporary files.
    pub fn parse_file_name(file_name: &str) -> Option<(CacheKey, Stage)> {
        let (stem, extension) = file_name.split_once('.')?;
        let stage = Stage::from_extension(extension)?;
        let key = CacheKey::from_hex(stem).ok()?;
        Some((key, stage))
    }
}
