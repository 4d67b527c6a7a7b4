//! Classification of attachment links into track sources
//!
//! Resolution is a pure function of the attachment URL: no network access,
//! no logging. The caller decides what to report for unknown hosts.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::app::models::Attachment;
use crate::constants::{bikeroutetoaster, ignored, portal, ridewithgps};
use crate::errors::{ResolveError, ResolveResult};

/// Where an attachment's track can be obtained, if anywhere
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// RideWithGPS route with its GPX export URL
    RideWithGpsRoute { fetch_url: String },
    /// BikeRouteToaster course
    BikeRouteToaster { course_id: u64 },
    /// Link that is known not to carry a track
    Ignored,
    /// Link to a host we have no fetcher for
    Unknown { host: Option<String> },
}

impl SourceKind {
    /// Whether a fetcher exists for this source
    pub fn is_resolvable(&self) -> bool {
        matches!(
            self,
            SourceKind::RideWithGpsRoute { .. } | SourceKind::BikeRouteToaster { .. }
        )
    }

    /// Short label for log lines
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::RideWithGpsRoute { .. } => "ridewithgps",
            SourceKind::BikeRouteToaster { .. } => "bikeroutetoaster",
            SourceKind::Ignored => "ignored",
            SourceKind::Unknown { .. } => "unknown",
        }
    }
}

/// A resolvable attachment paired with the URL it was found under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    /// URL as written in the attachment, the basis of the cache key
    pub original_url: String,
    pub kind: SourceKind,
}

/// Classify one attachment
///
/// First match wins:
/// 1. non-string or missing URL is ignored
/// 2. RideWithGPS `/routes...` pages resolve to their GPX export
/// 3. BikeRouteToaster links resolve to a course id
/// 4. portal and search engine links are ignored
/// 5. anything else is unknown
pub fn resolve(attachment: &Attachment) -> ResolveResult<SourceKind> {
    match attachment.url_str() {
        Some(url) => resolve_url(url),
        None => Ok(SourceKind::Ignored),
    }
}

/// Classify a URL string
pub fn resolve_url(raw: &str) -> ResolveResult<SourceKind> {
    let parsed = Url::parse(raw).map_err(|e| ResolveError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    let host = match parsed.host_str() {
        Some(host) => host.to_ascii_lowercase(),
        None => return Ok(SourceKind::Unknown { host: None }),
    };

    if ridewithgps::HOSTS.contains(&host.as_str()) {
        if parsed.path().starts_with(ridewithgps::ROUTES_PATH_PREFIX) {
            return Ok(SourceKind::RideWithGpsRoute {
                fetch_url: ridewithgps_fetch_url(raw),
            });
        }
        return Ok(SourceKind::Ignored);
    }

    if bikeroutetoaster::HOSTS.contains(&host.as_str()) {
        return extract_course_id(raw)
            .map(|course_id| SourceKind::BikeRouteToaster { course_id })
            .ok_or_else(|| ResolveError::MissingCourseId {
                url: raw.to_string(),
            });
    }

    if portal::HOSTS.contains(&host.as_str()) || ignored::SEARCH_HOSTS.contains(&host.as_str()) {
        return Ok(SourceKind::Ignored);
    }

    Ok(SourceKind::Unknown { host: Some(host) })
}

/// GPX export URL for a RideWithGPS route page
pub fn ridewithgps_fetch_url(route_url: &str) -> String {
    format!("{}{}", route_url, ridewithgps::TRACK_SUFFIX)
}

/// Pull the numeric course id out of either known BikeRouteToaster URL shape
pub fn extract_course_id(url: &str) -> Option<u64> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(bikeroutetoaster::COURSE_ID_PATTERN).expect("course id pattern is valid")
    });
    pattern
        .captures(url)
        .and_then(|caps| caps.get(1))
        .and_then(|id| id.as_str().parse().ok())
}
