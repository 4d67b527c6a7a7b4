//! Retrieval of raw GPX tracks from the hosting services
//!
//! A fetch either yields the track text, reports the track as absent (the
//! upstream resource is gone, or the source has no fetcher), or fails. Absent
//! is an expected outcome; failures are reported by the caller.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::app::client::{HttpHandler, TrackClient};
use crate::app::source::SourceKind;
use crate::constants::bikeroutetoaster;
use crate::errors::{FetchError, FetchResult};

/// Source of raw track text
#[async_trait]
pub trait TrackFetcher: Send + Sync {
    /// Fetch the GPX text for a source, `Ok(None)` when there is none
    async fn fetch(&self, source: &SourceKind) -> FetchResult<Option<String>>;
}

#[async_trait]
impl<T: TrackFetcher + ?Sized> TrackFetcher for Arc<T> {
    async fn fetch(&self, source: &SourceKind) -> FetchResult<Option<String>> {
        (**self).fetch(source).await
    }
}

/// Fetcher talking to RideWithGPS and BikeRouteToaster over HTTP
///
/// RideWithGPS tracks are fetched from the URL carried by the source.
/// BikeRouteToaster endpoints default to the public service and can be
/// pointed elsewhere.
#[derive(Debug)]
pub struct HttpTrackFetcher {
    client: Arc<TrackClient>,
    course_url: String,
    export_url: String,
}

impl HttpTrackFetcher {
    pub fn new(client: Arc<TrackClient>) -> Self {
        Self {
            client,
            course_url: bikeroutetoaster::COURSE_URL.to_string(),
            export_url: bikeroutetoaster::EXPORT_GPX_URL.to_string(),
        }
    }

    /// Use other BikeRouteToaster endpoints
    ///
    /// `course_url` is the course metadata prefix the course id is appended
    /// to; `export_url` receives the export request.
    pub fn with_bikeroutetoaster_endpoints(
        mut self,
        course_url: impl Into<String>,
        export_url: impl Into<String>,
    ) -> Self {
        self.course_url = course_url.into();
        self.export_url = export_url.into();
        self
    }

    /// GET the route's GPX export
    async fn fetch_ridewithgps(&self, fetch_url: &str) -> FetchResult<Option<String>> {
        let url = HttpHandler::parse_url(fetch_url)?;
        let track = self.client.http().get_optional_text(&url).await?;
        if track.is_none() {
            info!("RideWithGPS route not found: {}", fetch_url);
        }
        Ok(track)
    }

    /// Course metadata endpoint for a BikeRouteToaster course
    pub fn course_metadata_url(&self, course_id: u64) -> String {
        format!("{}{}", self.course_url, course_id)
    }

    /// Look up the course, then submit its course file to the GPX exporter
    async fn fetch_bikeroutetoaster(&self, course_id: u64) -> FetchResult<Option<String>> {
        let course_url = HttpHandler::parse_url(&self.course_metadata_url(course_id))?;
        let Some(course) = self
            .client
            .http()
            .get_optional_json::<Value>(&course_url)
            .await?
        else {
            info!("BikeRouteToaster course not found: {}", course_id);
            return Ok(None);
        };

        let course_file = course
            .get(bikeroutetoaster::COURSE_FILE_FIELD)
            .cloned()
            .ok_or_else(|| FetchError::InvalidResponse {
                url: course_url.to_string(),
                reason: format!("missing {}", bikeroutetoaster::COURSE_FILE_FIELD),
            })?;

        let export_url = HttpHandler::parse_url(&self.export_url)?;
        let track = self
            .client
            .http()
            .post_json_for_text(&export_url, &export_request(course_file))
            .await?;
        Ok(Some(track))
    }
}

#[async_trait]
impl TrackFetcher for HttpTrackFetcher {
    async fn fetch(&self, source: &SourceKind) -> FetchResult<Option<String>> {
        match source {
            SourceKind::RideWithGpsRoute { fetch_url } => self.fetch_ridewithgps(fetch_url).await,
            SourceKind::BikeRouteToaster { course_id } => {
                self.fetch_bikeroutetoaster(*course_id).await
            }
            SourceKind::Ignored | SourceKind::Unknown { .. } => {
                debug!("No fetcher for {} source", source.label());
                Ok(None)
            }
        }
    }
}

/// Body of the GPX export request
pub fn export_request(course_file: Value) -> Value {
    json!({ "data": course_file })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_metadata_url() {
        let fetcher = HttpTrackFetcher::new(Arc::new(TrackClient::new().unwrap()));
        assert_eq!(
            fetcher.course_metadata_url(123456),
            "http://bikeroutetoaster.com/api/BRT.WebUI/Course/GetCourse/123456"
        );
    }

    #[test]
    fn test_export_request_wraps_course_file() {
        let body = export_request(json!("<course/>"));
        assert_eq!(body, json!({"data": "<course/>"}));
    }

    #[tokio::test]
    async fn test_unresolvable_sources_are_absent_without_network() {
        let client = Arc::new(TrackClient::new().unwrap());
        let fetcher = HttpTrackFetcher::new(client);

        assert_eq!(fetcher.fetch(&SourceKind::Ignored).await.unwrap(), None);
        assert_eq!(
            fetcher
                .fetch(&SourceKind::Unknown {
                    host: Some("example.com".to_string())
                })
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_invalid_fetch_url_is_a_failure() {
        let client = Arc::new(TrackClient::new().unwrap());
        let fetcher = HttpTrackFetcher::new(client);
        let result = fetcher
            .fetch(&SourceKind::RideWithGpsRoute {
                fetch_url: "not a url".to_string(),
            })
            .await;
        assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
    }
}
