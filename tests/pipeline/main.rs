//! Integration tests for the conversion pipeline
//!
//! These tests run the full route list to aggregate path against a real
//! on-disk cache, with a stub fetcher standing in for the track hosts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use perms_fetcher::app::cache::{CacheConfig, CacheManager, ContentStore, Stage};
use perms_fetcher::app::fetcher::TrackFetcher;
use perms_fetcher::app::hash::CacheKey;
use perms_fetcher::app::models::Route;
use perms_fetcher::app::pipeline::{load_routes, write_output, ConverterChain, Pipeline};
use perms_fetcher::app::source::SourceKind;
use perms_fetcher::errors::FetchResult;

const VALID_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="RideWithGPS" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Hills Loop</name>
    <trkseg>
      <trkpt lat="-34.9285" lon="138.6007"><ele>50.0</ele></trkpt>
      <trkpt lat="-34.9300" lon="138.6100"><ele>62.5</ele></trkpt>
      <trkpt lat="-34.9400" lon="138.6200"><ele>80.0</ele></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

/// Fetcher serving canned tracks and counting every call
#[derive(Default)]
struct StubFetcher {
    ridewithgps: HashMap<String, String>,
    bikeroutetoaster: HashMap<u64, String>,
    calls: AtomicUsize,
}

impl StubFetcher {
    fn with_ridewithgps(mut self, route_url: &str, track: &str) -> Self {
        self.ridewithgps
            .insert(format!("{}.gpx?sub_format=track", route_url), track.to_string());
        self
    }

    fn with_course(mut self, course_id: u64, track: &str) -> Self {
        self.bikeroutetoaster.insert(course_id, track.to_string());
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackFetcher for StubFetcher {
    async fn fetch(&self, source: &SourceKind) -> FetchResult<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(match source {
            SourceKind::RideWithGpsRoute { fetch_url } => self.ridewithgps.get(fetch_url).cloned(),
            SourceKind::BikeRouteToaster { course_id } => {
                self.bikeroutetoaster.get(course_id).cloned()
            }
            _ => None,
        })
    }
}

/// Test fixture: temp directory with a cache under `data/`
struct Fixture {
    _temp_dir: TempDir,
    root: PathBuf,
    cache: Arc<CacheManager>,
}

impl Fixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        let cache = Arc::new(
            CacheManager::new(CacheConfig::with_cache_root(root.join("data")))
                .await
                .unwrap(),
        );
        Self {
            _temp_dir: temp_dir,
            root,
            cache,
        }
    }

    fn pipeline(&self, fetcher: &Arc<StubFetcher>) -> Pipeline<Arc<StubFetcher>, CacheManager> {
        Pipeline::new(ConverterChain::new(fetcher.clone(), self.cache.clone()))
    }

    fn output_path(&self) -> PathBuf {
        self.root.join("data").join("perms.json")
    }

    async fn write_input(&self, routes: Value) -> PathBuf {
        let path = self.root.join("perms.json");
        tokio::fs::write(&path, routes.to_string()).await.unwrap();
        path
    }
}

fn test_route(url: &str) -> Value {
    json!([{
        "txtRideName": "Test",
        "txtRideDescription": "d",
        "intRideDistanceNominal": 100,
        "directlink": "http://x",
        "attachments": [{"txtURL": url}]
    }])
}

async fn run_to_file(
    fixture: &Fixture,
    fetcher: &Arc<StubFetcher>,
    input: &Path,
) -> Value {
    let routes = load_routes(input).await.unwrap();
    let output = fixture.pipeline(fetcher).run(&routes).await.unwrap();
    write_output(&fixture.output_path(), &output.routes)
        .await
        .unwrap();
    let text = tokio::fs::read_to_string(fixture.output_path()).await.unwrap();
    serde_json::from_str(&text).unwrap()
}

#[tokio::test]
async fn test_upstream_not_found_drops_route() {
    let fixture = Fixture::new().await;
    let fetcher = Arc::new(StubFetcher::default());
    let input = fixture
        .write_input(test_route("https://ridewithgps.com/routes/12345"))
        .await;

    let output = run_to_file(&fixture, &fetcher, &input).await;

    assert_eq!(output, json!([]));
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_valid_track_produces_one_topology_file() {
    let fixture = Fixture::new().await;
    let url = "https://ridewithgps.com/routes/12345";
    let fetcher = Arc::new(StubFetcher::default().with_ridewithgps(url, VALID_GPX));
    let input = fixture.write_input(test_route(url)).await;

    let output = run_to_file(&fixture, &fetcher, &input).await;

    let entries = output.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["name"], "Test");
    assert_eq!(entries[0]["description"], "d");
    assert_eq!(entries[0]["distance"], "100km");
    assert_eq!(entries[0]["links"], json!(["http://x"]));

    let paths = entries[0]["topoJson"].as_array().unwrap();
    assert_eq!(paths.len(), 1);
    let topology_path = PathBuf::from(paths[0].as_str().unwrap());
    assert!(topology_path.exists());

    let key = CacheKey::from_url(url);
    assert_eq!(topology_path, fixture.cache.path(&key, Stage::Topology));
    for stage in Stage::ALL {
        assert!(fixture.cache.has(&key, stage).await, "missing {} entry", stage);
    }

    let topology: Value =
        serde_json::from_str(&std::fs::read_to_string(&topology_path).unwrap()).unwrap();
    assert_eq!(topology["type"], "Topology");
    assert_eq!(
        topology["objects"]["data"]["geometries"][0]["properties"]["name"],
        "Hills Loop"
    );
}

#[tokio::test]
async fn test_rerun_is_served_from_cache() {
    let fixture = Fixture::new().await;
    let url = "https://ridewithgps.com/routes/12345";
    let input = fixture.write_input(test_route(url)).await;

    let first_fetcher = Arc::new(StubFetcher::default().with_ridewithgps(url, VALID_GPX));
    let first = run_to_file(&fixture, &first_fetcher, &input).await;
    let first_bytes = tokio::fs::read(fixture.output_path()).await.unwrap();
    assert_eq!(first_fetcher.calls(), 1);

    // Second fetcher knows no tracks: any call would drop the route
    let second_fetcher = Arc::new(StubFetcher::default());
    let second = run_to_file(&fixture, &second_fetcher, &input).await;
    let second_bytes = tokio::fs::read(fixture.output_path()).await.unwrap();

    assert_eq!(second_fetcher.calls(), 0);
    assert_eq!(first, second);
    assert_eq!(first_bytes, second_bytes);
}

#[tokio::test]
async fn test_bikeroutetoaster_course() {
    let fixture = Fixture::new().await;
    let fetcher = Arc::new(StubFetcher::default().with_course(98765, VALID_GPX));
    let input = fixture
        .write_input(test_route(
            "http://www.bikeroutetoaster.com/BRTWebUI/Course/98765",
        ))
        .await;

    let output = run_to_file(&fixture, &fetcher, &input).await;

    assert_eq!(output[0]["distance"], "100km");
    assert_eq!(output[0]["topoJson"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_routes_without_supported_sources_are_absent() {
    let fixture = Fixture::new().await;
    let good = "https://ridewithgps.com/routes/1";
    let fetcher = Arc::new(StubFetcher::default().with_ridewithgps(good, VALID_GPX));
    let input = fixture
        .write_input(json!([
            {"txtRideName": "Portal only", "attachments": [{"txtURL": "https://www.audax.org.au/x"}]},
            {"txtRideName": "Strava only", "attachments": [{"txtURL": "https://www.strava.com/routes/5"}]},
            {"txtRideName": "Broken", "attachments": [{"txtURL": 7}, {"txtURL": null}, {}]},
            {"txtRideName": "Good", "intRideDistanceNominal": 200, "attachments": [{"txtURL": good}]}
        ]))
        .await;

    let output = run_to_file(&fixture, &fetcher, &input).await;

    let names: Vec<&str> = output
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Good"]);
    assert_eq!(output[0]["distance"], "200km");
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_malformed_track_does_not_stop_siblings() {
    let fixture = Fixture::new().await;
    let broken = "https://ridewithgps.com/routes/1";
    let good = "https://ridewithgps.com/routes/2";
    let fetcher = Arc::new(
        StubFetcher::default()
            .with_ridewithgps(broken, "<html><body>Server error</body></html>")
            .with_ridewithgps(good, VALID_GPX),
    );
    let routes: Vec<Route> = serde_json::from_value(json!([{
        "txtRideName": "Mixed",
        "intRideDistanceNominal": 300,
        "attachments": [{"txtURL": broken}, {"txtURL": good}]
    }]))
    .unwrap();

    let output = fixture.pipeline(&fetcher).run(&routes).await.unwrap();

    assert_eq!(output.routes.len(), 1);
    assert_eq!(
        output.routes[0].topology_paths,
        vec![fixture
            .cache
            .path(&CacheKey::from_url(good), Stage::Topology)]
    );
    assert_eq!(output.summary.sources_failed, 1);
}

#[tokio::test]
async fn test_output_preserves_input_order() {
    let fixture = Fixture::new().await;
    let mut fetcher = StubFetcher::default();
    let mut routes = Vec::new();
    for id in 1..=12 {
        let url = format!("https://ridewithgps.com/routes/{}", id);
        fetcher = fetcher.with_ridewithgps(&url, VALID_GPX);
        routes.push(json!({"txtRideName": format!("Route {}", id), "attachments": [{"txtURL": url}]}));
    }
    let fetcher = Arc::new(fetcher);
    let routes: Vec<Route> = serde_json::from_value(Value::Array(routes)).unwrap();

    let output = fixture.pipeline(&fetcher).run(&routes).await.unwrap();

    let names: Vec<String> = output.routes.iter().map(|r| r.name.clone()).collect();
    let expected: Vec<String> = (1..=12).map(|id| format!("Route {}", id)).collect();
    assert_eq!(names, expected);
    assert_eq!(output.summary.tracks, 12);
}

#[tokio::test]
async fn test_error_page_is_retried_on_next_run() {
    let fixture = Fixture::new().await;
    let url = "https://ridewithgps.com/routes/12345";
    let input = fixture.write_input(test_route(url)).await;

    let limited = Arc::new(
        StubFetcher::default().with_ridewithgps(url, "<html><body>Rate limited</body></html>"),
    );
    let first = run_to_file(&fixture, &limited, &input).await;
    assert_eq!(first, json!([]));
    assert!(!fixture.cache.has(&CacheKey::from_url(url), Stage::Track).await);

    let recovered = Arc::new(StubFetcher::default().with_ridewithgps(url, VALID_GPX));
    let second = run_to_file(&fixture, &recovered, &input).await;
    assert_eq!(recovered.calls(), 1);
    assert_eq!(second.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_sloppy_route_records_are_tolerated() {
    let fixture = Fixture::new().await;
    let url = "https://ridewithgps.com/routes/1";
    let fetcher = Arc::new(StubFetcher::default().with_ridewithgps(url, VALID_GPX));
    let input = fixture
        .write_input(json!([{
            "txtRideName": "Sloppy",
            "txtRideDescription": null,
            "directlink": null,
            "attachments": [null, "https://ridewithgps.com/routes/9", {"txtURL": url}]
        }]))
        .await;

    let output = run_to_file(&fixture, &fetcher, &input).await;

    assert_eq!(output[0]["name"], "Sloppy");
    assert_eq!(output[0]["description"], "");
    assert_eq!(output[0]["topoJson"].as_array().unwrap().len(), 1);
    assert_eq!(fetcher.calls(), 1);
}
