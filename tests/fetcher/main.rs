//! Integration tests for the HTTP track fetcher
//!
//! A minimal HTTP/1.1 server on a local port stands in for RideWithGPS and
//! BikeRouteToaster. It answers canned responses by method and request
//! target and records every request it receives.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use perms_fetcher::app::client::{ClientConfig, TrackClient};
use perms_fetcher::app::fetcher::{HttpTrackFetcher, TrackFetcher};
use perms_fetcher::app::source::SourceKind;
use perms_fetcher::errors::FetchError;

const GPX: &str = r#"<gpx><trk><trkseg><trkpt lat="1" lon="2"/><trkpt lat="3" lon="4"/></trkseg></trk></gpx>"#;

#[derive(Debug, Clone)]
struct RecordedRequest {
    method: String,
    target: String,
    body: String,
}

type Responses = HashMap<(String, String), (u16, String)>;

/// Local server answering canned responses, 404 for anything else
struct MockServer {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockServer {
    async fn start(responses: Vec<(&str, &str, u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let responses: Arc<Responses> = Arc::new(
            responses
                .into_iter()
                .map(|(method, target, status, body)| {
                    ((method.to_string(), target.to_string()), (status, body))
                })
                .collect(),
        );
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let responses = responses.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, &responses, &recorded).await;
                });
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            requests,
        }
    }

    fn url(&self, target: &str) -> String {
        format!("{}{}", self.base_url, target)
    }

    fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Fetcher whose BikeRouteToaster endpoints point at this server
    fn fetcher(&self) -> HttpTrackFetcher {
        let config = ClientConfig {
            use_system_proxy: false,
            ..Default::default()
        };
        HttpTrackFetcher::new(Arc::new(TrackClient::with_config(&config).unwrap()))
            .with_bikeroutetoaster_endpoints(
                self.url("/api/BRT.WebUI/Course/GetCourse/"),
                self.url("/BRTWebUI/Export/GPX"),
            )
    }
}

/// Read one request, record it and write the canned response
async fn serve(
    mut stream: TcpStream,
    responses: &Responses,
    recorded: &Mutex<Vec<RecordedRequest>>,
) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.split();
    let mut reader = BufReader::new(read_half);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).await? == 0 || header.trim().is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;
    recorded.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        target: target.clone(),
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    let (status, body) = responses
        .get(&(method, target))
        .cloned()
        .unwrap_or((404, "Not Found".to_string()));
    let response = format!(
        "HTTP/1.1 {} Canned\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    write_half.write_all(response.as_bytes()).await?;
    write_half.flush().await
}

fn ridewithgps(server: &MockServer, route: u32) -> SourceKind {
    SourceKind::RideWithGpsRoute {
        fetch_url: server.url(&format!("/routes/{}.gpx?sub_format=track", route)),
    }
}

#[tokio::test]
async fn test_ridewithgps_track_is_returned() {
    let server = MockServer::start(vec![(
        "GET",
        "/routes/1.gpx?sub_format=track",
        200,
        GPX.to_string(),
    )])
    .await;

    let track = server.fetcher().fetch(&ridewithgps(&server, 1)).await.unwrap();

    assert_eq!(track.as_deref(), Some(GPX));
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_ridewithgps_not_found_is_absent() {
    let server = MockServer::start(vec![]).await;

    let track = server.fetcher().fetch(&ridewithgps(&server, 2)).await.unwrap();

    assert_eq!(track, None);
}

#[tokio::test]
async fn test_ridewithgps_server_error_is_a_failure() {
    let server = MockServer::start(vec![(
        "GET",
        "/routes/3.gpx?sub_format=track",
        503,
        "Unavailable".to_string(),
    )])
    .await;

    let result = server.fetcher().fetch(&ridewithgps(&server, 3)).await;

    assert!(matches!(
        result,
        Err(FetchError::ServerError { status: 503, .. })
    ));
}

#[tokio::test]
async fn test_bikeroutetoaster_course_is_exported() {
    let server = MockServer::start(vec![
        (
            "GET",
            "/api/BRT.WebUI/Course/GetCourse/42",
            200,
            json!({"CourseName": "Loop", "CourseFile": "<course id=\"42\"/>"}).to_string(),
        ),
        ("POST", "/BRTWebUI/Export/GPX", 200, GPX.to_string()),
    ])
    .await;

    let track = server
        .fetcher()
        .fetch(&SourceKind::BikeRouteToaster { course_id: 42 })
        .await
        .unwrap();

    assert_eq!(track.as_deref(), Some(GPX));
    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[1].method, "POST");
    assert_eq!(requests[1].target, "/BRTWebUI/Export/GPX");
    let body: Value = serde_json::from_str(&requests[1].body).unwrap();
    assert_eq!(body, json!({"data": "<course id=\"42\"/>"}));
}

#[tokio::test]
async fn test_bikeroutetoaster_missing_course_is_absent() {
    let server = MockServer::start(vec![]).await;

    let track = server
        .fetcher()
        .fetch(&SourceKind::BikeRouteToaster { course_id: 7 })
        .await
        .unwrap();

    assert_eq!(track, None);
    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].target, "/api/BRT.WebUI/Course/GetCourse/7");
}

#[tokio::test]
async fn test_bikeroutetoaster_without_course_file_is_invalid() {
    let server = MockServer::start(vec![(
        "GET",
        "/api/BRT.WebUI/Course/GetCourse/8",
        200,
        json!({"CourseName": "Empty"}).to_string(),
    )])
    .await;

    let result = server
        .fetcher()
        .fetch(&SourceKind::BikeRouteToaster { course_id: 8 })
        .await;

    assert!(matches!(result, Err(FetchError::InvalidResponse { .. })));
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_bikeroutetoaster_export_failure() {
    let server = MockServer::start(vec![
        (
            "GET",
            "/api/BRT.WebUI/Course/GetCourse/9",
            200,
            json!({"CourseFile": "<course/>"}).to_string(),
        ),
        ("POST", "/BRTWebUI/Export/GPX", 500, "boom".to_string()),
    ])
    .await;

    let result = server
        .fetcher()
        .fetch(&SourceKind::BikeRouteToaster { course_id: 9 })
        .await;

    assert!(matches!(
        result,
        Err(FetchError::ServerError { status: 500, .. })
    ));
}
