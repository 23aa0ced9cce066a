//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock article transform injected, so full runs complete without
//! reaching an LLM provider.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use broadsheet_core::{testing::MockTransform, ArticleTransform, Config, TransformKind};
use broadsheet_server::state::{AppState, TransformFactory};

/// Re-export fixtures for test convenience
pub use broadsheet_core::testing::fixtures;

const BOUNDARY: &str = "broadsheet-test-boundary";

/// In-process server whose transforms are [`MockTransform`]s.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Shared state, for inspecting the run registry directly
    pub state: Arc<AppState>,
    /// The analysis transform; also serves translations unless a separate one is given
    pub transform: Arc<MockTransform>,
    /// The translation transform
    pub translate: Arc<MockTransform>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
    pub body: Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

impl TestFixture {
    /// Create a fixture whose transform echoes article titles.
    pub fn new() -> Self {
        Self::with_transform(MockTransform::new())
    }

    pub fn with_transform(transform: MockTransform) -> Self {
        Self::with_config(Self::test_config(), transform)
    }

    /// Separate transforms per kind, for combined runs.
    pub fn with_transforms(analyze: MockTransform, translate: MockTransform) -> Self {
        Self::build(Self::test_config(), Arc::new(analyze), Arc::new(translate))
    }

    pub fn with_config(config: Config, transform: MockTransform) -> Self {
        let transform = Arc::new(transform);
        Self::build(config, Arc::clone(&transform), transform)
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.server.max_upload_bytes = 1024 * 1024;
        config.orchestrator.max_parallel_tasks = 2;
        config
    }

    fn build(config: Config, analyze: Arc<MockTransform>, translate: Arc<MockTransform>) -> Self {
        let (a, t) = (Arc::clone(&analyze), Arc::clone(&translate));
        let factory: TransformFactory = Arc::new(move |kind| match kind {
            TransformKind::Analyze => Arc::clone(&a) as Arc<dyn ArticleTransform>,
            TransformKind::Translate => Arc::clone(&t) as Arc<dyn ArticleTransform>,
        });

        let state = Arc::new(AppState::new(config, factory));
        let router = broadsheet_server::api::create_router(Arc::clone(&state));

        Self {
            router,
            state,
            transform: analyze,
            translate,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(Request::builder().method("GET").uri(path).body(Body::empty()).unwrap())
            .await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.send(Request::builder().method("DELETE").uri(path).body(Body::empty()).unwrap())
            .await
    }

    /// POST a multipart form with a single `file` field.
    pub async fn upload(&self, path: &str, file_name: &str, bytes: &[u8]) -> TestResponse {
        self.post_multipart(path, multipart_body("file", Some(file_name), bytes))
            .await
    }

    /// POST a prebuilt multipart body.
    pub async fn post_multipart(&self, path: &str, body: Vec<u8>) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Poll a run until it reaches a terminal status.
    pub async fn wait_for_run(&self, run_id: &str) -> TestResponse {
        for _ in 0..200 {
            let response = self.get(&format!("/api/v1/runs/{run_id}")).await;
            if matches!(response.body["status"].as_str(), Some("completed" | "error")) {
                return response;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("run {run_id} did not finish in time");
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        let body: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            bytes,
            body,
        }
    }
}

/// Encode one form field as `multipart/form-data`.
pub fn multipart_body(field: &str, file_name: Option<&str>, bytes: &[u8]) -> Vec<u8> {
    let disposition = match file_name {
        Some(name) => format!("form-data; name=\"{field}\"; filename=\"{name}\""),
        None => format!("form-data; name=\"{field}\""),
    };

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Disposition: {disposition}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// A small EPUB with one `<h1>` article per heading.
pub fn weekly_epub(headings: &[&str]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    let mut add = |name: &str, content: &str| {
        zip.start_file(name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    };

    add("mimetype", "application/epub+zip");
    add(
        "META-INF/container.xml",
        r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
    );

    let manifest: String = (0..headings.len())
        .map(|i| format!(r#"<item id="c{i}" href="part{i}.xhtml" media-type="application/xhtml+xml"/>"#))
        .collect();
    let spine: String = (0..headings.len())
        .map(|i| format!(r#"<itemref idref="c{i}"/>"#))
        .collect();
    add(
        "OEBPS/content.opf",
        &format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="bookid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>The Weekly Review</dc:title>
    <dc:identifier id="bookid">urn:uuid:0b7c4d7e-1c55-4c1b-9a8e-000000000002</dc:identifier>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    {manifest}
  </manifest>
  <spine toc="ncx">{spine}</spine>
</package>"#
        ),
    );

    let nav_points: String = headings
        .iter()
        .enumerate()
        .map(|(i, heading)| {
            format!(
                r#"<navPoint id="n{i}" playOrder="{}"><navLabel><text>{heading}</text></navLabel><content src="part{i}.xhtml"/></navPoint>"#,
                i + 1
            )
        })
        .collect();
    add(
        "OEBPS/toc.ncx",
        &format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head><meta name="dtb:uid" content="urn:uuid:0b7c4d7e-1c55-4c1b-9a8e-000000000002"/></head>
  <docTitle><text>The Weekly Review</text></docTitle>
  <navMap>{nav_points}</navMap>
</ncx>"#
        ),
    );

    for (i, heading) in headings.iter().enumerate() {
        add(
            &format!("OEBPS/part{i}.xhtml"),
            &format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>{heading}</title></head>
<body><h1>{heading}</h1><p>{}</p></body></html>"#,
                fixtures::prose(450)
            ),
        );
    }

    zip.finish().unwrap().into_inner()
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
