//! Common test utilities for in-process API tests.
//!
//! [`TestFixture`] builds the full router with a [`MockOrigin`] standing in
//! for the image host and the mapping spreadsheet server.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request, Router};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use photofinder_core::testing::MockOrigin;
use photofinder_core::{
    BatchOrchestrator, Config, DiscoveryEngine, InMemoryProgressStore, MappingRefresher,
    ProgressStore, RenameSessionStore, Renamer, SqliteMappingStore,
};
use photofinder_server::state::AppState;

/// Re-export fixtures for test convenience
pub use photofinder_core::testing::fixtures;

/// Base URL the mock origin serves images under.
pub const ORIGIN_BASE: &str = "https://origin.test/foto-prodotti/cartella-immagini";

/// URL the mapping spreadsheet is served from when enabled.
pub const MAPPING_URL: &str = "https://sheets.test/mappa.csv";

const BOUNDARY: &str = "photofinder-test-boundary";

/// Test response wrapper.
pub struct TestResponse {
    pub status: axum::http::StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
    pub bytes: Vec<u8>,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// One part of a multipart form.
pub struct FilePart<'a> {
    pub field: &'a str,
    pub filename: &'a str,
    pub bytes: Vec<u8>,
}

impl<'a> FilePart<'a> {
    pub fn new(field: &'a str, filename: &'a str, bytes: Vec<u8>) -> Self {
        Self {
            field,
            filename,
            bytes,
        }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Serve a mapping spreadsheet at [`MAPPING_URL`].
    pub with_mapping_url: bool,
    /// Override `batch.max_codes`.
    pub max_codes: Option<usize>,
}

impl TestConfig {
    pub fn with_mapping_url() -> Self {
        Self {
            with_mapping_url: true,
            ..Self::default()
        }
    }
}

/// Test fixture containing the router and the mock origin behind it.
pub struct TestFixture {
    pub router: Router,
    pub origin: Arc<MockOrigin>,
    pub progress_store: Arc<dyn ProgressStore>,
    pub mapping_store: Arc<SqliteMappingStore>,
    pub temp_dir: TempDir,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_config(TestConfig::default())
    }

    pub fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let mut config = Config::default();
        config.origin.base_url = ORIGIN_BASE.to_string();
        config.database.path = temp_dir.path().join("test.db");
        config.batch.inter_request_delay_ms = 0;
        if let Some(max) = test_config.max_codes {
            config.batch.max_codes = max;
        }
        if test_config.with_mapping_url {
            config.renamer.mapping_url = Some(MAPPING_URL.to_string());
        }

        let origin = Arc::new(MockOrigin::new(ORIGIN_BASE));

        let engine = DiscoveryEngine::from_config(&config, origin.clone());
        let progress_store: Arc<dyn ProgressStore> = Arc::new(InMemoryProgressStore::new());
        let orchestrator = BatchOrchestrator::new(
            engine,
            Arc::clone(&progress_store),
            config.batch.clone(),
            &config.progress,
        );

        let mapping_store = Arc::new(
            SqliteMappingStore::new(&config.database.path).expect("Failed to open mapping store"),
        );
        let refresher = MappingRefresher::new(
            mapping_store.clone(),
            origin.clone(),
            config.renamer.mapping_url.clone(),
        );
        let sessions = Arc::new(RenameSessionStore::new(Duration::from_secs(
            config.renamer.session_ttl_secs,
        )));
        let renamer = Renamer::new(
            mapping_store.clone(),
            refresher,
            Arc::clone(&sessions),
            &config.renamer,
        );

        let state = Arc::new(AppState::new(
            config,
            orchestrator,
            origin.clone(),
            renamer,
            sessions,
        ));

        let router = photofinder_server::api::create_router(state);

        Self {
            router,
            origin,
            progress_store,
            mapping_store,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        self.send(request).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Send a multipart/form-data POST.
    pub async fn post_multipart(&self, path: &str, parts: Vec<FilePart<'_>>) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(&parts)))
            .unwrap();
        self.send(request).await
    }

    /// Upload a single spreadsheet as the `file` field.
    pub async fn upload_codes(&self, path: &str, filename: &str, bytes: Vec<u8>) -> TestResponse {
        self.post_multipart(path, vec![FilePart::new("file", filename, bytes)])
            .await
    }

    /// Poll a tracked task until it leaves `in_progress`.
    pub async fn wait_for_task(&self, task_id: &str) -> TestResponse {
        for _ in 0..200 {
            let response = self.get(&format!("/api/progress/{}", task_id)).await;
            if response.body["status"] != "in_progress" {
                return response;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("Task {} did not finish in time", task_id);
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
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
            bytes: body_bytes.to_vec(),
        }
    }
}

fn multipart_body(parts: &[FilePart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                part.field, part.filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(&part.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
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
