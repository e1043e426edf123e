//! Mock image origin for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::origin::{build_url, FetchError, Fetcher, Prober};

/// In-memory stand-in for the remote image host.
///
/// Provides controllable behavior for testing:
/// - Declare which filenames exist (and their bytes)
/// - Record every probed URL in order
/// - Make fetches fail, or make probes slow or panic
///
/// # Example
///
/// ```rust,ignore
/// use photofinder_core::testing::MockOrigin;
///
/// let origin = Arc::new(MockOrigin::new("https://origin.test/img"));
/// origin.add_file("24369.jpg").await;
///
/// let engine = DiscoveryEngine::from_config(&config, origin.clone());
/// let outcome = engine.find_raw("24369").await?;
/// assert!(outcome.result.found);
/// assert_eq!(origin.probe_count().await, 1);
/// ```
pub struct MockOrigin {
    base_url: String,
    /// Existing URLs and their bodies.
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    /// URLs that exist for probes but fail on fetch.
    broken: Arc<RwLock<HashSet<String>>>,
    /// Every probed URL, in order.
    probes: Arc<RwLock<Vec<String>>>,
    /// Artificial latency per probe.
    delay: Arc<RwLock<Option<Duration>>>,
    /// Probing a URL containing this text panics.
    panic_on: Arc<RwLock<Option<String>>>,
}

impl std::fmt::Debug for MockOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockOrigin")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl MockOrigin {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            files: Arc::new(RwLock::new(HashMap::new())),
            broken: Arc::new(RwLock::new(HashSet::new())),
            probes: Arc::new(RwLock::new(Vec::new())),
            delay: Arc::new(RwLock::new(None)),
            panic_on: Arc::new(RwLock::new(None)),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Make `filename` exist under the base URL with placeholder bytes.
    pub async fn add_file(&self, filename: &str) {
        let body = super::fixtures::image_bytes(filename);
        self.add_file_with_body(filename, body).await;
    }

    pub async fn add_file_with_body(&self, filename: &str, body: Vec<u8>) {
        let url = build_url(&self.base_url, filename);
        self.add_url(&url, body).await;
    }

    /// Make an arbitrary absolute URL exist.
    pub async fn add_url(&self, url: &str, body: Vec<u8>) {
        self.files.write().await.insert(url.to_string(), body);
    }

    /// Keep `filename` probe-visible but fail every fetch of it.
    pub async fn fail_fetch(&self, filename: &str) {
        let url = build_url(&self.base_url, filename);
        self.broken.write().await.insert(url);
    }

    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// Panic when a probed URL contains `needle`.
    pub async fn panic_on(&self, needle: &str) {
        *self.panic_on.write().await = Some(needle.to_string());
    }

    pub async fn probe_count(&self) -> usize {
        self.probes.read().await.len()
    }

    pub async fn probed_urls(&self) -> Vec<String> {
        self.probes.read().await.clone()
    }

    pub async fn clear_probes(&self) {
        self.probes.write().await.clear();
    }
}

#[async_trait]
impl Prober for MockOrigin {
    async fn probe(&self, url: &str) -> bool {
        self.probes.write().await.push(url.to_string());

        if let Some(needle) = self.panic_on.read().await.as_deref() {
            if url.contains(needle) {
                panic!("mock origin panic while probing {}", url);
            }
        }

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.files.read().await.contains_key(url)
    }
}

#[async_trait]
impl Fetcher for MockOrigin {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if self.broken.read().await.contains(url) {
            return Err(FetchError::ConnectionFailed(format!("mock failure for {}", url)));
        }
        self.files
            .read()
            .await
            .get(url)
            .cloned()
            .ok_or(FetchError::HttpStatus(404))
    }
}
