//! reqwest-backed origin client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, RANGE};
use reqwest::{redirect, Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::OriginConfig;
use crate::metrics::PROBES_TOTAL;

use super::types::{
    FetchError, Fetcher, ProbeOutcome, Prober, BROWSER_ACCEPT, BROWSER_ACCEPT_LANGUAGE,
};

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 10;

/// HTTP client for the remote image origin.
///
/// One instance is shared by the whole process; the underlying connection
/// pool is safe for concurrent use.
#[derive(Debug, Clone)]
pub struct HttpOrigin {
    client: Client,
    probe_timeout: Duration,
    fetch_timeout: Duration,
}

impl HttpOrigin {
    /// Create a client sending browser-like headers.
    pub fn new(config: &OriginConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(BROWSER_ACCEPT_LANGUAGE),
        );

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
        })
    }

    /// Run a probe and report the detailed outcome.
    pub async fn probe_outcome(&self, url: &str) -> ProbeOutcome {
        let outcome = match self
            .client
            .head(url)
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => {
                let status = response.status();
                if status == StatusCode::METHOD_NOT_ALLOWED || status == StatusCode::NOT_IMPLEMENTED
                {
                    debug!(url = %url, status = status.as_u16(), "HEAD rejected, retrying with ranged GET");
                    self.ranged_probe(url).await
                } else {
                    classify_status(status, false)
                }
            }
            Err(e) => transport_failure(url, &e),
        };

        match outcome {
            ProbeOutcome::Blocked => {
                warn!(url = %url, "Probe refused by origin, treating as not found")
            }
            _ => debug!(url = %url, outcome = outcome.as_str(), "Probe finished"),
        }
        PROBES_TOTAL.with_label_values(&[outcome.as_str()]).inc();

        outcome
    }

    async fn ranged_probe(&self, url: &str) -> ProbeOutcome {
        match self
            .client
            .get(url)
            .header(RANGE, "bytes=0-0")
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => classify_status(response.status(), true),
            Err(e) => transport_failure(url, &e),
        }
    }
}

fn classify_status(status: StatusCode, ranged: bool) -> ProbeOutcome {
    match status {
        StatusCode::OK => ProbeOutcome::Found,
        StatusCode::PARTIAL_CONTENT if ranged => ProbeOutcome::Found,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            ProbeOutcome::Blocked
        }
        _ => ProbeOutcome::Absent,
    }
}

fn transport_failure(url: &str, error: &reqwest::Error) -> ProbeOutcome {
    if error.is_timeout() {
        warn!(url = %url, "Probe timed out");
    } else {
        warn!(url = %url, error = %error, "Probe failed");
    }
    ProbeOutcome::Failed
}

#[async_trait]
impl Prober for HttpOrigin {
    async fn probe(&self, url: &str) -> bool {
        self.probe_outcome(url).await.is_found()
    }
}

#[async_trait]
impl Fetcher for HttpOrigin {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else if e.is_connect() {
                    FetchError::ConnectionFailed(e.to_string())
                } else {
                    FetchError::Client(e.to_string())
                }
            })?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Client(e.to_string())
            }
        })?;

        debug!(url = %url, bytes = bytes.len(), "Fetched");
        Ok(bytes.to_vec())
    }
}
