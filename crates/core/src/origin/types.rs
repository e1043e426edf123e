//! Types for talking to the remote image origin.

use async_trait::async_trait;
use thiserror::Error;

/// `Accept` header sent with every request, as a desktop browser would.
pub const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8";

/// `Accept-Language` header sent with every request.
pub const BROWSER_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9,it;q=0.8";

/// How a single probe ended. Callers only see `is_found()`; the finer
/// split feeds logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Found,
    Absent,
    /// 401/403/429: the origin refused us, so absence is unknown.
    Blocked,
    /// Timeout or transport error.
    Failed,
}

impl ProbeOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, ProbeOutcome::Found)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeOutcome::Found => "found",
            ProbeOutcome::Absent => "absent",
            ProbeOutcome::Blocked => "blocked",
            ProbeOutcome::Failed => "failed",
        }
    }
}

/// Errors from downloading bytes off the origin.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout")]
    Timeout,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Unexpected HTTP status {0}")]
    HttpStatus(u16),

    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Existence check for a single URL.
#[async_trait]
pub trait Prober: Send + Sync {
    /// `true` only when the origin positively confirms the resource exists.
    /// Never fails: timeouts and transport errors count as `false`.
    async fn probe(&self, url: &str) -> bool;
}

/// Full download of a single URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Build the probe URL for a filename under `base_url`.
///
/// The filename is percent-encoded as a single path segment.
pub fn build_url(base_url: &str, filename: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(filename)
    )
}
