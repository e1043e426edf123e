//! Single-code search and image proxy handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use photofinder_core::discovery::NOT_FOUND_MESSAGE;
use photofinder_core::SearchResult;
use reqwest::Url;
use serde::Deserialize;
use tracing::{info, warn};

use super::handlers::{api_error, ApiError};
use crate::state::AppState;

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadImageQuery {
    pub url: String,
    #[serde(default)]
    pub filename: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Search one product code.
pub async fn search_single(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResult>, ApiError> {
    let outcome = state
        .engine()
        .find_raw(&request.code)
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    info!(
        code = %outcome.result.code,
        found = outcome.result.found,
        probes = outcome.probes_used,
        "Single search finished"
    );
    Ok(Json(outcome.result))
}

/// Proxy an image from the configured origin as an attachment.
pub async fn download_image(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DownloadImageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(url) = origin_url(state.engine().base_url(), &query.url) else {
        warn!(url = %query.url, "Rejected download outside the image origin");
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "URL non appartenente all'archivio immagini",
        ));
    };

    let bytes = state.fetcher().fetch(url.as_str()).await.map_err(|e| {
        warn!(url = %query.url, error = %e, "Image download failed");
        api_error(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE)
    })?;

    let filename = attachment_name(query.filename.as_deref(), url.as_str());
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    ))
}

/// The parsed URL when it names a file below the origin base path.
///
/// Parsing resolves `.` and `..` segments (encoded ones too), so the path
/// check runs on the location that would actually be fetched.
fn origin_url(base: &str, candidate: &str) -> Option<Url> {
    let base = Url::parse(base).ok()?;
    let url = Url::parse(candidate).ok()?;

    let same_origin = url.scheme() == base.scheme()
        && url.host_str() == base.host_str()
        && url.port_or_known_default() == base.port_or_known_default()
        && url.username().is_empty()
        && url.password().is_none();
    let prefix = format!("{}/", base.path().trim_end_matches('/'));
    let below_base = url.path().len() > prefix.len() && url.path().starts_with(&prefix);

    (same_origin && below_base).then_some(url)
}

/// Header-safe download name: the requested one, else the URL's last segment.
fn attachment_name(requested: Option<&str>, url: &str) -> String {
    let fallback = url.rsplit('/').next().unwrap_or(url);
    let name = requested
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            urlencoding::decode(fallback)
                .map(|n| n.into_owned())
                .unwrap_or_else(|_| fallback.to_string())
        });

    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '"' | '\\' | '/') && !c.is_control())
        .collect();
    if cleaned.is_empty() {
        "immagine".to_string()
    } else {
        cleaned
    }
}
