//! Prometheus metrics for the HTTP server.
//!
//! HTTP request metrics are recorded by the middleware. Progress task and
//! rename session gauges are refreshed from application state right before
//! each scrape. Core metrics (probes, searches, batches) are registered here
//! too so `/metrics` exposes everything from one registry.

use once_cell::sync::Lazy;
use photofinder_core::TaskStatus;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "photofinder_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("photofinder_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "photofinder_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Application state (collected dynamically)
// =============================================================================

/// Tracked batch tasks by status.
pub static PROGRESS_TASKS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "photofinder_progress_tasks",
            "Tracked batch tasks currently retained, by status",
        ),
        &["status"],
    )
    .unwrap()
});

/// Rename sessions waiting for download.
pub static RENAME_SESSIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "photofinder_rename_sessions_active",
        "Rename sessions waiting to be downloaded",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // State
    registry
        .register(Box::new(PROGRESS_TASKS_BY_STATUS.clone()))
        .unwrap();
    registry
        .register(Box::new(RENAME_SESSIONS_ACTIVE.clone()))
        .unwrap();

    // Core metrics (probes, searches, batches, mapping refreshes)
    for metric in photofinder_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Refresh the state gauges before a scrape.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    if let Ok(tasks) = state.progress_store().list() {
        for status in [TaskStatus::InProgress, TaskStatus::Completed, TaskStatus::Error] {
            let count = tasks.iter().filter(|t| t.status == status).count();
            PROGRESS_TASKS_BY_STATUS
                .with_label_values(&[status.as_str()])
                .set(count as i64);
        }
    }

    let sessions = state.rename_sessions();
    sessions.purge_expired();
    RENAME_SESSIONS_ACTIVE.set(sessions.len() as i64);
}

static UUID_SEGMENT: Lazy<regex_lite::Regex> = Lazy::new(|| {
    regex_lite::Regex::new(
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
    )
    .unwrap()
});

static NUMERIC_SEGMENT: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = UUID_SEGMENT.replace_all(path, "{id}");
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/progress/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(normalize_path(path), "/api/progress/{id}");
    }

    #[test]
    fn test_normalize_path_uuid_middle() {
        let path = "/api/rename/550e8400-e29b-41d4-a716-446655440000/zip";
        assert_eq!(normalize_path(path), "/api/rename/{id}/zip");
    }

    #[test]
    fn test_normalize_path_numeric() {
        assert_eq!(normalize_path("/api/progress/12345"), "/api/progress/{id}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(normalize_path("/api/search-single"), "/api/search-single");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("photofinder_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_core_metrics() {
        photofinder_core::metrics::SEARCHES_TOTAL
            .with_label_values(&["found"])
            .inc_by(0);
        PROGRESS_TASKS_BY_STATUS
            .with_label_values(&["in_progress"])
            .set(0);
        RENAME_SESSIONS_ACTIVE.set(0);

        let output = encode_metrics();
        assert!(output.contains("photofinder_searches_total"));
        assert!(output.contains("photofinder_progress_tasks"));
        assert!(output.contains("photofinder_rename_sessions_active"));
    }
}
