//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Origin probing (outcome of every existence check)
//! - Discovery (search results, probes spent per search)
//! - Batch tasks (mode and final result)
//! - Rename mappings (refresh attempts)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Origin
// =============================================================================

/// Probes issued against the origin by outcome.
pub static PROBES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("photofinder_probes_total", "Total origin existence probes"),
        &["outcome"], // "found", "absent", "blocked", "failed"
    )
    .unwrap()
});

// =============================================================================
// Discovery
// =============================================================================

/// Completed searches by result.
pub static SEARCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("photofinder_searches_total", "Total product code searches"),
        &["result"], // "found", "not_found"
    )
    .unwrap()
});

/// Probes spent per search.
pub static PROBES_PER_SEARCH: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "photofinder_probes_per_search",
            "Number of probes issued for a single product code",
        )
        .buckets(vec![1.0, 2.0, 5.0, 10.0, 20.0, 40.0, 80.0, 200.0]),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Batch
// =============================================================================

/// Batch runs by mode and result.
pub static BATCH_TASKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("photofinder_batch_tasks_total", "Total batch runs"),
        &["mode", "result"], // mode: "concurrent", "tracked", "zip"
    )
    .unwrap()
});

// =============================================================================
// Renamer
// =============================================================================

/// Mapping spreadsheet refreshes by result.
pub static MAPPING_REFRESHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "photofinder_mapping_refreshes_total",
            "Total mapping spreadsheet refreshes",
        ),
        &["result"], // "updated", "unchanged", "failed"
    )
    .unwrap()
});

/// All core metrics, for registration by the server.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(PROBES_TOTAL.clone()),
        Box::new(SEARCHES_TOTAL.clone()),
        Box::new(PROBES_PER_SEARCH.clone()),
        Box::new(BATCH_TASKS.clone()),
        Box::new(MAPPING_REFRESHES.clone()),
    ]
}
