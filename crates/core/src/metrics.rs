//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - HTTP gateway (per-provider dispatches)
//! - RSS sync and wanted-search cycles
//! - Download lifecycle (grabs, imports)
//! - Completed-downloads scanner
//! - Scheduler task executions

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Gateway
// =============================================================================

/// Outbound requests by provider and outcome.
pub static GATEWAY_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "magpie_gateway_requests_total",
            "Total outbound HTTP requests",
        ),
        &["provider", "status"], // status: "success", "network", "timeout", "http_error", "rate_limited"
    )
    .unwrap()
});

// =============================================================================
// RSS sync / search
// =============================================================================

/// RSS sync cycles by result.
pub static RSS_CYCLES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("magpie_rss_cycles_total", "Total RSS sync cycles"),
        &["result"], // "completed", "skipped", "empty"
    )
    .unwrap()
});

/// Releases seen per RSS cycle.
pub static RSS_RELEASES: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "magpie_rss_releases",
            "Releases returned per RSS sync cycle",
        )
        .buckets(vec![0.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0]),
        &[],
    )
    .unwrap()
});

// =============================================================================
// Downloads
// =============================================================================

/// Grab attempts by result.
pub static GRABS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("magpie_grabs_total", "Total grab attempts"),
        &["result"], // "success", "rejected", "failed"
    )
    .unwrap()
});

/// Imports by media kind and result.
pub static IMPORTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("magpie_imports_total", "Total import attempts"),
        &["kind", "result"], // kind: "movie", "tv", "music", "book"
    )
    .unwrap()
});

// =============================================================================
// Completed scanner
// =============================================================================

/// Scanner reconciliations by kind.
pub static SCAN_RECONCILED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "magpie_scan_reconciled_total",
            "Completed jobs reconciled by the scanner",
        ),
        &["kind"], // "existing", "stuck", "orphan"
    )
    .unwrap()
});

// =============================================================================
// Scheduler
// =============================================================================

/// Task executions by task type and result.
pub static TASK_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("magpie_task_runs_total", "Total scheduled task executions"),
        &["task", "result"], // result: "success", "error", "skipped"
    )
    .unwrap()
});

/// Task execution duration in seconds.
pub static TASK_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "magpie_task_duration_seconds",
            "Duration of scheduled task executions",
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0]),
        &["task"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(GATEWAY_REQUESTS.clone()),
        Box::new(RSS_CYCLES.clone()),
        Box::new(RSS_RELEASES.clone()),
        Box::new(GRABS.clone()),
        Box::new(IMPORTS.clone()),
        Box::new(SCAN_RECONCILED.clone()),
        Box::new(TASK_RUNS.clone()),
        Box::new(TASK_DURATION.clone()),
    ]
}
