//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Automation cycles (runs, duration)
//! - Detection (items found, server failures)
//! - Search triggering (searches, failures, rate-limit skips)
//! - Library server API calls

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Cycle Metrics
// =============================================================================

/// Cycles run, by trigger and outcome.
pub static CYCLES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("sweeparr_cycles_total", "Total automation cycles run"),
        &["trigger", "result"], // trigger: "scheduled", "manual"; result: "success", "partial_failure"
    )
    .unwrap()
});

/// Cycle duration in seconds.
pub static CYCLE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "sweeparr_cycle_duration_seconds",
            "Duration of a full detect and trigger cycle",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["trigger"],
    )
    .unwrap()
});

// =============================================================================
// Detection Metrics
// =============================================================================

/// Items reported by successful servers, by category.
pub static ITEMS_DETECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sweeparr_items_detected_total",
            "Total wanted items reported by library servers",
        ),
        &["category"],
    )
    .unwrap()
});

/// Servers that failed detection.
pub static DETECTION_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "sweeparr_detection_failures_total",
        "Total per-server detection failures",
    )
    .unwrap()
});

// =============================================================================
// Trigger Metrics
// =============================================================================

/// Items submitted for search, by category.
pub static SEARCHES_TRIGGERED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sweeparr_searches_triggered_total",
            "Total items submitted for search",
        ),
        &["category"],
    )
    .unwrap()
});

/// Failed search commands, by failure kind.
pub static TRIGGER_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sweeparr_trigger_failures_total",
            "Total failed search commands",
        ),
        &["kind"], // "rate_limited", "error"
    )
    .unwrap()
});

/// Servers skipped for the rest of a cycle after repeated rate limiting.
pub static RATE_LIMIT_SKIPS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "sweeparr_rate_limit_skips_total",
        "Total servers skipped after consecutive rate limits",
    )
    .unwrap()
});

// =============================================================================
// Library Server API Metrics
// =============================================================================

/// Library server request duration.
pub static ARR_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "sweeparr_arr_request_duration_seconds",
            "Duration of library server API calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["operation"],
    )
    .unwrap()
});

/// Library server requests total.
pub static ARR_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sweeparr_arr_requests_total",
            "Total library server API calls",
        ),
        &["operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Cycles
        Box::new(CYCLES_TOTAL.clone()),
        Box::new(CYCLE_DURATION.clone()),
        // Detection
        Box::new(ITEMS_DETECTED.clone()),
        Box::new(DETECTION_FAILURES.clone()),
        // Triggers
        Box::new(SEARCHES_TRIGGERED.clone()),
        Box::new(TRIGGER_FAILURES.clone()),
        Box::new(RATE_LIMIT_SKIPS.clone()),
        // Library servers
        Box::new(ARR_REQUEST_DURATION.clone()),
        Box::new(ARR_REQUESTS.clone()),
    ]
}
