//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the sweeparr server:
//! - HTTP request metrics (latency, counts)
//! - Scheduler and server configuration status (collected on scrape)
//!
//! Cycle, detection and search metrics live in `sweeparr_core::metrics` and
//! are registered into the same registry.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use regex_lite::Regex;
use sweeparr_core::SettingsProvider;

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
            "sweeparr_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 60.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("sweeparr_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "sweeparr_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Scheduler Metrics (collected dynamically)
// =============================================================================

/// Scheduler timer state (1 = running, 0 = stopped).
pub static SCHEDULER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "sweeparr_scheduler_running",
        "Whether the cycle scheduler is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Whether a cycle is in progress.
pub static CYCLE_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "sweeparr_cycle_active",
        "Whether an automation cycle is currently running",
    )
    .unwrap()
});

/// Configured interval between scheduled cycles.
pub static CYCLE_INTERVAL_SECONDS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "sweeparr_cycle_interval_seconds",
        "Configured interval between scheduled cycles",
    )
    .unwrap()
});

/// Library servers taking part in cycles.
pub static SERVERS_ENABLED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "sweeparr_servers_enabled",
        "Number of enabled library servers",
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

    // Scheduler
    registry
        .register(Box::new(SCHEDULER_RUNNING.clone()))
        .unwrap();
    registry.register(Box::new(CYCLE_ACTIVE.clone())).unwrap();
    registry
        .register(Box::new(CYCLE_INTERVAL_SECONDS.clone()))
        .unwrap();
    registry
        .register(Box::new(SERVERS_ENABLED.clone()))
        .unwrap();

    // Core metrics (cycles, detection, searches, library server calls)
    for metric in sweeparr_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the gauges reflect the scheduler and settings
/// at scrape time.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let status = state.scheduler().status();
    SCHEDULER_RUNNING.set(i64::from(status.running));
    CYCLE_ACTIVE.set(i64::from(status.cycle_active));
    CYCLE_INTERVAL_SECONDS.set(status.interval_secs as i64);
    SERVERS_ENABLED.set(state.settings().enabled_servers().len() as i64);
}

static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});

static SERVER_NAME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"/servers/[^/]+").unwrap());

/// Normalize a path for metric labels (replace IDs and server names with
/// placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = UUID_REGEX.replace_all(path, "{id}");
    let result = SERVER_NAME_REGEX.replace_all(&result, "/servers/{name}");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/v1/cycles/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(normalize_path(path), "/api/v1/cycles/{id}");
    }

    #[test]
    fn test_normalize_path_server_name() {
        assert_eq!(
            normalize_path("/api/v1/servers/radarr-4k/test"),
            "/api/v1/servers/{name}/test"
        );
        assert_eq!(
            normalize_path("/api/v1/servers/sonarr"),
            "/api/v1/servers/{name}"
        );
    }

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(normalize_path("/api/v1/health"), "/api/v1/health");
        assert_eq!(normalize_path("/api/v1/servers"), "/api/v1/servers");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics().unwrap();
        assert!(output.contains("sweeparr_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_core_and_server_metrics() {
        HTTP_REQUEST_DURATION
            .with_label_values(&["GET", "/test", "200"])
            .observe(0.1);
        SCHEDULER_RUNNING.set(0);
        CYCLE_ACTIVE.set(0);
        SERVERS_ENABLED.set(2);
        sweeparr_core::metrics::CYCLES_TOTAL
            .with_label_values(&["manual", "success"])
            .inc();
        sweeparr_core::metrics::RATE_LIMIT_SKIPS.inc();

        let output = encode_metrics().unwrap();

        assert!(output.contains("sweeparr_http_request_duration_seconds"));
        assert!(output.contains("sweeparr_scheduler_running"));
        assert!(output.contains("sweeparr_cycle_active"));
        assert!(output.contains("sweeparr_servers_enabled 2"));
        assert!(output.contains("sweeparr_cycles_total"));
        assert!(output.contains("sweeparr_rate_limit_skips_total"));
    }
}
