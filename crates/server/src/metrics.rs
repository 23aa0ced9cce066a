//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the Broadsheet server:
//! - HTTP request metrics (latency, counts)
//! - Upload and run bookkeeping
//! - Core metrics (segmentation, transforms, runs), registered from the core crate

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use regex_lite::Regex;

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
            "broadsheet_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("broadsheet_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "broadsheet_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Run Metrics
// =============================================================================

/// Accepted uploads.
pub static UPLOADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("broadsheet_uploads_total", "Uploaded documents by run kind"),
        &["kind"],
    )
    .unwrap()
});

/// Rejected uploads.
pub static UPLOADS_REJECTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "broadsheet_uploads_rejected_total",
        "Uploads rejected before a run was started",
    )
    .unwrap()
});

/// Runs currently held in the registry (collected dynamically).
pub static RUNS_TRACKED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "broadsheet_runs_tracked",
        "Runs currently held in the status registry",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    let server: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(HTTP_REQUEST_DURATION.clone()),
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()),
        Box::new(UPLOADS_TOTAL.clone()),
        Box::new(UPLOADS_REJECTED.clone()),
        Box::new(RUNS_TRACKED.clone()),
    ];

    // Core metrics (segmentation, transforms, runs)
    for metric in server.into_iter().chain(broadsheet_core::metrics::all_metrics()) {
        if let Err(e) = registry.register(metric) {
            tracing::warn!(error = %e, "Failed to register metric");
        }
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
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    RUNS_TRACKED.set(state.runs().len().await as i64);
}

static UUID_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});

/// Normalize a path for metric labels (replace run ids with placeholders).
pub fn normalize_path(path: &str) -> String {
    let path = UUID_SEGMENT.replace_all(path, "{id}");
    match path.strip_prefix("/api/v1/runs/") {
        // Ids that are not UUIDs still collapse to one label.
        Some(rest) if !rest.starts_with("{id}") => {
            let tail = rest.split_once('/').map(|(_, t)| t);
            match tail {
                Some(t) => format!("/api/v1/runs/{{id}}/{t}"),
                None => "/api/v1/runs/{id}".to_string(),
            }
        }
        _ => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/v1/runs/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(normalize_path(path), "/api/v1/runs/{id}");
    }

    #[test]
    fn test_normalize_path_document() {
        let path = "/api/v1/runs/550e8400-e29b-41d4-a716-446655440000/document";
        assert_eq!(normalize_path(path), "/api/v1/runs/{id}/document");
        assert_eq!(normalize_path("/api/v1/runs/bogus/document"), "/api/v1/runs/{id}/document");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(normalize_path("/api/v1/health"), "/api/v1/health");
        assert_eq!(normalize_path("/api/v1/runs"), "/api/v1/runs");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics().unwrap();
        assert!(output.contains("broadsheet_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_core_metrics() {
        broadsheet_core::metrics::RUNS_TOTAL
            .with_label_values(&["completed"])
            .inc_by(0);
        broadsheet_core::metrics::LLM_RETRIES.inc_by(0);
        RUNS_TRACKED.set(0);

        let output = encode_metrics().unwrap();
        assert!(output.contains("broadsheet_runs_total"));
        assert!(output.contains("broadsheet_llm_retries_total"));
        assert!(output.contains("broadsheet_runs_tracked"));
    }
}
