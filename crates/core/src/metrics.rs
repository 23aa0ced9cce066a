//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Segmentation (section outcomes)
//! - Article transforms (results, durations, retries, content-risk fallbacks)
//! - Runs (outcomes, in-flight gate usage)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Segmentation
// =============================================================================

/// Sections seen by the segmenter, by outcome.
pub static SECTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "broadsheet_sections_total",
            "Document sections processed by the segmenter",
        ),
        &["outcome"], // "kept", "short", "untitled", "marker", "follow_on", "letters", "noise"
    )
    .unwrap()
});

// =============================================================================
// Transforms
// =============================================================================

/// Article transforms by kind and result.
pub static TRANSFORMS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("broadsheet_transforms_total", "Total article transforms"),
        &["kind", "result"], // result: "success", "failed"
    )
    .unwrap()
});

/// Transform duration in seconds.
pub static TRANSFORM_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "broadsheet_transform_duration_seconds",
            "Duration of a single article transform including retries",
        )
        .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        &["kind"],
    )
    .unwrap()
});

/// Retries after transient LLM failures.
pub static LLM_RETRIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "broadsheet_llm_retries_total",
        "LLM requests retried after a transient failure",
    )
    .unwrap()
});

/// Requests re-sent with shorter content after a content-policy rejection.
pub static CONTENT_RISK_FALLBACKS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "broadsheet_content_risk_fallbacks_total",
        "Requests retried with truncated content after a content-policy rejection",
    )
    .unwrap()
});

// =============================================================================
// Runs
// =============================================================================

/// Finished runs by outcome.
pub static RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("broadsheet_runs_total", "Total finished runs"),
        &["outcome"], // "completed", "error"
    )
    .unwrap()
});

/// Transforms currently holding a concurrency permit.
pub static IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "broadsheet_in_flight_transforms",
        "Transforms currently holding a concurrency permit",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(SECTIONS_TOTAL.clone()),
        Box::new(TRANSFORMS_TOTAL.clone()),
        Box::new(TRANSFORM_DURATION.clone()),
        Box::new(LLM_RETRIES.clone()),
        Box::new(CONTENT_RISK_FALLBACKS.clone()),
        Box::new(RUNS_TOTAL.clone()),
        Box::new(IN_FLIGHT.clone()),
    ]
}
