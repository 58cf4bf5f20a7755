//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Upload attempts (per result, duration)
//! - Scheduler iterations
//! - Remote method and upload server calls

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Upload Metrics
// =============================================================================

/// Upload attempts total by result.
pub static UPLOAD_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("floret_upload_attempts_total", "Total upload attempts"),
        &["result"], // "ok", "upload_failed", "commit_failed"
    )
    .unwrap()
});

/// Upload attempt duration in seconds (payload build through commit).
pub static UPLOAD_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "floret_upload_duration_seconds",
            "Duration of a full upload attempt",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["result"],
    )
    .unwrap()
});

/// Failed upload attempts by stage and error kind.
pub static UPLOAD_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("floret_upload_failures_total", "Failed upload attempts"),
        &["stage", "kind"], // kind: PhotoApiError::kind()
    )
    .unwrap()
});

/// Photos reported as saved by commit calls.
pub static PHOTOS_SAVED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("floret_photos_saved_total", "Total photos saved to the album").unwrap()
});

// =============================================================================
// Scheduler Metrics
// =============================================================================

/// Iterations fully drained.
pub static ITERATIONS_COMPLETED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "floret_iterations_completed_total",
        "Total scheduler iterations completed",
    )
    .unwrap()
});

// =============================================================================
// Remote Service Metrics
// =============================================================================

/// Remote request duration.
pub static REMOTE_CALL_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "floret_remote_call_duration_seconds",
            "Duration of remote service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["operation"],
    )
    .unwrap()
});

/// Remote requests total.
pub static REMOTE_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("floret_remote_calls_total", "Total remote service calls"),
        &["operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Record one remote call.
pub fn record_remote_call(operation: &str, success: bool, seconds: f64) {
    let status = if success { "success" } else { "error" };
    REMOTE_CALLS.with_label_values(&[operation, status]).inc();
    REMOTE_CALL_DURATION
        .with_label_values(&[operation])
        .observe(seconds);
}

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Uploads
        Box::new(UPLOAD_ATTEMPTS.clone()),
        Box::new(UPLOAD_DURATION.clone()),
        Box::new(UPLOAD_FAILURES.clone()),
        Box::new(PHOTOS_SAVED.clone()),
        // Scheduler
        Box::new(ITERATIONS_COMPLETED.clone()),
        // Remote services
        Box::new(REMOTE_CALL_DURATION.clone()),
        Box::new(REMOTE_CALLS.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_remote_call() {
        let before = REMOTE_CALLS
            .with_label_values(&["test.op", "error"])
            .get();
        record_remote_call("test.op", false, 0.2);
        let after = REMOTE_CALLS
            .with_label_values(&["test.op", "error"])
            .get();
        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_all_metrics_registers_cleanly() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
    }
}
