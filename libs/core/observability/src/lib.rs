//! Observability utilities for the event intake service.
//!
//! This crate provides:
//! - Prometheus metrics recording and export
//! - Intake pipeline counters ([`IntakeMetrics`])
//! - Axum middleware for automatic request metrics
//! - The error-reporting sink ([`ErrorReporter`]) for system faults
//!
//! # Example
//!
//! ```rust,ignore
//! use observability::{init_metrics, metrics_handler, IntakeMetrics};
//!
//! init_metrics()?;
//!
//! IntakeMetrics::event_received("click");
//!
//! let app = Router::new()
//!     .route("/metrics", get(metrics_handler));
//! ```

pub mod intake;
pub mod middleware;
pub mod reporting;

pub use intake::IntakeMetrics;
pub use middleware::metrics_middleware;
pub use reporting::{
    ErrorReport, ErrorReporter, RecordingReporter, ReportLevel, TracingReporter, WebhookOptions,
    WebhookReporter,
};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize the Prometheus metrics recorder.
///
/// Call once at application startup; later calls return the same handle.
pub fn init_metrics() -> Result<&'static PrometheusHandle, BuildError> {
    METRICS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;

        info!("Prometheus metrics recorder initialized");

        register_metric_descriptions();

        Ok(handle)
    })
}

/// Get the metrics handle (must call init_metrics first)
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Axum handler for /metrics endpoint
pub async fn metrics_handler() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

/// Register metric descriptions for documentation
fn register_metric_descriptions() {
    use metrics::describe_counter;
    use metrics::describe_histogram;

    // HTTP metrics
    describe_counter!("http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "http_requests_errors_total",
        "Total number of HTTP request errors"
    );

    // Intake metrics
    describe_counter!(
        "intake_events_received_total",
        "Events that passed event type validation, by event type"
    );
    describe_counter!(
        "intake_events_rejected_total",
        "Events rejected before publishing, by reason"
    );
    describe_counter!(
        "intake_events_published_total",
        "Envelopes handed to the broker, by event type and backend"
    );
    describe_counter!(
        "intake_publish_failures_total",
        "Failed publishes, by event type, backend and error category"
    );
    describe_histogram!(
        "intake_publish_duration_seconds",
        "Time spent waiting for the broker publish call"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_handler_renders() {
        // Either the placeholder (no recorder yet) or a Prometheus exposition.
        let body = metrics_handler().await;
        assert!(body.starts_with('#') || body.is_empty() || body.contains("_total"));
    }

    #[test]
    fn test_init_metrics_is_idempotent() {
        let first = init_metrics().map(|h| h as *const PrometheusHandle);
        let second = init_metrics().map(|h| h as *const PrometheusHandle);
        if let (Ok(a), Ok(b)) = (first, second) {
            assert_eq!(a, b);
        }
    }
}
