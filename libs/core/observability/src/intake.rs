//! Intake pipeline metrics.

use metrics::{counter, histogram};
use std::time::Duration;

/// Intake metrics recorder
pub struct IntakeMetrics;

impl IntakeMetrics {
    /// Record an event whose type passed registry validation
    pub fn event_received(event_type: &str) {
        counter!("intake_events_received_total", "event_type" => event_type.to_string())
            .increment(1);
    }

    /// Record a request rejected before publishing (`type_not_found`, `bad_parameters`, ...)
    pub fn event_rejected(reason: &'static str) {
        counter!("intake_events_rejected_total", "reason" => reason).increment(1);
    }

    /// Record a successful publish and how long the broker took
    pub fn event_published(event_type: &str, backend: &'static str, duration: Duration) {
        counter!(
            "intake_events_published_total",
            "event_type" => event_type.to_string(),
            "backend" => backend
        )
        .increment(1);

        histogram!("intake_publish_duration_seconds", "backend" => backend)
            .record(duration.as_secs_f64());
    }

    /// Record a failed publish
    pub fn publish_failed(event_type: &str, backend: &'static str, category: &'static str) {
        counter!(
            "intake_publish_failures_total",
            "event_type" => event_type.to_string(),
            "backend" => backend,
            "category" => category
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        IntakeMetrics::event_received("click");
        IntakeMetrics::event_rejected("type_not_found");
        IntakeMetrics::event_published("click", "memory", Duration::from_millis(3));
        IntakeMetrics::publish_failed("click", "memory", "transient");
    }
}
