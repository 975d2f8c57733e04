//! Intake service layer
//!
//! Runs one request through the pipeline:
//!
//! ```text
//! Received -> TypeValidated -> Decoded -> Enriched -> EnvelopeBuilt -> Published
//! ```
//!
//! Any failing step ends the request with an [`IntakeError`] naming that step.
//! Nothing is retried.

use crate::envelope::{EventEnvelope, EventPayload};
use crate::error::{IntakeError, Result};
use crate::registry::{EventType, EventTypeRegistry};
use crate::user_agent;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use messaging::{Ack, PublishError, Publisher, declare_all};
use observability::{ErrorReport, ErrorReporter, IntakeMetrics};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Everything the pipeline needs from one HTTP request
#[derive(Debug, Clone)]
pub struct IntakeRequest {
    /// Raw path segment, not yet validated
    pub event_type: String,
    pub body: Bytes,
    pub user_agent: String,
    pub client_ip: String,
    pub received_at: DateTime<Utc>,
}

/// Intake service shared by all requests
pub struct IntakeService {
    registry: Arc<EventTypeRegistry>,
    publisher: Arc<dyn Publisher>,
    reporter: Arc<dyn ErrorReporter>,
    publish_timeout: Duration,
}

impl IntakeService {
    pub fn new(
        registry: Arc<EventTypeRegistry>,
        publisher: Arc<dyn Publisher>,
        reporter: Arc<dyn ErrorReporter>,
        publish_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            publisher,
            reporter,
            publish_timeout,
        }
    }

    pub fn registry(&self) -> &EventTypeRegistry {
        &self.registry
    }

    pub fn backend(&self) -> &'static str {
        self.publisher.backend()
    }

    /// Whether the broker connection is usable
    pub fn is_ready(&self) -> bool {
        self.publisher.is_connected()
    }

    /// Declare one broker destination per registered event type.
    ///
    /// Startup only; requests never declare.
    #[instrument(skip(self), fields(backend = self.publisher.backend()))]
    pub async fn declare_topics(&self) -> std::result::Result<(), PublishError> {
        declare_all(self.publisher.as_ref(), self.registry.iter()).await?;
        info!(topics = self.registry.len(), "Broker topics declared");
        Ok(())
    }

    /// Check a raw path segment against the registry.
    ///
    /// Runs before the request body is read.
    pub fn validate(&self, event_type: &str) -> Result<EventType> {
        self.registry.resolve(event_type).ok_or_else(|| {
            debug!(event_type, "Unknown event type");
            self.reject(IntakeError::TypeNotFound(event_type.to_string()))
        })
    }

    /// Validate, decode, enrich and publish one event.
    #[instrument(
        skip(self, request),
        fields(event_type = %request.event_type, client_ip = %request.client_ip)
    )]
    pub async fn ingest(&self, request: IntakeRequest) -> Result<Ack> {
        let event_type = self.validate(&request.event_type)?;
        IntakeMetrics::event_received(event_type.as_str());

        let payload = EventPayload::from_slice(&request.body)
            .map_err(|e| self.reject(IntakeError::BadParameters(e)))?;

        let user_agent = user_agent::enrich(&request.user_agent);
        let envelope =
            EventEnvelope::build(payload, user_agent, request.received_at, request.client_ip);

        let body = envelope
            .to_json()
            .map_err(|e| self.fail(IntakeError::Encoding(e), event_type.as_str()))?;

        let topic = event_type.topic();
        let started = Instant::now();
        let publish = self.publisher.publish(topic, body);
        let outcome = tokio::time::timeout(self.publish_timeout, publish)
            .await
            .unwrap_or_else(|_| {
                Err(PublishError::timeout(
                    topic,
                    self.publish_timeout.as_millis() as u64,
                ))
            });

        match outcome {
            Ok(ack) => {
                IntakeMetrics::event_published(topic, self.backend(), started.elapsed());
                info!(topic, confirmed = ack.confirmed, "Event published");
                Ok(ack)
            }
            Err(source) => {
                IntakeMetrics::publish_failed(topic, self.backend(), source.category().as_str());
                let error = IntakeError::PublishFailed {
                    topic: topic.to_string(),
                    source,
                };
                Err(self.fail(error, topic))
            }
        }
    }

    /// Client errors: counted, never reported.
    fn reject(&self, error: IntakeError) -> IntakeError {
        IntakeMetrics::event_rejected(error.reason());
        debug!(stage = error.stage().as_str(), "Request rejected: {}", error);
        error
    }

    /// System faults: counted, logged and sent to the reporter.
    fn fail(&self, error: IntakeError, event_type: &str) -> IntakeError {
        IntakeMetrics::event_rejected(error.reason());
        warn!(stage = error.stage().as_str(), error = %error, "Intake failed");

        let mut report = ErrorReport::error(error.to_string())
            .with_tag("stage", error.stage().as_str())
            .with_tag("event_type", event_type)
            .with_tag("backend", self.backend());
        if let IntakeError::PublishFailed { source, .. } = &error {
            report = report.with_tag("category", source.category().as_str());
        }
        self.reporter.report(report);

        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use messaging::{FailingPublisher, InMemoryPublisher};
    use mockall::mock;
    use observability::RecordingReporter;

    mock! {
        pub Publisher {}

        #[async_trait]
        impl Publisher for Publisher {
            async fn declare(&self, topic: &str) -> std::result::Result<(), PublishError>;
            async fn publish(&self, topic: &str, body: Vec<u8>) -> std::result::Result<Ack, PublishError>;
            fn is_connected(&self) -> bool;
            fn backend(&self) -> &'static str;
            async fn close(&self) -> std::result::Result<(), PublishError>;
        }
    }

    struct SlowPublisher;

    #[async_trait]
    impl Publisher for SlowPublisher {
        async fn publish(&self, topic: &str, _body: Vec<u8>) -> std::result::Result<Ack, PublishError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Ack::unconfirmed(topic))
        }

        fn is_connected(&self) -> bool {
            true
        }

        fn backend(&self) -> &'static str {
            "slow"
        }
    }

    fn service_with(
        publisher: Arc<dyn Publisher>,
        reporter: RecordingReporter,
        timeout: Duration,
    ) -> IntakeService {
        IntakeService::new(
            Arc::new(EventTypeRegistry::default()),
            publisher,
            Arc::new(reporter),
            timeout,
        )
    }

    fn request(event_type: &str, body: &'static [u8]) -> IntakeRequest {
        IntakeRequest {
            event_type: event_type.to_string(),
            body: Bytes::from_static(body),
            user_agent: "Mozilla/5.0 (iPhone)".to_string(),
            client_ip: "203.0.113.7".to_string(),
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publishes_envelope_to_event_type_topic() {
        let publisher = InMemoryPublisher::new();
        let reporter = RecordingReporter::new();
        let service = service_with(Arc::new(publisher.clone()), reporter.clone(), Duration::from_secs(1));

        let ack = service.ingest(request("click", br#"{"foo":"bar"}"#)).await.unwrap();
        assert_eq!(ack.topic, "click");

        let published = publisher.published_to("click");
        assert_eq!(published.len(), 1);

        let envelope = EventEnvelope::from_json(&published[0].body).unwrap();
        assert_eq!(envelope.payload.get("foo"), Some(&serde_json::json!("bar")));
        assert!(envelope.enrichment.mobile);
        assert_eq!(envelope.enrichment.platform, "iPhone");
        assert_eq!(envelope.enrichment.ip, "203.0.113.7");
        assert!(reporter.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_type_never_reaches_publisher() {
        let mut mock = MockPublisher::new();
        mock.expect_publish().times(0);
        mock.expect_backend().return_const("mock");
        let reporter = RecordingReporter::new();
        let service = service_with(Arc::new(mock), reporter.clone(), Duration::from_secs(1));

        // Body is invalid too: type validation must come first.
        let err = service.ingest(request("purchase", b"not json")).await.unwrap_err();

        assert!(matches!(err, IntakeError::TypeNotFound(ref t) if t == "purchase"));
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_validate_checks_registry_only() {
        let mut mock = MockPublisher::new();
        mock.expect_publish().times(0);
        mock.expect_backend().return_const("mock");
        let reporter = RecordingReporter::new();
        let service = service_with(Arc::new(mock), reporter.clone(), Duration::from_secs(1));

        assert_eq!(service.validate("click").unwrap().as_str(), "click");
        assert!(matches!(
            service.validate("Click"),
            Err(IntakeError::TypeNotFound(ref t)) if t == "Click"
        ));
        assert!(reporter.is_empty());
    }

    #[tokio::test]
    async fn test_bad_body_is_rejected_before_publish() {
        let mut mock = MockPublisher::new();
        mock.expect_publish().times(0);
        mock.expect_backend().return_const("mock");
        let reporter = RecordingReporter::new();
        let service = service_with(Arc::new(mock), reporter.clone(), Duration::from_secs(1));

        let bodies: [&[u8]; 3] = [b"", b"[1,2,3]", b"{\"foo\":"];
        for body in bodies {
            let req = IntakeRequest {
                body: Bytes::copy_from_slice(body),
                ..request("view", b"")
            };
            let err = service.ingest(req).await.unwrap_err();
            assert!(matches!(err, IntakeError::BadParameters(_)));
        }
        assert!(reporter.is_empty());
    }

    #[tokio::test]
    async fn test_publish_failure_is_reported() {
        let reporter = RecordingReporter::new();
        let service = service_with(
            Arc::new(FailingPublisher::new("connection reset")),
            reporter.clone(),
            Duration::from_secs(1),
        );

        let err = service.ingest(request("display", b"{}")).await.unwrap_err();
        assert!(matches!(err, IntakeError::PublishFailed { ref topic, .. } if topic == "display"));

        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].tag("stage"), Some("publishing"));
        assert_eq!(reports[0].tag("event_type"), Some("display"));
        assert_eq!(reports[0].tag("backend"), Some("failing"));
        assert_eq!(reports[0].tag("category"), Some("transient"));
    }

    #[tokio::test]
    async fn test_publish_timeout_is_bounded() {
        let reporter = RecordingReporter::new();
        let service = service_with(Arc::new(SlowPublisher), reporter.clone(), Duration::from_millis(20));

        let started = Instant::now();
        let err = service.ingest(request("click", b"{}")).await.unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(matches!(
            err,
            IntakeError::PublishFailed {
                source: PublishError::Timeout { timeout_ms: 20, .. },
                ..
            }
        ));
        assert_eq!(reporter.len(), 1);
    }

    #[tokio::test]
    async fn test_declare_topics_once_per_registry_member() {
        let publisher = InMemoryPublisher::declaring();
        let service = service_with(
            Arc::new(publisher.clone()),
            RecordingReporter::new(),
            Duration::from_secs(1),
        );

        service.declare_topics().await.unwrap();
        service.ingest(request("view", b"{}")).await.unwrap();
        service.ingest(request("view", b"{}")).await.unwrap();

        let mut declared = publisher.declared_topics();
        declared.sort();
        assert_eq!(declared, vec!["click", "display", "view"]);
        assert_eq!(publisher.declare_calls(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_publisher() {
        let publisher = InMemoryPublisher::new();
        let service = Arc::new(service_with(
            Arc::new(publisher.clone()),
            RecordingReporter::new(),
            Duration::from_secs(1),
        ));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.ingest(request("click", b"{\"n\":1}")).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(publisher.published_to("click").len(), 16);
    }

    #[test]
    fn test_readiness_follows_publisher() {
        let service = service_with(
            Arc::new(FailingPublisher::disconnected("down")),
            RecordingReporter::new(),
            Duration::from_secs(1),
        );
        assert!(!service.is_ready());
        assert_eq!(service.backend(), "failing");
    }
}
