//! In-process publishers for tests and local runs.

use crate::error::PublishError;
use crate::publisher::{Ack, Publisher};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// A message captured by [`InMemoryPublisher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub body: Vec<u8>,
}

impl PublishedMessage {
    /// Body as UTF-8, if valid.
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

#[derive(Default)]
struct State {
    declared: HashSet<String>,
    declare_calls: usize,
    published: Vec<PublishedMessage>,
}

/// Publisher that keeps every message in memory.
///
/// In declaring mode it behaves like a queue broker: publishing to a topic
/// that was never declared fails with [`PublishError::UndeclaredTopic`].
/// Clones share the same buffer.
#[derive(Clone, Default)]
pub struct InMemoryPublisher {
    state: Arc<Mutex<State>>,
    require_declaration: bool,
}

impl InMemoryPublisher {
    /// Subject-style publisher: any topic is accepted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue-style publisher: topics must be declared first.
    pub fn declaring() -> Self {
        Self {
            require_declaration: true,
            ..Self::default()
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock cannot leave State half-written.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// All messages published so far, in order.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.state().published.clone()
    }

    /// Messages published to `topic`, in order.
    pub fn published_to(&self, topic: &str) -> Vec<PublishedMessage> {
        self.state()
            .published
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    /// Distinct declared topics (unordered).
    pub fn declared_topics(&self) -> Vec<String> {
        self.state().declared.iter().cloned().collect()
    }

    /// Number of `declare` calls, including repeats.
    pub fn declare_calls(&self) -> usize {
        self.state().declare_calls
    }
}

#[async_trait]
impl Publisher for InMemoryPublisher {
    async fn declare(&self, topic: &str) -> Result<(), PublishError> {
        let mut state = self.state();
        state.declare_calls += 1;
        state.declared.insert(topic.to_string());
        Ok(())
    }

    async fn publish(&self, topic: &str, body: Vec<u8>) -> Result<Ack, PublishError> {
        let mut state = self.state();
        if self.require_declaration && !state.declared.contains(topic) {
            return Err(PublishError::UndeclaredTopic(topic.to_string()));
        }
        state.published.push(PublishedMessage {
            topic: topic.to_string(),
            body,
        });

        if self.require_declaration {
            Ok(Ack::confirmed(topic))
        } else {
            Ok(Ack::unconfirmed(topic))
        }
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// A publisher whose every publish fails (for testing).
#[derive(Debug, Clone)]
pub struct FailingPublisher {
    error_message: String,
    connected: bool,
}

impl FailingPublisher {
    /// Connected publisher whose publishes fail with a transient error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error_message: message.into(),
            connected: true,
        }
    }

    /// Publisher that also reports a lost connection.
    pub fn disconnected(message: impl Into<String>) -> Self {
        Self {
            error_message: message.into(),
            connected: false,
        }
    }
}

#[async_trait]
impl Publisher for FailingPublisher {
    async fn publish(&self, topic: &str, _body: Vec<u8>) -> Result<Ack, PublishError> {
        Err(PublishError::publish(topic, &self.error_message))
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn backend(&self) -> &'static str {
        "failing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[tokio::test]
    async fn test_in_memory_records_messages() {
        let publisher = InMemoryPublisher::new();
        publisher.publish("click", b"{}".to_vec()).await.unwrap();
        publisher.publish("view", b"[]".to_vec()).await.unwrap();

        assert_eq!(publisher.published().len(), 2);
        let clicks = publisher.published_to("click");
        assert_eq!(clicks.len(), 1);
        assert_eq!(clicks[0].body_str(), Some("{}"));
    }

    #[tokio::test]
    async fn test_declaring_rejects_undeclared_topic() {
        let publisher = InMemoryPublisher::declaring();
        let err = publisher.publish("click", b"{}".to_vec()).await.unwrap_err();
        assert!(matches!(err, PublishError::UndeclaredTopic(ref t) if t == "click"));
        assert!(publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_declare_is_idempotent() {
        let publisher = InMemoryPublisher::declaring();
        publisher.declare("click").await.unwrap();
        publisher.declare("click").await.unwrap();

        assert_eq!(publisher.declare_calls(), 2);
        assert_eq!(publisher.declared_topics(), vec!["click".to_string()]);

        let ack = publisher.publish("click", b"{}".to_vec()).await.unwrap();
        assert_eq!(ack, Ack::confirmed("click"));
        assert_eq!(publisher.published_to("click").len(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_buffer() {
        let publisher = InMemoryPublisher::new();
        let clone = publisher.clone();
        clone.publish("display", b"{}".to_vec()).await.unwrap();
        assert_eq!(publisher.published().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_publisher() {
        let publisher = FailingPublisher::new("broker unavailable");
        let err = publisher.publish("click", b"{}".to_vec()).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Transient);
        assert!(err.to_string().contains("broker unavailable"));
        assert!(publisher.is_connected());
        assert!(!FailingPublisher::disconnected("gone").is_connected());
    }
}
