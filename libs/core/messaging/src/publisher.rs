//! Publisher trait shared by every broker backend.

use crate::error::PublishError;
use async_trait::async_trait;

/// Broker acknowledgement for a single publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// Destination the message was sent to
    pub topic: String,

    /// `true` when the broker explicitly confirmed the message
    /// (AMQP publisher confirms). Fire-and-forget backends report `false`.
    pub confirmed: bool,
}

impl Ack {
    pub fn confirmed(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            confirmed: true,
        }
    }

    pub fn unconfirmed(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            confirmed: false,
        }
    }
}

/// Capability to hand a serialized message to a broker destination.
///
/// Implementations are shared across all concurrent requests, so they must
/// be `Send + Sync` and must not hold locks across the broker call beyond
/// what the underlying client requires.
///
/// # Example
///
/// ```rust,ignore
/// use messaging::{Ack, Publisher, PublishError};
/// use async_trait::async_trait;
///
/// struct StdoutPublisher;
///
/// #[async_trait]
/// impl Publisher for StdoutPublisher {
///     async fn publish(&self, topic: &str, body: Vec<u8>) -> Result<Ack, PublishError> {
///         println!("{topic}: {}", String::from_utf8_lossy(&body));
///         Ok(Ack::unconfirmed(topic))
///     }
///
///     fn is_connected(&self) -> bool { true }
///
///     fn backend(&self) -> &'static str { "stdout" }
/// }
/// ```
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Ensure `topic` exists on the broker.
    ///
    /// Must be idempotent. Called once per topic during startup, never per
    /// request. The default is a no-op for brokers without a declaration step.
    async fn declare(&self, topic: &str) -> Result<(), PublishError> {
        let _ = topic;
        Ok(())
    }

    /// Send `body` to `topic` and wait for the broker's answer.
    async fn publish(&self, topic: &str, body: Vec<u8>) -> Result<Ack, PublishError>;

    /// Whether the underlying connection is currently usable.
    fn is_connected(&self) -> bool;

    /// Short backend label for logs and metrics (e.g. "amqp", "nats").
    fn backend(&self) -> &'static str;

    /// Flush and release broker resources. Called once on shutdown.
    async fn close(&self) -> Result<(), PublishError> {
        Ok(())
    }
}

/// Declare every topic in `topics`, stopping at the first failure.
pub async fn declare_all<'a, P, I>(publisher: &P, topics: I) -> Result<(), PublishError>
where
    P: Publisher + ?Sized,
    I: IntoIterator<Item = &'a str>,
{
    for topic in topics {
        publisher.declare(topic).await?;
        tracing::debug!(topic = %topic, backend = publisher.backend(), "Topic declared");
    }
    Ok(())
}
