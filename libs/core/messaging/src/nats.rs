//! Subject-based publisher on top of NATS core.
//!
//! There is no declaration step: a subject exists as soon as something is
//! published to it. Publishes are handed to the client's write buffer and
//! are not individually confirmed by the server.

use crate::error::PublishError;
use crate::publisher::{Ack, Publisher};
use async_nats::connection::State;
use async_nats::Client;
use async_trait::async_trait;
use tracing::{debug, info, instrument};

/// NATS publisher sharing one client across all requests.
#[derive(Clone)]
pub struct NatsPublisher {
    client: Client,
}

impl NatsPublisher {
    /// Wrap an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect to `url`. A failure here is fatal for the service.
    pub async fn connect(url: &str) -> Result<Self, PublishError> {
        let client = async_nats::connect(url)
            .await
            .map_err(PublishError::connection)?;
        info!("Connected to NATS");
        Ok(Self::new(client))
    }

    /// Get the underlying client.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Publisher for NatsPublisher {
    #[instrument(skip(self, body), fields(subject = %topic, bytes = body.len()))]
    async fn publish(&self, topic: &str, body: Vec<u8>) -> Result<Ack, PublishError> {
        self.client
            .publish(topic.to_string(), body.into())
            .await
            .map_err(|e| PublishError::publish(topic, e))?;

        debug!(subject = %topic, "Published to NATS subject");
        Ok(Ack::unconfirmed(topic))
    }

    fn is_connected(&self) -> bool {
        matches!(self.client.connection_state(), State::Connected)
    }

    fn backend(&self) -> &'static str {
        "nats"
    }

    async fn close(&self) -> Result<(), PublishError> {
        self.client
            .flush()
            .await
            .map_err(PublishError::connection)?;
        info!("NATS client flushed");
        Ok(())
    }
}
