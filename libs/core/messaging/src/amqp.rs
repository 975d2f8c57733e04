//! Queue-based publisher on top of AMQP 0.9.1 (RabbitMQ).
//!
//! Each topic maps to a durable, non-exclusive, non-auto-delete queue of the
//! same name. Messages go through the default exchange with the topic as
//! routing key. Publisher confirms are enabled on the channel, so a publish
//! returns only once the broker has acked or nacked the message.

use crate::error::PublishError;
use crate::publisher::{Ack, Publisher};
use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tracing::{debug, info, instrument, warn};

/// Default exchange: routes by queue name.
const DEFAULT_EXCHANGE: &str = "";

const CONTENT_TYPE_JSON: &str = "application/json";

/// AMQP delivery mode 2 survives a broker restart when the queue is durable.
const PERSISTENT: u8 = 2;

/// Options every intake queue is declared with.
pub fn queue_options() -> QueueDeclareOptions {
    QueueDeclareOptions {
        durable: true,
        exclusive: false,
        auto_delete: false,
        ..QueueDeclareOptions::default()
    }
}

/// AMQP publisher holding one connection and one confirm-mode channel.
pub struct AmqpPublisher {
    connection: Connection,
    channel: Channel,
}

impl AmqpPublisher {
    /// Connect to `url` and open a channel with publisher confirms.
    ///
    /// A failure here is fatal for the service.
    pub async fn connect(url: &str) -> Result<Self, PublishError> {
        let connection = Connection::connect(url, ConnectionProperties::default())
            .await
            .map_err(PublishError::connection)?;
        info!("Connected to AMQP broker");

        let channel = connection
            .create_channel()
            .await
            .map_err(PublishError::connection)?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(PublishError::connection)?;
        debug!(channel_id = channel.id(), "AMQP channel opened in confirm mode");

        Ok(Self {
            connection,
            channel,
        })
    }
}

#[async_trait]
impl Publisher for AmqpPublisher {
    #[instrument(skip(self), fields(queue = %topic))]
    async fn declare(&self, topic: &str) -> Result<(), PublishError> {
        let queue = self
            .channel
            .queue_declare(topic, queue_options(), FieldTable::default())
            .await
            .map_err(|e| PublishError::declare(topic, e))?;

        debug!(
            queue = %topic,
            messages = queue.message_count(),
            consumers = queue.consumer_count(),
            "Queue declared"
        );
        Ok(())
    }

    #[instrument(skip(self, body), fields(queue = %topic, bytes = body.len()))]
    async fn publish(&self, topic: &str, body: Vec<u8>) -> Result<Ack, PublishError> {
        let properties = BasicProperties::default()
            .with_content_type(CONTENT_TYPE_JSON.into())
            .with_delivery_mode(PERSISTENT);

        let confirmation = self
            .channel
            .basic_publish(
                DEFAULT_EXCHANGE,
                topic,
                BasicPublishOptions::default(),
                &body,
                properties,
            )
            .await
            .map_err(|e| PublishError::publish(topic, e))?
            .await
            .map_err(|e| PublishError::publish(topic, e))?;

        if confirmation.is_nack() {
            warn!(queue = %topic, "Broker nacked message");
            return Err(PublishError::Rejected {
                topic: topic.to_string(),
            });
        }

        debug!(queue = %topic, "Published to AMQP queue");
        Ok(Ack::confirmed(topic))
    }

    fn is_connected(&self) -> bool {
        self.connection.status().connected() && self.channel.status().connected()
    }

    fn backend(&self) -> &'static str {
        "amqp"
    }

    async fn close(&self) -> Result<(), PublishError> {
        self.channel
            .close(200, "shutdown")
            .await
            .map_err(PublishError::connection)?;
        self.connection
            .close(200, "shutdown")
            .await
            .map_err(PublishError::connection)?;
        info!("AMQP connection closed");
        Ok(())
    }
}
