//! Broker publishing abstraction for the event intake pipeline.
//!
//! Every broker is reached through the same narrow capability,
//! [`Publisher::publish`]`(topic, bytes)`. Brokers that need destinations to
//! exist before publishing (AMQP queues) implement [`Publisher::declare`];
//! subject-based brokers (NATS) keep the default no-op.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────────────────────────┐
//! │  Intake Service │     │              Backends                │
//! │                 │     │                                      │
//! │  publish(topic, │     │  ┌──────────────┐  ┌──────────────┐  │
//! │          bytes) │─────│─▶│ AmqpPublisher│  │ NatsPublisher│  │
//! │                 │     │  │ (declaring)  │  │ (direct)     │  │
//! │                 │     │  └──────────────┘  └──────────────┘  │
//! │                 │     │  ┌──────────────────────────────┐    │
//! │                 │     │  │ InMemoryPublisher (tests/dev)│    │
//! │                 │     │  └──────────────────────────────┘    │
//! └─────────────────┘     └──────────────────────────────────────┘
//! ```
//!
//! # Features
//!
//! - `amqp`: [`amqp::AmqpPublisher`] on top of `lapin`
//! - `nats`: [`nats::NatsPublisher`] on top of `async-nats`
//!
//! # Example
//!
//! ```rust,ignore
//! use messaging::{declare_all, Publisher};
//! use messaging::amqp::AmqpPublisher;
//!
//! let publisher = AmqpPublisher::connect("amqp://localhost:5672/%2f").await?;
//! declare_all(&publisher, ["display", "click", "view"]).await?;
//!
//! let ack = publisher.publish("click", br#"{"foo":"bar"}"#.to_vec()).await?;
//! assert!(ack.confirmed);
//! ```

mod error;
mod memory;
mod publisher;

#[cfg(feature = "amqp")]
pub mod amqp;

#[cfg(feature = "nats")]
pub mod nats;

pub use error::{ErrorCategory, PublishError};
pub use memory::{FailingPublisher, InMemoryPublisher, PublishedMessage};
pub use publisher::{declare_all, Ack, Publisher};
