//! Shared test utilities for broker integration testing
//!
//! This crate provides disposable broker containers:
//! - `TestNats`: NATS server with automatic cleanup (feature: "nats")
//! - `TestRabbitMq`: RabbitMQ server with automatic cleanup (feature: "rabbitmq")
//!
//! Both need a running Docker daemon. Tests using them are usually marked
//! `#[ignore]` so the default `cargo test` run stays hermetic.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { workspace = true, features = ["nats", "rabbitmq"] }
//! ```
//!
//! ```rust,ignore
//! use test_utils::{TestNats, TestRabbitMq};
//!
//! #[tokio::test]
//! #[ignore = "requires Docker"]
//! async fn my_broker_test() {
//!     let nats = TestNats::new().await;
//!     let rabbit = TestRabbitMq::new().await;
//!
//!     let url = rabbit.connection_string();
//! }
//! ```

#[cfg(feature = "nats")]
mod nats;

#[cfg(feature = "rabbitmq")]
mod rabbitmq;

#[cfg(feature = "nats")]
pub use nats::TestNats;

#[cfg(feature = "rabbitmq")]
pub use rabbitmq::TestRabbitMq;

use std::time::Duration;

/// How long integration tests wait for a message to show up downstream.
pub const RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);
