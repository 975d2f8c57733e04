//! Events Domain
//!
//! Accepts analytics events over HTTP and forwards them to a broker topic
//! named after the event type.
//!
//! # Architecture
//!
//! ```text
//! POST /v2/event/{type}
//!        │
//!        ▼
//! ┌──────────────────┐  unknown type  ┌──────────────────────┐
//! │ EventTypeRegistry│───────────────►│ 400 "Type not found" │
//! └────────┬─────────┘                └──────────────────────┘
//!          ▼
//! ┌──────────────────┐  not an object ┌──────────────────────┐
//! │ JSON decode      │───────────────►│ 400 "Bad parameters" │
//! └────────┬─────────┘                └──────────────────────┘
//!          ▼
//! ┌──────────────────┐
//! │ User-agent + IP  │
//! │ enrichment       │
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐  error/timeout ┌──────────────────────┐
//! │ Publisher        │───────────────►│ 503 "Publish failed" │
//! │ (topic = type)   │                │ + error report       │
//! └────────┬─────────┘                └──────────────────────┘
//!          ▼
//!      200 "Ok"
//! ```

mod envelope;
mod error;
mod handlers;
mod registry;
mod service;
pub mod user_agent;

pub use envelope::{EnrichmentFields, EventEnvelope, EventPayload, RESERVED_KEYS};
pub use error::{IntakeError, Result, Stage};
pub use handlers::{ACK_BODY, IntakeState, intake_router};
pub use registry::{DEFAULT_EVENT_TYPES, EventType, EventTypeRegistry};
pub use service::{IntakeRequest, IntakeService};
pub use user_agent::UserAgentInfo;
