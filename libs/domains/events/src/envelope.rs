//! Outbound envelope

use crate::user_agent::UserAgentInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys owned by enrichment. A payload key with one of these names is dropped.
pub const RESERVED_KEYS: [&str; 7] = ["date", "mobile", "platform", "os", "browser", "version", "ip"];

/// Caller-supplied event body.
///
/// Always a JSON object. Its contents are not interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventPayload(Map<String, Value>);

impl EventPayload {
    /// Decode a request body. Anything but a JSON object is an error.
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for EventPayload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Request-derived metadata merged into every envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentFields {
    /// Receipt time, not publish time
    pub date: DateTime<Utc>,
    pub mobile: bool,
    pub platform: String,
    pub os: String,
    pub browser: String,
    pub version: String,
    pub ip: String,
}

impl EnrichmentFields {
    pub fn new(user_agent: UserAgentInfo, received_at: DateTime<Utc>, client_ip: impl Into<String>) -> Self {
        Self {
            date: received_at,
            mobile: user_agent.mobile,
            platform: user_agent.platform,
            os: user_agent.os,
            browser: user_agent.browser,
            version: user_agent.version,
            ip: client_ip.into(),
        }
    }
}

/// Payload plus enrichment, serialized as one flat JSON object.
///
/// ```json
/// {"date":"2024-05-01T10:00:00Z","mobile":true,"platform":"iPhone","os":"",
///  "browser":"Mozilla","version":"5.0","ip":"203.0.113.7","foo":"bar"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    // Enrichment must come first: on deserialization it claims its keys and
    // the payload receives whatever is left.
    #[serde(flatten)]
    pub enrichment: EnrichmentFields,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl EventEnvelope {
    /// Combine a decoded payload with request metadata.
    ///
    /// Payload keys that collide with [`RESERVED_KEYS`] are removed.
    pub fn build(
        payload: EventPayload,
        user_agent: UserAgentInfo,
        received_at: DateTime<Utc>,
        client_ip: impl Into<String>,
    ) -> Self {
        let mut fields = payload.into_inner();
        for key in RESERVED_KEYS {
            if fields.remove(key).is_some() {
                tracing::debug!(key, "Dropped payload key shadowed by enrichment");
            }
        }

        Self {
            enrichment: EnrichmentFields::new(user_agent, received_at, client_ip),
            payload: EventPayload(fields),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_json(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }
}
