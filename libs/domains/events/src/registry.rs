//! Allowed event types

use std::collections::HashSet;
use std::fmt;

/// Event types accepted by the intake endpoint.
pub const DEFAULT_EVENT_TYPES: [&str; 3] = ["display", "click", "view"];

/// An event type that passed registry validation.
///
/// The value doubles as the broker topic name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventType(String);

impl EventType {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Broker destination for this event type
    pub fn topic(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EventType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Immutable set of allowed event types.
///
/// Built once at startup and shared read-only. Lookups are exact and
/// case-sensitive.
#[derive(Debug, Clone)]
pub struct EventTypeRegistry {
    types: HashSet<String>,
}

impl EventTypeRegistry {
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_allowed(&self, candidate: &str) -> bool {
        self.types.contains(candidate)
    }

    /// Validate `candidate`, returning the typed event type on success.
    pub fn resolve(&self, candidate: &str) -> Option<EventType> {
        self.is_allowed(candidate)
            .then(|| EventType(candidate.to_string()))
    }

    /// Registered types in sorted order (used for topic declaration).
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let mut types: Vec<&str> = self.types.iter().map(String::as_str).collect();
        types.sort_unstable();
        types.into_iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for EventTypeRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_TYPES)
    }
}
