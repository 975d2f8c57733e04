//! Error types for broker operations.

use std::fmt;
use thiserror::Error;

/// Error categories describe whether a failure is worth retrying.
///
/// The intake pipeline never retries on its own; the category is carried
/// into metrics labels and error reports so operators can tell a flapping
/// broker apart from a misconfigured destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Temporary failure (network blip, broker busy, timeout)
    Transient,

    /// Failure that will repeat until configuration changes
    Permanent,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "transient",
            ErrorCategory::Permanent => "permanent",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error that can occur while talking to a broker.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Could not connect, or the connection/channel is gone
    #[error("broker connection error: {0}")]
    Connection(String),

    /// Destination declaration failed
    #[error("failed to declare '{topic}': {message}")]
    Declare { topic: String, message: String },

    /// The publish call itself failed
    #[error("failed to publish to '{topic}': {message}")]
    Publish { topic: String, message: String },

    /// The broker negatively acknowledged the message
    #[error("broker rejected message for '{topic}'")]
    Rejected { topic: String },

    /// Publish attempted on a destination that was never declared
    #[error("topic '{0}' has not been declared")]
    UndeclaredTopic(String),

    /// No answer from the broker within the allowed time
    #[error("publish to '{topic}' timed out after {timeout_ms}ms")]
    Timeout { topic: String, timeout_ms: u64 },
}

impl PublishError {
    /// Create a connection error from any displayable client error.
    pub fn connection(error: impl fmt::Display) -> Self {
        Self::Connection(error.to_string())
    }

    /// Create a declaration error for `topic`.
    pub fn declare(topic: &str, error: impl fmt::Display) -> Self {
        Self::Declare {
            topic: topic.to_string(),
            message: error.to_string(),
        }
    }

    /// Create a publish error for `topic`.
    pub fn publish(topic: &str, error: impl fmt::Display) -> Self {
        Self::Publish {
            topic: topic.to_string(),
            message: error.to_string(),
        }
    }

    pub fn timeout(topic: &str, timeout_ms: u64) -> Self {
        Self::Timeout {
            topic: topic.to_string(),
            timeout_ms,
        }
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            PublishError::Connection(_) => ErrorCategory::Transient,
            PublishError::Publish { .. } => ErrorCategory::Transient,
            PublishError::Rejected { .. } => ErrorCategory::Transient,
            PublishError::Timeout { .. } => ErrorCategory::Transient,
            PublishError::Declare { .. } => ErrorCategory::Permanent,
            PublishError::UndeclaredTopic(_) => ErrorCategory::Permanent,
        }
    }

    /// The destination involved, when the error is tied to one.
    pub fn topic(&self) -> Option<&str> {
        match self {
            PublishError::Connection(_) => None,
            PublishError::Declare { topic, .. }
            | PublishError::Publish { topic, .. }
            | PublishError::Rejected { topic }
            | PublishError::Timeout { topic, .. } => Some(topic),
            PublishError::UndeclaredTopic(topic) => Some(topic),
        }
    }
}
