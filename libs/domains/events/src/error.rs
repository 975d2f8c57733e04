//! Intake error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use messaging::PublishError;
use thiserror::Error;

/// Result type for intake operations
pub type Result<T> = std::result::Result<T, IntakeError>;

/// Pipeline step at which a request was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    TypeValidation,
    Decoding,
    Envelope,
    Publishing,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::TypeValidation => "type_validation",
            Stage::Decoding => "decoding",
            Stage::Envelope => "envelope",
            Stage::Publishing => "publishing",
        }
    }
}

/// Intake errors
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("event type '{0}' is not registered")]
    TypeNotFound(String),

    #[error("request body is not a JSON object: {0}")]
    BadParameters(#[source] serde_json::Error),

    #[error("failed to encode envelope: {0}")]
    Encoding(#[source] serde_json::Error),

    #[error("failed to publish to '{topic}': {source}")]
    PublishFailed {
        topic: String,
        #[source]
        source: PublishError,
    },
}

impl IntakeError {
    pub fn stage(&self) -> Stage {
        match self {
            IntakeError::TypeNotFound(_) => Stage::TypeValidation,
            IntakeError::BadParameters(_) => Stage::Decoding,
            IntakeError::Encoding(_) => Stage::Envelope,
            IntakeError::PublishFailed { .. } => Stage::Publishing,
        }
    }

    /// Caller mistakes, as opposed to system faults
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            IntakeError::TypeNotFound(_) | IntakeError::BadParameters(_)
        )
    }

    /// Metric label for `intake_events_rejected_total`
    pub fn reason(&self) -> &'static str {
        match self {
            IntakeError::TypeNotFound(_) => "type_not_found",
            IntakeError::BadParameters(_) => "bad_parameters",
            IntakeError::Encoding(_) => "encoding",
            IntakeError::PublishFailed { .. } => "publish_failed",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            IntakeError::TypeNotFound(_) | IntakeError::BadParameters(_) => StatusCode::BAD_REQUEST,
            IntakeError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
            IntakeError::PublishFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Plain-text body sent to the caller
    pub fn public_message(&self) -> &'static str {
        match self {
            IntakeError::TypeNotFound(_) => "Type not found",
            IntakeError::BadParameters(_) => "Bad parameters",
            IntakeError::Encoding(_) => "Internal error",
            IntakeError::PublishFailed { .. } => "Publish failed",
        }
    }
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        (self.status_code(), self.public_message()).into_response()
    }
}
