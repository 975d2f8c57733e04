//! HTTP handlers for the intake API

use crate::service::{IntakeRequest, IntakeService};
use axum::Router;
use axum::body::Bytes;
use axum::extract::rejection::PathRejection;
use axum::extract::{FromRequest, Path, Request, State};
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum_helpers::ClientInfo;
use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;

/// Intake router state
pub type IntakeState = Arc<IntakeService>;

/// Body returned for an accepted event
pub const ACK_BODY: &str = "Ok";

/// Create the intake router
pub fn intake_router(service: IntakeState) -> Router {
    Router::new()
        .route("/v2/event/{event_type}", post(ingest_event))
        .with_state(service)
}

/// Accept one event of type `event_type`
///
/// The type is checked before the body is read, so unknown types are
/// rejected whatever the body looks like.
#[instrument(skip_all, fields(client_ip = %client.ip))]
pub async fn ingest_event(
    State(service): State<IntakeState>,
    client: ClientInfo,
    event_type: Result<Path<String>, PathRejection>,
    request: Request,
) -> Result<&'static str, Response> {
    let received_at = Utc::now();

    // A segment that does not decode to UTF-8 cannot name a registered type.
    let event_type = match event_type {
        Ok(Path(event_type)) => event_type,
        Err(_) => raw_last_segment(request.uri()),
    };
    service
        .validate(&event_type)
        .map_err(IntoResponse::into_response)?;

    let body = Bytes::from_request(request, &service)
        .await
        .map_err(IntoResponse::into_response)?;

    service
        .ingest(IntakeRequest {
            event_type,
            body,
            user_agent: client.user_agent,
            client_ip: client.ip,
            received_at,
        })
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(ACK_BODY)
}

fn raw_last_segment(uri: &Uri) -> String {
    uri.path().rsplit('/').next().unwrap_or_default().to_string()
}
