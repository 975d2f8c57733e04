use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use core_config::AppInfo;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub name: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    /// Dependency name to `connected` / `disconnected`
    pub checks: BTreeMap<&'static str, &'static str>,
}

/// Liveness handler.
///
/// Always 200 while the process is serving requests.
pub async fn health_handler(State(app): State<AppInfo>) -> Response {
    let response = HealthResponse {
        status: "healthy",
        name: app.name,
        version: app.version,
    };

    (StatusCode::OK, Json(response)).into_response()
}

/// Creates a router with the /health endpoint.
///
/// # Example
/// ```ignore
/// let app = Router::new().merge(health_router(app_info!()));
/// ```
pub fn health_router(app_info: AppInfo) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(app_info)
}

/// Builds a readiness response from named dependency checks.
///
/// 200 when every check passed, 503 otherwise.
pub fn readiness<I>(checks: I) -> Response
where
    I: IntoIterator<Item = (&'static str, bool)>,
{
    let mut all_ready = true;
    let checks = checks
        .into_iter()
        .map(|(name, ok)| {
            if !ok {
                tracing::warn!("Readiness check failed: {}", name);
                all_ready = false;
            }
            (name, if ok { "connected" } else { "disconnected" })
        })
        .collect();

    let (code, status) = if all_ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    };

    (code, Json(ReadyResponse { status, checks })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_app_info() {
        let app = health_router(AppInfo {
            name: "event_intake",
            version: "1.2.3",
        });

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["name"], "event_intake");
        assert_eq!(json["version"], "1.2.3");
    }

    #[tokio::test]
    async fn test_readiness_all_connected() {
        let response = readiness([("broker", true)]);
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "ready");
        assert_eq!(json["checks"]["broker"], "connected");
    }

    #[tokio::test]
    async fn test_readiness_failure_is_503() {
        let response = readiness([("broker", false)]);
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let json = body_json(response).await;
        assert_eq!(json["status"], "not ready");
        assert_eq!(json["checks"]["broker"], "disconnected");
    }
}
