//! Event Intake Service
//!
//! Accepts `POST /v2/event/{type}` and publishes each enriched event to the
//! broker destination named after its type.
//!
//! ## Startup
//!
//! ```text
//! env config ─► tracing + metrics ─► error reporter
//!      │
//!      ▼
//! connect broker (AMQP or NATS) ─► declare one topic per event type
//!      │
//!      ▼
//! serve HTTP until SIGINT/SIGTERM ─► close broker connection
//! ```
//!
//! Any startup failure is reported as fatal and ends the process with a
//! non-zero exit code.

use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::{Router, middleware};
use axum_helpers::{create_app, health_router, readiness};
use core_config::broker::{BrokerBackend, BrokerConfig};
use core_config::reporting::ReportingConfig;
use core_config::server::ServerConfig;
use core_config::{AppInfo, Environment, FromEnv, app_info};
use domain_events::{EventTypeRegistry, IntakeService, IntakeState, intake_router};
use eyre::{Result, WrapErr};
use messaging::Publisher;
use messaging::amqp::AmqpPublisher;
use messaging::nats::NatsPublisher;
use observability::{
    ErrorReport, ErrorReporter, TracingReporter, WebhookReporter, metrics_handler,
    metrics_middleware,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// How long a fatal report may take to leave the process
const FATAL_REPORT_TIMEOUT: Duration = Duration::from_secs(3);

/// Run the intake service
///
/// # Errors
///
/// Returns an error if:
/// - configuration is missing or malformed
/// - the broker cannot be reached or a topic cannot be declared
/// - the listener cannot bind
pub async fn run() -> Result<()> {
    core_config::tracing::install_color_eyre();

    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    let app_info = app_info!();
    info!(
        name = %app_info.name,
        version = %app_info.version,
        environment = environment.as_str(),
        "Starting event intake service"
    );

    let reporting = ReportingConfig::from_env().wrap_err("Invalid error reporting configuration")?;
    let reporter = build_reporter(&reporting, app_info, &environment)?;

    if let Err(e) = start(app_info, Arc::clone(&reporter)).await {
        error!("Fatal error: {:#}", e);
        reporter.report(ErrorReport::fatal(format!("{:#}", e)).with_tag("stage", "startup"));
        reporter.flush(FATAL_REPORT_TIMEOUT).await;
        return Err(e);
    }

    info!("Event intake service stopped");
    Ok(())
}

/// Startup phase followed by serving. Everything here is fatal on error.
async fn start(app_info: AppInfo, reporter: Arc<dyn ErrorReporter>) -> Result<()> {
    observability::init_metrics().wrap_err("Failed to install metrics recorder")?;

    let server = ServerConfig::from_env().wrap_err("Invalid server configuration")?;
    let broker = BrokerConfig::from_env().wrap_err("Invalid broker configuration")?;

    let publisher = connect_publisher(&broker).await?;

    let service = Arc::new(IntakeService::new(
        Arc::new(EventTypeRegistry::default()),
        Arc::clone(&publisher),
        reporter,
        broker.publish_timeout,
    ));

    service
        .declare_topics()
        .await
        .wrap_err("Failed to declare broker topics")?;

    let router = build_router(service, app_info);
    let served = create_app(router, &server)
        .await
        .wrap_err_with(|| format!("Failed to serve on {}", server.address()));

    if let Err(e) = publisher.close().await {
        warn!(error = %e, "Failed to close broker connection cleanly");
    }

    served
}

/// Pick the error sink: webhook when an endpoint is configured, log otherwise.
pub fn build_reporter(
    config: &ReportingConfig,
    app_info: AppInfo,
    environment: &Environment,
) -> Result<Arc<dyn ErrorReporter>> {
    let reporter: Arc<dyn ErrorReporter> = match &config.endpoint {
        Some(endpoint) => Arc::new(
            WebhookReporter::new(endpoint.as_str(), app_info.name, environment.as_str())
                .wrap_err("Failed to build error reporting client")?,
        ),
        None => Arc::new(TracingReporter::new(app_info.name, environment.as_str())),
    };

    info!(kind = reporter.kind(), endpoint = ?config.endpoint, "Error reporter ready");
    Ok(reporter)
}

/// Connect to the configured broker.
pub async fn connect_publisher(config: &BrokerConfig) -> Result<Arc<dyn Publisher>> {
    info!(backend = %config.backend, "Connecting to broker...");

    let publisher: Arc<dyn Publisher> = match config.backend {
        BrokerBackend::Amqp => Arc::new(
            AmqpPublisher::connect(&config.url)
                .await
                .wrap_err("Failed to connect to AMQP broker")?,
        ),
        BrokerBackend::Nats => Arc::new(
            NatsPublisher::connect(&config.url)
                .await
                .wrap_err("Failed to connect to NATS")?,
        ),
    };

    info!(backend = publisher.backend(), "Connected to broker");
    Ok(publisher)
}

/// Assemble every HTTP route with its middleware.
pub fn build_router(service: IntakeState, app_info: AppInfo) -> Router {
    Router::new()
        .merge(intake_router(Arc::clone(&service)))
        .merge(health_router(app_info))
        .route("/ready", get(ready_handler).with_state(service))
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}

async fn ready_handler(State(service): State<IntakeState>) -> Response {
    readiness([("broker", service.is_ready())])
}
