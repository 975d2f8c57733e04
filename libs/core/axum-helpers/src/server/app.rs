use super::shutdown::shutdown_signal;
use axum::{Router, ServiceExt, extract::Request};
use core_config::server::ServerConfig;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower::Layer;
use tower_http::normalize_path::NormalizePathLayer;
use tracing::info;

/// Binds the configured address and serves `router` until SIGINT/SIGTERM.
///
/// # Errors
/// Returns an error if the listener fails to bind or the server fails
/// while running.
///
/// # Example
/// ```ignore
/// let router = Router::new();
/// create_app(router, &ServerConfig::default()).await?;
/// ```
pub async fn create_app(router: Router, server_config: &ServerConfig) -> io::Result<()> {
    let listener = TcpListener::bind(server_config.address()).await?;
    serve(listener, router, shutdown_signal()).await
}

/// Serves `router` on an already bound listener until `shutdown` completes.
///
/// - `/path/` and `/path` reach the same route
/// - handlers can read `ConnectInfo<SocketAddr>` for the peer address
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("Server starting on {}", listener.local_addr()?);

    // Path normalization must wrap the router so it runs before routing.
    let app = NormalizePathLayer::trim_trailing_slash().layer(router);

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .inspect_err(|e| {
        tracing::error!("Server encountered an error: {:?}", e);
    })?;

    info!("Server stopped");
    Ok(())
}
