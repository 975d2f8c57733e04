//! # Axum Helpers
//!
//! Shared HTTP plumbing for the intake service.
//!
//! ## Modules
//!
//! - **[`server`]**: Listener setup, health/readiness endpoints, graceful shutdown
//! - **[`client`]**: Client IP and user agent extraction
//!
//! ## Quick Start
//!
//! ```ignore
//! use axum::Router;
//! use axum_helpers::{create_app, health_router};
//! use core_config::{app_info, server::ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let router = Router::new().merge(health_router(app_info!()));
//!     create_app(router, &ServerConfig::default()).await
//! }
//! ```

pub mod client;
pub mod server;

pub use client::{ClientInfo, extract_ip_from_headers, extract_ip_from_socket, extract_user_agent};
pub use server::{
    HealthResponse, ReadyResponse, create_app, health_router, readiness, serve, shutdown_signal,
};
