//! Server infrastructure.
//!
//! - Listener setup with client connect info and trailing-slash normalization
//! - Liveness and readiness endpoints
//! - Graceful shutdown on SIGINT/SIGTERM
//!
//! # Example
//!
//! ```ignore
//! use axum_helpers::server::{create_app, health_router};
//! use core_config::{app_info, server::ServerConfig};
//!
//! let app = api_routes.merge(health_router(app_info!()));
//! create_app(app, &ServerConfig::default()).await?;
//! ```

pub mod app;
pub mod health;
pub mod shutdown;

pub use app::{create_app, serve};
pub use health::{HealthResponse, ReadyResponse, health_router, readiness};
pub use shutdown::shutdown_signal;
