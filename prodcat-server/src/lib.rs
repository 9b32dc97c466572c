//! prodcat-server: HTTP API for the product catalog
//!
//! A single read-only route (`GET /fetch_products`) plus a health probe,
//! served over one shared MySQL connection that reconnects itself on
//! transient failures (see [`db::ConnectionManager`]).

pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use prodcat_core::DbConfig;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Allow permissive CORS (default: false = localhost only)
    ///
    /// WARNING: Setting this to true allows any origin.
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            cors_permissive: false,
        }
    }
}

fn cors_layer(permissive: bool) -> CorsLayer {
    if permissive {
        tracing::warn!("CORS: permissive mode enabled, all origins allowed");
        CorsLayer::permissive()
    } else {
        // Localhost only
        CorsLayer::new()
            .allow_origin([
                "http://localhost:3000".parse().unwrap(),
                "http://127.0.0.1:3000".parse().unwrap(),
            ])
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Build the application router with all routes
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::products::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(config.cors_permissive))
        .with_state(state)
}

/// Start the HTTP server
pub async fn serve(config: ServerConfig, db_config: &DbConfig) -> Result<(), ServeError> {
    let state = AppState::new(db::ConnectionManager::new(db_config));

    // Begin the handshake without holding up the listener; if the database
    // is down, the manager keeps retrying while requests queue on it.
    let warmup = state.db_handle();
    tokio::spawn(async move {
        if let Err(err) = warmup.ensure_connected().await {
            tracing::error!("initial database connection failed: {err}");
        }
    });

    let app = build_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, starting shutdown");
        }
    }
}

/// Server startup error type
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("invalid bind address: {0}")]
    Addr(#[from] std::net::AddrParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
