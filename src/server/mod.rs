//! HTTP front for browser clients.
//!
//! ```text
//! GET  /                 - welcome message
//! GET  /health           - liveness probe
//! POST /generate         - key pair and CSR
//! POST /validate         - parse, verify and rate a CSR
//! POST /compare          - differences between two CSRs
//! GET  /suggest-domain   - common-name suggestion
//! ```

pub mod cors;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio::signal;

use crate::config::ServerConfig;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/generate", post(handlers::generate))
        .route("/validate", post(handlers::validate_csr))
        .route("/compare", post(handlers::compare_csrs))
        .route("/suggest-domain", get(handlers::suggest_domain))
        .layer(from_fn_with_state(state.clone(), cors::enforce_origin))
        .with_state(state)
}

/// Binds the configured address and serves until SIGINT or SIGTERM.
pub async fn serve(config: ServerConfig) -> std::io::Result<()> {
    let addr = config
        .network
        .socket_addr()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, origins = ?config.cors.allowed_origins, "listening");

    axum::serve(listener, build_router(AppState::new(config)))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => tracing::error!("failed to install SIGTERM handler: {}", err),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
