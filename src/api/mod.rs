//! HTTP API server for the glance gateway
//!
//! Receives session webhooks from the glasses host and exposes a health
//! probe. Everything else happens over the per-session websockets.

pub mod health;
pub mod webhook;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::session::SessionLauncher;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    /// App package name reported by the health probe
    pub package_name: String,
    /// Starts and stops host sessions
    pub sessions: SessionLauncher,
}

/// HTTP API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Create a server for `state` on `port`
    #[must_use]
    pub fn new(state: ApiState, port: u16) -> Self {
        Self {
            state: Arc::new(state),
            port,
        }
    }

    /// Shared handler state
    #[must_use]
    pub fn state(&self) -> Arc<ApiState> {
        Arc::clone(&self.state)
    }

    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        router(self.state())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, app = %self.state.package_name, "API server listening");

        let sessions = self.state.sessions.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        sessions.registry().stop_all().await;
        tracing::info!("API server stopped");

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

/// Build the router for `state`
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .merge(webhook::router(Arc::clone(&state)))
        .merge(health::router(state))
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
