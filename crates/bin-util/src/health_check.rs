//! # Health Check
//!
//! A lightweight HTTP server for health and readiness probes plus a read-only status report.
//!
//! Routes:
//! - `/healthz`: liveness probe
//! - `/readyz`: readiness probe
//! - `/status`: JSON document produced by [`ReportStatus`]
//!
//! The server only ever reads through the two traits, so whatever state backs them stays owned
//! by the worker that produces it.
use core::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use eyre::Context as _;
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// Trait for types that can perform health checks.
pub trait CheckHealth: Send + Sync + 'static {
    /// Checks the health status of the service.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the service is healthy
    /// * `Err(...)` - If there are any issues with the service's health
    fn check_health(&self) -> impl Future<Output = eyre::Result<()>> + Send;
}

/// Trait for types that can describe their current state as JSON.
pub trait ReportStatus: Send + Sync + 'static {
    /// Snapshot of the current state
    fn report_status(&self) -> serde_json::Value;
}

impl<T: CheckHealth> CheckHealth for Arc<T> {
    async fn check_health(&self) -> eyre::Result<()> {
        T::check_health(self).await
    }
}

impl<T: ReportStatus> ReportStatus for Arc<T> {
    fn report_status(&self) -> serde_json::Value {
        T::report_status(self)
    }
}

/// A server that handles health check, readiness probe and status requests.
///
/// Both probes return 200 OK when the check passes, or 503 Service Unavailable otherwise.
pub struct Server<Checker> {
    port: u16,
    checker: Arc<Checker>,
}

impl<Checker: CheckHealth + ReportStatus> Server<Checker> {
    /// Creates a new `Server` bound to the specified port.
    #[must_use]
    pub const fn new(port: u16, checker: Arc<Checker>) -> Self {
        Self { port, checker }
    }

    /// Starts the HTTP server and runs until the cancellation token is triggered.
    ///
    /// The server binds to `0.0.0.0` on the configured port and shuts down gracefully once the
    /// token is cancelled.
    ///
    /// # Errors
    ///
    /// If the port cannot be bound or the server fails while serving
    pub async fn run(self, cancel_token: CancellationToken) -> eyre::Result<()> {
        let app = Router::new()
            .route("/healthz", get(handle_healthz::<Checker>))
            .route("/readyz", get(handle_readyz::<Checker>))
            .route("/status", get(handle_status::<Checker>))
            .layer(Extension(self.checker));

        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", self.port))
            .await
            .wrap_err_with(|| format!("failed to bind health check port {}", self.port))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
            })
            .await
            .wrap_err("health check server error")
    }
}

async fn handle_healthz<Checker: CheckHealth>(
    Extension(checker): Extension<Arc<Checker>>,
) -> impl IntoResponse {
    match checker.check_health().await {
        Ok(()) => {
            tracing::trace!("Health check succeeded");
            (StatusCode::OK, Json(json!({ "status": "HEALTHY" })))
        }
        Err(err) => {
            tracing::trace!(?err, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "UNHEALTHY" })),
            )
        }
    }
}

async fn handle_readyz<Checker: CheckHealth>(
    Extension(checker): Extension<Arc<Checker>>,
) -> impl IntoResponse {
    match checker.check_health().await {
        Ok(()) => {
            tracing::trace!("Readiness check succeeded");
            (StatusCode::OK, Json(json!({ "status": "READY" })))
        }
        Err(err) => {
            tracing::trace!(?err, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "UNREADY" })),
            )
        }
    }
}

async fn handle_status<Checker: ReportStatus>(
    Extension(checker): Extension<Arc<Checker>>,
) -> impl IntoResponse {
    Json(checker.report_status())
}
