//! Liveness, readiness, check and metrics endpoints as axum middleware.
//!
//! Register checks on a [`Registry`], wrap it in a [`Monitor`] and layer
//! [`monitoring_middleware`] over the host router (or call
//! [`with_monitoring`]). Requests to `/healthz`, `/checkz`, `/livez` and
//! `/metricz` are answered by the middleware; everything else passes through.

pub mod aggregate;
pub mod check;
pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod registry;
pub mod runner;

pub use aggregate::{liveness_status, render};
pub use check::{Check, CheckResult, CheckStatus, NamedCheck};
pub use crate::config::{AppConfig, EndpointConfig, MonitorConfig, ServerConfig};
pub use error::{MonitorError, Result};
pub use metrics::ProcessMetrics;
pub use middleware::logging::logging_layer;
pub use middleware::{monitoring_middleware, with_monitoring, Endpoint, Monitor, PROMETHEUS_CONTENT_TYPE};
pub use registry::{MetricsProducer, Registry};
pub use runner::{CheckRunner, ReadinessFailure};

use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info};

/// Serves `app` until `shutdown` resolves, then drains open connections.
/// Peer addresses are recorded so the private-network filter can see them.
pub async fn run_server<F>(app: Router, addr: SocketAddr, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let app = app.into_make_service_with_connect_info::<SocketAddr>();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
