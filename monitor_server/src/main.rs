//! Demo host embedding the monitoring middleware

use anyhow::{Context, Result};
use axum::{http::StatusCode, routing::get, Router};
use monitor_lib::{
    logging_layer, run_server, shutdown_signal, with_monitoring, AppConfig, CheckStatus, Monitor,
    MonitorError, ProcessMetrics, Registry,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::load().context("Failed to load configuration")?;

    info!("Configuration loaded successfully");
    info!("Server will bind to: {}", config.bind_address());

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .map_err(|_| MonitorError::InvalidAddress(config.bind_address()))?;

    let accepting = Arc::new(AtomicBool::new(true));
    let requests = Arc::new(AtomicU64::new(0));

    let registry = Registry::new();
    register_checks(&registry, accepting.clone(), requests.clone());
    info!(
        "Registered {} readiness and {} health checks",
        registry.readiness_checks().len(),
        registry.health_checks().len()
    );

    let monitor = Monitor::with_config(registry, config.monitor.clone());
    let app = with_monitoring(app_routes(requests), monitor).layer(logging_layer());

    let shutdown = async move {
        shutdown_signal().await;
        accepting.store(false, Ordering::SeqCst);
        info!("Readiness now failing while connections drain");
    };

    run_server(app, addr, shutdown).await?;

    info!("Server shutdown complete");
    Ok(())
}

fn register_checks(registry: &Registry, accepting: Arc<AtomicBool>, requests: Arc<AtomicU64>) {
    registry.add_readiness_check("accepting_traffic", move || {
        let accepting = accepting.clone();
        async move {
            if accepting.load(Ordering::SeqCst) {
                CheckStatus::Ok
            } else {
                CheckStatus::Critical
            }
        }
    });

    registry.add_health_check("runtime", || async {
        let task = tokio::spawn(async { tokio::task::yield_now().await });
        match task.await {
            Ok(()) => CheckStatus::Ok,
            Err(_) => CheckStatus::Critical,
        }
    });

    registry.add_health_check("working_directory", || async {
        match tokio::fs::metadata(".").await {
            Ok(meta) if meta.permissions().readonly() => CheckStatus::Warning,
            Ok(_) => CheckStatus::Ok,
            Err(_) => CheckStatus::Unknown,
        }
    });

    let process = ProcessMetrics::new();
    registry.set_metrics(move || {
        let mut body = process.render();
        body.push_str(&format!("app_requests_total {}\n", requests.load(Ordering::Relaxed)));
        body
    });
}

fn app_routes(requests: Arc<AtomicU64>) -> Router {
    Router::new()
        .route(
            "/",
            get(move || {
                let requests = requests.clone();
                async move {
                    requests.fetch_add(1, Ordering::Relaxed);
                    "Hello from the monitored service"
                }
            }),
        )
        .fallback(|| async { (StatusCode::NOT_FOUND, "Not Found") })
}

/// `RUST_LOG` wins. Otherwise this binary and the middleware log at `debug`
/// in debug builds and `info` in release builds. `LOG_JSON=1` emits JSON lines.
fn init_tracing() {
    let level = if cfg!(debug_assertions) { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    let json = matches!(std::env::var("LOG_JSON").as_deref(), Ok("1") | Ok("true"));
    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(fmt::layer().json().with_current_span(true))
            .init();
    } else {
        subscriber.with(fmt::layer().compact().with_target(false)).init();
    }
}

fn default_filter(level: &str) -> String {
    format!("monitor_server={level},monitor_lib={level}")
}
