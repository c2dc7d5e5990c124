//! Monitoring endpoint dispatch
//!
//! The middleware answers the four monitoring paths itself and hands every
//! other request to the next service untouched.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    middleware::{self as axum_middleware, Next},
    response::{IntoResponse, Response},
    Router,
};
use futures_util::FutureExt;
use tracing::{debug, warn};

use crate::aggregate::{liveness_status, render};
use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::middleware::access;
use crate::registry::Registry;
use crate::runner::CheckRunner;

/// Content type of every monitoring response.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Readiness,
    Checks,
    Liveness,
    Metrics,
}

/// Middleware state: the registry plus how to serve it.
#[derive(Debug, Clone)]
pub struct Monitor {
    registry: Registry,
    config: Arc<MonitorConfig>,
    runner: CheckRunner,
}

impl Monitor {
    pub fn new(registry: Registry) -> Self {
        Self::with_config(registry, MonitorConfig::default())
    }

    pub fn with_config(registry: Registry, config: MonitorConfig) -> Self {
        let runner = CheckRunner::with_timeout(config.check_timeout());
        Self {
            registry,
            config: Arc::new(config),
            runner,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn endpoint(&self, path: &str) -> Option<Endpoint> {
        let endpoints = &self.config.endpoints;
        if path == endpoints.readiness {
            Some(Endpoint::Readiness)
        } else if path == endpoints.checks {
            Some(Endpoint::Checks)
        } else if path == endpoints.liveness {
            Some(Endpoint::Liveness)
        } else if path == endpoints.metrics {
            Some(Endpoint::Metrics)
        } else {
            None
        }
    }

    /// Status and body for one endpoint, without the content type.
    pub async fn respond(&self, endpoint: Endpoint) -> Response {
        match endpoint {
            Endpoint::Readiness => self.readiness().await,
            Endpoint::Checks => self.checks().await,
            Endpoint::Liveness => self.liveness().await,
            Endpoint::Metrics => self.metrics().await,
        }
    }

    async fn readiness(&self) -> Response {
        let checks = self.registry.readiness_checks();
        if checks.is_empty() {
            return StatusCode::OK.into_response();
        }

        match self.runner.run_readiness_checks(&checks).await {
            Ok(()) => StatusCode::OK.into_response(),
            Err(failure) => MonitorError::from(failure).into_response(),
        }
    }

    async fn checks(&self) -> Response {
        let checks = self.registry.health_checks();
        if checks.is_empty() {
            return StatusCode::NOT_FOUND.into_response();
        }

        let results = self.runner.run_health_checks(&checks).await;
        render(&results).into_response()
    }

    async fn liveness(&self) -> Response {
        let checks = self.registry.health_checks();
        if checks.is_empty() {
            return StatusCode::OK.into_response();
        }

        let results = self.runner.run_health_checks(&checks).await;
        (liveness_status(&results), render(&results)).into_response()
    }

    async fn metrics(&self) -> Response {
        let Some(producer) = self.registry.metrics_producer() else {
            return StatusCode::NOT_FOUND.into_response();
        };

        match AssertUnwindSafe(producer.produce()).catch_unwind().await {
            Ok(body) => body.into_response(),
            Err(_) => {
                warn!("metrics producer panicked");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

pub async fn monitoring_middleware(
    State(monitor): State<Monitor>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    let Some(endpoint) = monitor.endpoint(path) else {
        return next.run(request).await;
    };

    if !access::is_allowed(&request, monitor.config.private_only) {
        debug!(path, peer = ?access::peer_addr(&request), "monitoring request from non-private peer passed on");
        return next.run(request).await;
    }

    debug!(path, ?endpoint, "serving monitoring endpoint");

    let mut response = monitor.respond(endpoint).await;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(PROMETHEUS_CONTENT_TYPE));
    response
}

/// Layers the monitoring middleware over `router`. Routes and fallback must
/// already be in place.
pub fn with_monitoring<S>(router: Router<S>, monitor: Monitor) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(axum_middleware::from_fn_with_state(monitor, monitoring_middleware))
}
