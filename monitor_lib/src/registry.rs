//! Registry of readiness checks, health checks and the metrics producer

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use parking_lot::RwLock;
use tracing::debug;

use crate::check::{Check, NamedCheck};

/// Source of the `/metricz` body. Either variant is invoked once per request.
#[derive(Clone)]
pub enum MetricsProducer {
    Sync(Arc<dyn Fn() -> String + Send + Sync>),
    Async(Arc<dyn Fn() -> BoxFuture<'static, String> + Send + Sync>),
}

impl MetricsProducer {
    pub async fn produce(&self) -> String {
        match self {
            MetricsProducer::Sync(produce) => produce(),
            MetricsProducer::Async(produce) => produce().await,
        }
    }
}

impl fmt::Debug for MetricsProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricsProducer::Sync(_) => f.write_str("MetricsProducer::Sync"),
            MetricsProducer::Async(_) => f.write_str("MetricsProducer::Async"),
        }
    }
}

#[derive(Default)]
struct RegistryInner {
    readiness_checks: Vec<NamedCheck>,
    health_checks: Vec<NamedCheck>,
    metrics: Option<MetricsProducer>,
}

/// Shared handle to the registered checks. Clones observe the same state.
///
/// Registration is expected to happen at startup; readers take a snapshot so
/// the lock is never held while checks run.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_health_check<C: Check + 'static>(&self, name: impl Into<String>, check: C) {
        let check = NamedCheck::new(name, check);
        debug!(name = check.name(), "registered health check");
        self.inner.write().health_checks.push(check);
    }

    pub fn add_readiness_check<C: Check + 'static>(&self, name: impl Into<String>, check: C) {
        let check = NamedCheck::new(name, check);
        debug!(name = check.name(), "registered readiness check");
        self.inner.write().readiness_checks.push(check);
    }

    /// Replaces the metrics producer with a synchronous one.
    pub fn set_metrics<F>(&self, produce: F)
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.inner.write().metrics = Some(MetricsProducer::Sync(Arc::new(produce)));
    }

    /// Replaces the metrics producer with an asynchronous one.
    pub fn set_metrics_async<F, Fut>(&self, produce: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = String> + Send + 'static,
    {
        let produce = move || produce().boxed();
        self.inner.write().metrics = Some(MetricsProducer::Async(Arc::new(produce)));
    }

    /// Drops every check and the metrics producer.
    pub fn reset(&self) {
        let mut inner = self.inner.write();
        inner.readiness_checks.clear();
        inner.health_checks.clear();
        inner.metrics = None;
    }

    pub fn readiness_checks(&self) -> Vec<NamedCheck> {
        self.inner.read().readiness_checks.clone()
    }

    pub fn health_checks(&self) -> Vec<NamedCheck> {
        self.inner.read().health_checks.clone()
    }

    pub fn metrics_producer(&self) -> Option<MetricsProducer> {
        self.inner.read().metrics.clone()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Registry")
            .field("readiness_checks", &inner.readiness_checks)
            .field("health_checks", &inner.health_checks)
            .field("metrics", &inner.metrics)
            .finish()
    }
}
