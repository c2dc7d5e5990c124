//! Middleware components

pub mod access;
pub mod logging;
pub mod monitor;

pub use monitor::{monitoring_middleware, with_monitoring, Endpoint, Monitor, PROMETHEUS_CONTENT_TYPE};
