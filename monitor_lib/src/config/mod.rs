//! Configuration for the monitoring middleware and the demo host

mod settings;

pub use settings::{AppConfig, EndpointConfig, MonitorConfig, ServerConfig};
