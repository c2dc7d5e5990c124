use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::Result;

const DEFAULT_CONFIG_FILE: &str = "monitor.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub monitor: MonitorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub endpoints: EndpointConfig,
    /// Only answer monitoring paths for loopback and private-network peers.
    pub private_only: bool,
    /// Per-check deadline. Unset means checks may run forever.
    pub check_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub readiness: String,
    pub checks: String,
    pub liveness: String,
    pub metrics: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            readiness: "/healthz".to_string(),
            checks: "/checkz".to_string(),
            liveness: "/livez".to_string(),
            metrics: "/metricz".to_string(),
        }
    }
}

impl MonitorConfig {
    pub fn check_timeout(&self) -> Option<Duration> {
        self.check_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let paths = [
            &self.endpoints.readiness,
            &self.endpoints.checks,
            &self.endpoints.liveness,
            &self.endpoints.metrics,
        ];

        for (i, path) in paths.iter().enumerate() {
            if !path.starts_with('/') {
                return Err(ConfigError::Message(format!(
                    "Endpoint path must start with '/': {:?}",
                    path
                )));
            }

            if paths[..i].contains(path) {
                return Err(ConfigError::Message(format!(
                    "Endpoint path is used twice: {}",
                    path
                )));
            }
        }

        if self.check_timeout_ms == Some(0) {
            return Err(ConfigError::Message(
                "Check timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl AppConfig {
    /// Defaults, then `monitor.toml` if present, then `MONITOR_*` variables.
    pub fn load() -> Result<Self> {
        Self::build(Path::new(DEFAULT_CONFIG_FILE), false)
    }

    /// Same layering as [`AppConfig::load`] but the file must exist.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::build(path.as_ref(), true)
    }

    fn build(path: &Path, required: bool) -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?);

        if required || path.exists() {
            builder = builder.add_source(File::from(path).required(required));
        }

        builder = builder.add_source(
            Environment::with_prefix("MONITOR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        app_config.validate()?;

        Ok(app_config)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port cannot be 0".to_string()));
        }

        if self.server.host.is_empty() {
            return Err(ConfigError::Message("Server host cannot be empty".to_string()));
        }

        self.monitor.validate()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
