//! Library error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::runner::ReadinessFailure;

pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid bind address: {0}")]
    InvalidAddress(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Readiness(#[from] ReadinessFailure),
}

impl IntoResponse for MonitorError {
    fn into_response(self) -> Response {
        // Plain status only; which check failed is never disclosed.
        let status = match &self {
            MonitorError::Readiness(failure) => {
                tracing::warn!(name = %failure.name, status = %failure.status, "readiness check failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            other => {
                tracing::error!("Unexpected error: {}", other);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        status.into_response()
    }
}
