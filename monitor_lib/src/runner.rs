//! Concurrent execution of registered checks

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::future::{join_all, try_join_all, FutureExt};
use thiserror::Error;
use tracing::{debug, warn};

use crate::check::{CheckResult, CheckStatus, NamedCheck};

/// A readiness check reported anything other than ok.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("readiness check '{name}' reported {status}")]
pub struct ReadinessFailure {
    pub name: String,
    pub status: CheckStatus,
}

/// Runs checks with an optional per-check deadline.
///
/// Without a timeout a check that never completes stalls its whole batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckRunner {
    timeout: Option<Duration>,
}

impl CheckRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// A check that panics or runs past the timeout reports `Unknown`.
    async fn status_of(&self, check: &NamedCheck) -> CheckStatus {
        let guarded = AssertUnwindSafe(check.check()).catch_unwind();

        let outcome = match self.timeout {
            None => guarded.await,
            Some(limit) => match tokio::time::timeout(limit, guarded).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(name = check.name(), ?limit, "check timed out");
                    return CheckStatus::Unknown;
                }
            },
        };

        match outcome {
            Ok(status) => status,
            Err(_) => {
                warn!(name = check.name(), "check panicked");
                CheckStatus::Unknown
            }
        }
    }

    /// Never fails; the severity is carried in the result.
    pub async fn run_health_check(&self, check: &NamedCheck) -> CheckResult {
        let status = self.status_of(check).await;
        debug!(name = check.name(), %status, "health check finished");
        CheckResult::new(check.name(), status)
    }

    /// Collapses the four levels to pass/fail: only `Ok` passes.
    pub async fn run_readiness_check(&self, check: &NamedCheck) -> Result<(), ReadinessFailure> {
        let status = self.status_of(check).await;
        if status.is_ok() {
            Ok(())
        } else {
            Err(ReadinessFailure {
                name: check.name().to_string(),
                status,
            })
        }
    }

    /// Waits for every check. Results come back in input order regardless of
    /// completion order.
    pub async fn run_health_checks(&self, checks: &[NamedCheck]) -> Vec<CheckResult> {
        join_all(checks.iter().map(|check| self.run_health_check(check))).await
    }

    /// Resolves with the first failure, dropping the checks still pending.
    pub async fn run_readiness_checks(&self, checks: &[NamedCheck]) -> Result<(), ReadinessFailure> {
        try_join_all(checks.iter().map(|check| self.run_readiness_check(check)))
            .await
            .map(|_| ())
    }
}
