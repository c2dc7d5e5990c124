//! Check definitions and their four-level outcome

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

/// Outcome of a single check on the fixed ok/warning/critical/unknown scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckStatus {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl CheckStatus {
    /// Numeric severity emitted in the text body.
    pub fn value(self) -> u8 {
        match self {
            CheckStatus::Ok => 0,
            CheckStatus::Warning => 1,
            CheckStatus::Critical => 2,
            CheckStatus::Unknown => 3,
        }
    }

    pub fn is_ok(self) -> bool {
        self == CheckStatus::Ok
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Ok => write!(f, "ok"),
            CheckStatus::Warning => write!(f, "warning"),
            CheckStatus::Critical => write!(f, "critical"),
            CheckStatus::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
}

impl CheckResult {
    pub fn new(name: impl Into<String>, status: CheckStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }

    pub fn value(&self) -> u8 {
        self.status.value()
    }
}

/// A unit of diagnostic logic. Any `Fn() -> impl Future<Output = CheckStatus>`
/// closure is a check, so most callers never implement this by hand.
#[async_trait]
pub trait Check: Send + Sync {
    async fn check(&self) -> CheckStatus;
}

#[async_trait]
impl<F, Fut> Check for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CheckStatus> + Send + 'static,
{
    async fn check(&self) -> CheckStatus {
        (self)().await
    }
}

/// A check together with the name it reports under.
#[derive(Clone)]
pub struct NamedCheck {
    name: String,
    check: Arc<dyn Check>,
}

impl NamedCheck {
    pub fn new<C: Check + 'static>(name: impl Into<String>, check: C) -> Self {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn check(&self) -> CheckStatus {
        self.check.check().await
    }
}

impl fmt::Debug for NamedCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedCheck").field("name", &self.name).finish()
    }
}
