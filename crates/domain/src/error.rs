//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`PwError`]
//! via `#[from]`. The taxonomy mirrors the supervisor's failure classes:
//! construction failures are fatal to startup, per-entity configuration
//! problems degrade the entity, and per-job runtime failures only ever
//! surface through the log sink.

use crate::cron::CronError;
use crate::expression::ExpressionError;
use crate::pin::PinError;

/// Workspace-wide error enum.
#[derive(Debug, thiserror::Error)]
pub enum PwError {
    /// A declared hardware kind has no registered driver factory.
    /// Fatal to registry construction.
    #[error("unknown hardware kind")]
    UnknownHardwareKind(#[from] UnknownHardwareKind),

    /// A referenced record does not exist. Fatal during construction,
    /// reported through the log sink at runtime.
    #[error("record not found")]
    NotFound(#[from] NotFoundError),

    /// Malformed per-entity init payload. The entity degrades to inactive;
    /// startup continues.
    #[error("invalid init config")]
    Config(#[from] ConfigError),

    /// Malformed guard expression. Treated as guard-false.
    #[error("malformed guard expression")]
    Expression(#[from] ExpressionError),

    /// A guard expression referenced an entity id the registry does not hold.
    #[error("unresolved entity reference: {0}")]
    UnresolvedReference(String),

    /// Malformed pin descriptor in an init payload.
    #[error("invalid pin descriptor")]
    Pin(#[from] PinError),

    /// Malformed cron spec. Logged at registration; the job never fires.
    #[error("invalid cron spec")]
    Scheduling(#[from] CronError),

    /// Hardware returned no value or refused the read.
    #[error("hardware read failed: {0}")]
    ReadFailure(String),

    /// Hardware is not writable or refused the write.
    #[error("hardware write failed: {0}")]
    WriteFailure(String),

    /// Persistence layer failure.
    #[error("storage error")]
    Storage(#[source] anyhow::Error),
}

impl PwError {
    /// Wrap an arbitrary persistence failure.
    #[must_use]
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage(anyhow::Error::new(err))
    }
}

/// Detail for a missing record lookup.
#[derive(Debug, thiserror::Error)]
#[error("{entity} not found: {id}")]
pub struct NotFoundError {
    /// Record kind, e.g. `"Sensor"`.
    pub entity: &'static str,
    /// The id that failed to resolve.
    pub id: String,
}

/// Detail for an unregistered driver kind tag.
#[derive(Debug, thiserror::Error)]
#[error("no driver factory registered for kind {kind:?}")]
pub struct UnknownHardwareKind {
    /// The kind tag declared in the hardware record.
    pub kind: String,
}

/// Detail for a malformed init payload.
#[derive(Debug, thiserror::Error)]
#[error("invalid init config: {reason}")]
pub struct ConfigError {
    /// Human-readable description of what failed to parse.
    pub reason: String,
}

impl ConfigError {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
