//! Engine-wide error type.
//!
//! Failures inside the collision path never reach the frame loop: the
//! orchestrator logs them and downgrades. Everything that *can* be reported to
//! a caller (settings, type registry edits, presets, pool spawn) goes through
//! this enum.

use thiserror::Error;

use crate::domain::types::TypeId;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Invalid user or API parameter.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// The worker pool could not be built (thread spawn refused by the runtime).
    #[error("failed to spawn collision workers: {0}")]
    WorkerSpawn(String),

    /// A worker hung up its end of the job channel.
    #[error("collision worker channel disconnected")]
    WorkerDisconnected,

    /// A thread panicked while holding the shared transport region.
    #[error("shared transport region lock poisoned")]
    Poisoned,

    #[error("unknown particle type {0}")]
    UnknownType(TypeId),

    #[error("the default particle type cannot be {0}")]
    DefaultTypeLocked(&'static str),

    #[error("unknown preset '{0}'")]
    UnknownPreset(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidParam(msg.into())
    }
}
