//! Error types for the lab engine.
//!
//! `CliError` is what the simulated device prints back to the learner: its
//! `Display` text is the exact rejection line. The remaining enums cover the
//! infrastructure around the interpreter (session storage, lab loading).

use thiserror::Error;

/// Device-style rejection produced while handling one command line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CliError {
    #[error("% Invalid input detected.")]
    InvalidInput,

    /// Caret-style rejection used by exec commands such as `show`.
    #[error("% Invalid input detected at '^' marker.")]
    InvalidAtMarker,

    #[error("% Incomplete command.")]
    Incomplete,

    #[error("% Invalid line")]
    InvalidLine,

    #[error("% Invalid interface type and number")]
    InvalidInterface,

    #[error("% Error: Interface context lost. Returning to global config.")]
    InterfaceContextLost,

    #[error("% Error: Line context lost.")]
    LineContextLost,

    #[error("% Error: Policy context lost.")]
    PolicyContextLost,

    #[error("% System Error: {0}")]
    System(String),
}

impl CliError {
    /// True for the errors that roll the device back to its pre-command state.
    pub fn is_internal(&self) -> bool {
        matches!(self, CliError::System(_))
    }
}

/// Failures of a [`crate::session_store::SessionStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session '{0}' not found")]
    NotFound(String),

    #[error("invalid session id '{0}'")]
    InvalidId(String),

    #[error("session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("session data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures while loading a lab scenario.
#[derive(Debug, Error)]
pub enum LabError {
    #[error("cannot read lab file: {0}")]
    Io(#[from] std::io::Error),

    #[error("lab definition is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures surfaced by [`crate::processor::LabEngine`] and the device switch.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("access denied: device '{0}' is not part of this lab")]
    AccessDenied(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
