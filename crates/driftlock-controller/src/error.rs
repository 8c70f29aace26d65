//! Controller error type: every per-application failure funnels here so
//! the loop boundary can record it instead of propagating.

use thiserror::Error;

/// Errors surfaced by controller operations.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Desired-state fetching failed.
    #[error(transparent)]
    Source(#[from] driftlock_source::SourceError),

    /// The target system failed.
    #[error(transparent)]
    Target(#[from] driftlock_target::TargetError),

    /// The state store failed.
    #[error(transparent)]
    Store(#[from] driftlock_store::StoreError),

    /// A core validation failed.
    #[error(transparent)]
    Core(#[from] driftlock_core::CoreError),

    /// The application is not registered.
    #[error("Unknown application: {name}")]
    UnknownApplication {
        /// The unregistered name.
        name: String,
    },

    /// An application with this name is already registered.
    #[error("Application already exists: {name}")]
    AlreadyExists {
        /// The conflicting name.
        name: String,
    },
}

impl ControllerError {
    /// Creates a new `UnknownApplication` error.
    #[must_use]
    pub fn unknown_application(name: impl Into<String>) -> Self {
        Self::UnknownApplication { name: name.into() }
    }

    /// Creates a new `AlreadyExists` error.
    #[must_use]
    pub fn already_exists(name: impl Into<String>) -> Self {
        Self::AlreadyExists { name: name.into() }
    }
}

/// Convenience result type for controller operations
pub type Result<T> = std::result::Result<T, ControllerError>;
