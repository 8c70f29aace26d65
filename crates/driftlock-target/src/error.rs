//! Target system error taxonomy.

use driftlock_core::ObjectId;
use thiserror::Error;

/// Errors that can occur when talking to the target system.
#[derive(Debug, Error)]
pub enum TargetError {
    /// The target system could not be reached. Transient, retryable.
    #[error("Target unreachable: {reason}")]
    Unreachable {
        /// Why the call did not complete.
        reason: String,
    },

    /// The target refused the credentials or the operation. Fatal for
    /// this application until policy changes.
    #[error("Permission denied: {operation}")]
    PermissionDenied {
        /// The refused operation.
        operation: String,
    },

    /// Optimistic concurrency conflict. Transient: re-read and retry.
    #[error("Conflict on {object}: expected version {expected}, found {actual}")]
    Conflict {
        /// The contended object.
        object: ObjectId,
        /// The version the caller presented.
        expected: String,
        /// The version the target holds.
        actual: String,
    },

    /// The target is shedding load. Transient, retryable with backoff.
    #[error("Throttled by target: {reason}")]
    Throttled {
        /// The target's throttling diagnostic.
        reason: String,
    },

    /// The target rejected the object specification. Never retried.
    #[error("Validation failed for {object}: {message}")]
    Validation {
        /// The rejected object.
        object: ObjectId,
        /// The target's validation diagnostic.
        message: String,
    },

    /// The object does not exist.
    #[error("Object not found: {object}")]
    NotFound {
        /// The missing object.
        object: ObjectId,
    },

    /// An internal target error occurred.
    #[error("Internal target error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl TargetError {
    /// Creates a new `Unreachable` error.
    #[must_use]
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self::Unreachable {
            reason: reason.into(),
        }
    }

    /// Creates a new `PermissionDenied` error.
    #[must_use]
    pub fn permission_denied(operation: impl Into<String>) -> Self {
        Self::PermissionDenied {
            operation: operation.into(),
        }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(object: ObjectId, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::Conflict {
            object,
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a new `Throttled` error.
    #[must_use]
    pub fn throttled(reason: impl Into<String>) -> Self {
        Self::Throttled {
            reason: reason.into(),
        }
    }

    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(object: ObjectId, message: impl Into<String>) -> Self {
        Self::Validation {
            object,
            message: message.into(),
        }
    }

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(object: ObjectId) -> Self {
        Self::NotFound { object }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True when the error is transient and eligible for retry with
    /// backoff: unreachable, throttled, or a version conflict.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unreachable { .. } | Self::Throttled { .. } | Self::Conflict { .. }
        )
    }

    /// True when the error invalidates the application until its policy
    /// or credentials change.
    #[must_use]
    pub fn is_permission(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }

    /// True for per-object validation failures, which never retry and
    /// never block sibling items.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

/// Convenience result type for target operations
pub type Result<T> = std::result::Result<T, TargetError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> ObjectId {
        ObjectId::namespaced("Workload", "prod", "api")
    }

    #[test]
    fn test_transient_classification() {
        assert!(TargetError::unreachable("timeout").is_transient());
        assert!(TargetError::throttled("429").is_transient());
        assert!(TargetError::conflict(id(), "1", "2").is_transient());
        assert!(!TargetError::validation(id(), "bad spec").is_transient());
        assert!(!TargetError::permission_denied("list").is_transient());
        assert!(!TargetError::not_found(id()).is_transient());
    }

    #[test]
    fn test_validation_and_permission_predicates() {
        assert!(TargetError::validation(id(), "bad").is_validation());
        assert!(!TargetError::validation(id(), "bad").is_permission());
        assert!(TargetError::permission_denied("delete").is_permission());
    }

    #[test]
    fn test_display() {
        let err = TargetError::conflict(id(), "1", "2");
        assert_eq!(
            err.to_string(),
            "Conflict on Workload/prod/api: expected version 1, found 2"
        );
    }
}
