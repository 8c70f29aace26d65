//! Error types for desired-state fetching.

use thiserror::Error;

/// Errors that can occur while producing the desired state.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The repository reference could not be resolved.
    #[error("Source unavailable: {location}: {reason}")]
    SourceUnavailable {
        /// The source location that failed to resolve.
        location: String,
        /// Why resolution failed.
        reason: String,
    },

    /// An external renderer exited non-zero. The diagnostic carries the
    /// renderer's raw output, never swallowed.
    #[error("Renderer '{renderer}' failed: {diagnostic}")]
    RenderError {
        /// The renderer command or name.
        renderer: String,
        /// The renderer's raw diagnostic output.
        diagnostic: String,
    },

    /// A secret reference could not be resolved.
    #[error("Secret unavailable: {reference}")]
    SecretUnavailable {
        /// The unresolved reference.
        reference: String,
    },

    /// The secret store refused access to a reference.
    #[error("Access denied to secret: {reference}")]
    AccessDenied {
        /// The refused reference.
        reference: String,
    },

    /// A rendered document is not a usable object manifest.
    #[error("Invalid manifest in {origin}: {source}")]
    InvalidManifest {
        /// Which rendered document was malformed.
        origin: String,
        /// The underlying validation error.
        #[source]
        source: driftlock_core::CoreError,
    },
}

impl SourceError {
    /// Creates a new `SourceUnavailable` error.
    #[must_use]
    pub fn unavailable(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `RenderError` carrying the renderer's diagnostics.
    #[must_use]
    pub fn render(renderer: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self::RenderError {
            renderer: renderer.into(),
            diagnostic: diagnostic.into(),
        }
    }

    /// Creates a new `SecretUnavailable` error.
    #[must_use]
    pub fn secret_unavailable(reference: impl Into<String>) -> Self {
        Self::SecretUnavailable {
            reference: reference.into(),
        }
    }

    /// Creates a new `AccessDenied` error.
    #[must_use]
    pub fn access_denied(reference: impl Into<String>) -> Self {
        Self::AccessDenied {
            reference: reference.into(),
        }
    }
}

/// Convenience result type for source operations
pub type Result<T> = std::result::Result<T, SourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_keeps_diagnostics() {
        let err = SourceError::render("overlay-tool", "line 3: unknown field 'replcas'");
        assert!(err.to_string().contains("unknown field 'replcas'"));
    }

    #[test]
    fn test_error_display() {
        let err = SourceError::unavailable("repos/shop", "no such directory");
        assert_eq!(
            err.to_string(),
            "Source unavailable: repos/shop: no such directory"
        );
        let err = SourceError::secret_unavailable("vault:db/password");
        assert_eq!(err.to_string(), "Secret unavailable: vault:db/password");
    }
}
