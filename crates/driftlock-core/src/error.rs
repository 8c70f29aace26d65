use thiserror::Error;

/// Core error types for Driftlock data model operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid application name: {0}")]
    InvalidApplicationName(String),

    #[error("Invalid manifest: {message}")]
    InvalidManifest { message: String },

    #[error("Manifest missing required field: {field}")]
    MissingField { field: String },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a new InvalidApplicationName error
    pub fn invalid_application_name(name: impl Into<String>) -> Self {
        Self::InvalidApplicationName(name.into())
    }

    /// Create a new InvalidManifest error
    pub fn invalid_manifest(message: impl Into<String>) -> Self {
        Self::InvalidManifest {
            message: message.into(),
        }
    }

    /// Create a new MissingField error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
