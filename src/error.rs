//! Typed errors for the wizard engine

use thiserror::Error;

/// Top-level error type for the form engine
#[derive(Debug, Error)]
pub enum WizardError {
    /// Step index outside `0..len`; callers are expected to clamp first
    #[error("step index {index} out of range (form has {len} steps)")]
    StepOutOfRange { index: usize, len: usize },

    /// Field key not declared by the form schema
    #[error("unknown field '{0}'")]
    UnknownField(String),

    /// Dotted path that cannot be parsed into segments
    #[error("invalid field key '{0}'")]
    InvalidFieldKey(String),

    /// Schema construction violated a registry invariant
    #[error("schema invariant violated: {0}")]
    SchemaInvariant(String),

    /// A nested key was written through a non-mapping value
    #[error("cannot set '{key}': an ancestor is not a mapping")]
    PathConflict { key: String },

    /// An external collaborator reported a failure
    #[error("{service} service error: {message}")]
    Service { service: String, message: String },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP request errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl WizardError {
    /// Create a service error
    pub fn service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create a schema invariant error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::SchemaInvariant(message.into())
    }
}

pub type Result<T> = std::result::Result<T, WizardError>;
