//! Error types for the triage engine.

use thiserror::Error;

/// Result type alias using the triage engine's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type.
///
/// Note that the classification pipeline itself is total: failures on the
/// hot path are folded into [`crate::ClassificationResult`] rather than
/// raised. This enum covers the administrative and setup surfaces where an
/// explicit `Result` is the right contract.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
