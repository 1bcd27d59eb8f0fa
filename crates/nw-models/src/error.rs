//! Model validation errors.

use thiserror::Error;

/// Result type for model validation.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while parsing or validating model values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("Invalid document name: {0}")]
    InvalidStem(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

impl ModelError {
    pub fn invalid_stem(msg: impl Into<String>) -> Self {
        Self::InvalidStem(msg.into())
    }

    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey(msg.into())
    }
}
