//! Ledger error types.

use thiserror::Error;

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur while reading or updating usage records.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Failed to configure ledger: {0}")]
    ConfigError(String),

    #[error("Malformed usage record: {0}")]
    MalformedRecord(String),

    #[error("DynamoDB error: {0}")]
    Dynamo(String),
}

impl LedgerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRecord(msg.into())
    }
}
