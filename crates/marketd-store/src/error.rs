//! Error types for marketd-store.

use thiserror::Error;

/// Store error types.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unsupported database type: {0}")]
    UnsupportedType(String),

    #[error("Exchange not found: {0}")]
    ExchangeNotFound(String),

    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
