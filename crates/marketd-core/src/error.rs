//! Error types for marketd-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Unknown venue: {0}")]
    UnknownVenue(String),

    #[error("Unknown market type: {0}")]
    UnknownMarketType(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
