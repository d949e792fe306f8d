//! Error types for marketd-parsers.

use thiserror::Error;

/// Parser error types. All are non-fatal: the adapter logs and continues.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Gzip decompress failed: {0}")]
    Decompress(#[from] std::io::Error),

    #[error("Unknown stream type: {0}")]
    UnknownStream(String),

    #[error("Invalid frame shape: {0}")]
    InvalidShape(String),

    #[error("Symbol error: {0}")]
    Symbol(#[from] marketd_core::CoreError),
}

/// Result type alias for parser operations.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
