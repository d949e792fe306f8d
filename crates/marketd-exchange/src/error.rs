//! Error types for marketd-exchange.

use thiserror::Error;

/// Adapter error types. The supervisor treats all of them as transient and
/// retries on the next reconciliation tick.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("WebSocket not connected")]
    NotConnected,

    #[error(transparent)]
    Transport(#[from] marketd_ws::WsError),

    #[error("REST probe failed: {0}")]
    Probe(String),

    #[error("No websocket endpoint configured for {0}")]
    MissingWsUrl(String),

    #[error(transparent)]
    Venue(#[from] marketd_core::CoreError),
}

/// Result type alias for adapter operations.
pub type AdapterResult<T> = std::result::Result<T, AdapterError>;
