//! Error types for marketd-ws.

use thiserror::Error;

/// Transport error types. All are transient from the pipeline's point of
/// view: the adapter reconnects, the supervisor retries on the next tick.
#[derive(Debug, Error)]
pub enum WsError {
    #[error("Dial failed: {0}")]
    Dial(String),

    #[error("Not connected")]
    NotConnected,

    #[error("WebSocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Connection closed: {0}")]
    Closed(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("Session token fetch failed: {0}")]
    Token(String),
}

/// Result type alias for transport operations.
pub type WsResult<T> = std::result::Result<T, WsError>;
