//! WebSocket and REST plumbing for exchange connections.
//!
//! Provides [`WsConn`], a re-dialable WebSocket with a mutex-guarded writer
//! and a single-consumer reader, and [`RestClient`], a bounded-timeout JSON
//! client for liveness probes and token fetches.

pub mod conn;
pub mod error;
pub mod rest;

pub use conn::WsConn;
pub use error::{WsError, WsResult};
pub use rest::RestClient;
pub use tokio_tungstenite::tungstenite::Message;

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any WebSocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
