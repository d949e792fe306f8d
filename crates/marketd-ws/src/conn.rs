//! Re-dialable WebSocket connection.
//!
//! The writer half sits behind an async mutex so keep-alive and subscribe
//! frames from different tasks interleave safely; the reader half is
//! consumed by exactly one read loop. Neither lock is held across the
//! other's I/O. `reconnect` re-dials in place, replacing both halves.

use crate::error::{WsError, WsResult};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// One WebSocket connection to a venue.
pub struct WsConn {
    url: String,
    writer: Mutex<Option<WsSink>>,
    reader: Mutex<Option<WsStream>>,
    connected: AtomicBool,
}

impl WsConn {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            writer: Mutex::new(None),
            reader: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Dial the endpoint and install the stream halves.
    pub async fn connect(&self) -> WsResult<()> {
        let (stream, _response) = connect_async(&self.url)
            .await
            .map_err(|e| WsError::Dial(e.to_string()))?;
        let (sink, source) = stream.split();

        *self.writer.lock().await = Some(sink);
        *self.reader.lock().await = Some(source);
        self.connected.store(true, Ordering::Release);
        info!(url = %self.url, "websocket connected");
        Ok(())
    }

    /// Drop the current halves and dial again.
    pub async fn reconnect(&self) -> WsResult<()> {
        self.close().await;
        self.connect().await?;
        debug!(url = %self.url, "websocket reconnected");
        Ok(())
    }

    /// Send one text frame.
    pub async fn send_text(&self, payload: String) -> WsResult<()> {
        self.send(Message::Text(payload)).await
    }

    pub async fn send(&self, msg: Message) -> WsResult<()> {
        let mut guard = self.writer.lock().await;
        let sink = guard.as_mut().ok_or(WsError::NotConnected)?;
        sink.send(msg).await.map_err(|e| {
            self.connected.store(false, Ordering::Release);
            WsError::from(e)
        })
    }

    /// Read one frame. `Ok(None)` means the peer closed the stream.
    ///
    /// Only the read loop may call this; the returned future is
    /// cancel-safe, so callers select on a cancellation token.
    pub async fn read(&self) -> WsResult<Option<Message>> {
        let mut guard = self.reader.lock().await;
        let source = guard.as_mut().ok_or(WsError::NotConnected)?;
        match source.next().await {
            Some(Ok(msg)) => Ok(Some(msg)),
            Some(Err(e)) => {
                self.connected.store(false, Ordering::Release);
                Err(WsError::from(e))
            }
            None => {
                self.connected.store(false, Ordering::Release);
                Ok(None)
            }
        }
    }

    /// Close the socket; a pending read returns on stream end.
    pub async fn close(&self) {
        self.connected.store(false, Ordering::Release);
        if let Some(mut sink) = self.writer.lock().await.take() {
            let _ = sink.send(Message::Close(None)).await;
            let _ = sink.close().await;
        }
        *self.reader.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconnected_io_fails() {
        let conn = WsConn::new("ws://127.0.0.1:1/ws");
        assert!(!conn.is_connected());
        assert!(matches!(
            conn.send_text("x".into()).await,
            Err(WsError::NotConnected)
        ));
        assert!(matches!(conn.read().await, Err(WsError::NotConnected)));
    }

    #[tokio::test]
    async fn test_dial_failure_is_typed() {
        let conn = WsConn::new("ws://127.0.0.1:1/ws");
        assert!(matches!(conn.connect().await, Err(WsError::Dial(_))));
        assert!(!conn.is_connected());
    }
}
