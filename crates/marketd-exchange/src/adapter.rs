//! The streaming adapter.

use crate::error::{AdapterError, AdapterResult};
use crate::protocol;
use marketd_bus::MessageBus;
use marketd_core::{MarketType, SymbolRegistry, UnifiedSymbol, Venue};
use marketd_parsers::{HtxParser, VenueParser};
use marketd_ws::{Message, RestClient, WsConn};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// One subscribed pair with its system-internal id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketPair {
    pub symbol: String,
    pub pair_id: i64,
}

/// Catalog connection record for one venue.
#[derive(Debug, Clone)]
pub struct VenueEndpoints {
    pub name: String,
    /// REST base URL; empty disables the liveness probe.
    pub base_url: String,
    /// WebSocket endpoint. Not required for venues that derive it from a
    /// session-token fetch.
    pub ws_url: Option<String>,
}

/// Adapter tunables sourced from configuration.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub ping_interval: Duration,
    pub reconnect_delay: Duration,
    pub debug_log_raw: bool,
    pub debug_log_msg: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(25),
            reconnect_delay: Duration::from_secs(3),
            debug_log_raw: false,
            debug_log_msg: false,
        }
    }
}

#[derive(Debug, Clone)]
struct SubscriptionRequest {
    pairs: Vec<MarketPair>,
    market_type: MarketType,
    depth: u32,
}

/// Kucoin bullet-public response.
#[derive(Debug, Deserialize)]
struct BulletResponse {
    #[serde(default)]
    code: String,
    data: BulletData,
}

#[derive(Debug, Deserialize)]
struct BulletData {
    token: String,
    #[serde(rename = "instanceServers", default)]
    instance_servers: Vec<InstanceServer>,
}

#[derive(Debug, Deserialize)]
struct InstanceServer {
    endpoint: String,
}

/// Streaming adapter for one `(venue, market_type)` subscription key.
pub struct ExchangeAdapter {
    venue: Venue,
    endpoints: VenueEndpoints,
    config: AdapterConfig,
    registry: SymbolRegistry,
    parser: VenueParser,
    bus: Arc<MessageBus>,
    rest: RestClient,
    ws: Mutex<Option<Arc<WsConn>>>,
    active: AtomicBool,
    last_subscription: Mutex<Option<SubscriptionRequest>>,
    pair_ids: Mutex<HashMap<String, i64>>,
    shutdown: CancellationToken,
}

impl ExchangeAdapter {
    pub fn new(
        venue: Venue,
        endpoints: VenueEndpoints,
        bus: Arc<MessageBus>,
        config: AdapterConfig,
    ) -> AdapterResult<Self> {
        let rest = RestClient::new(endpoints.base_url.clone())?;
        Ok(Self {
            venue,
            endpoints,
            config,
            registry: SymbolRegistry::new(),
            parser: VenueParser::for_venue(venue),
            bus,
            rest,
            ws: Mutex::new(None),
            active: AtomicBool::new(false),
            last_subscription: Mutex::new(None),
            pair_ids: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn venue(&self) -> Venue {
        self.venue
    }

    /// Logical active flag AND socket connected.
    pub fn is_active(&self) -> bool {
        let connected = self
            .ws
            .lock()
            .as_ref()
            .map(|ws| ws.is_connected())
            .unwrap_or(false);
        self.active.load(Ordering::Acquire) && connected
    }

    /// Probe the venue, open the socket, and spawn the reader (and, for
    /// venues with client-initiated keep-alive, the writer).
    pub async fn start(self: Arc<Self>) -> AdapterResult<()> {
        info!(venue = %self.venue, "starting adapter");

        if self.endpoints.base_url.is_empty() {
            debug!(venue = %self.venue, "no rest endpoint configured, skipping probe");
        } else {
            let _: serde_json::Value = self
                .rest
                .get_json(protocol::probe_path(self.venue))
                .await
                .map_err(|e| AdapterError::Probe(e.to_string()))?;
            debug!(venue = %self.venue, "rest probe ok");
        }

        let ws_url = self.resolve_ws_url().await?;
        let ws = Arc::new(WsConn::new(ws_url));
        ws.connect().await?;
        *self.ws.lock() = Some(Arc::clone(&ws));
        self.active.store(true, Ordering::Release);

        let reader = Arc::clone(&self);
        tokio::spawn(async move { reader.read_loop().await });

        if let Some(frame) = protocol::keepalive(self.venue) {
            let writer = Arc::clone(&self);
            tokio::spawn(async move { writer.keepalive_loop(frame).await });
        }

        info!(venue = %self.venue, "adapter started");
        Ok(())
    }

    async fn resolve_ws_url(&self) -> AdapterResult<String> {
        if protocol::needs_session_token(self.venue) {
            let body = serde_json::json!({});
            let resp: BulletResponse = self
                .rest
                .post_json("/api/v1/bullet-public", &body)
                .await
                .map_err(|e| AdapterError::Probe(format!("token fetch: {e}")))?;
            if !resp.code.is_empty() && resp.code != "200000" {
                return Err(AdapterError::Probe(format!("token fetch: code {}", resp.code)));
            }
            let endpoint = resp
                .data
                .instance_servers
                .first()
                .map(|s| s.endpoint.clone())
                .ok_or_else(|| AdapterError::Probe("token fetch: no instance servers".into()))?;
            Ok(format!("{}?token={}", endpoint, resp.data.token))
        } else {
            self.endpoints
                .ws_url
                .clone()
                .filter(|u| !u.is_empty())
                .ok_or_else(|| AdapterError::MissingWsUrl(self.venue.to_string()))
        }
    }

    /// Reconcile the subscription to `pairs`: unsubscribe pairs absent from
    /// the new list, subscribe the newly present ones, and remember the
    /// full request for replay after reconnect.
    pub async fn subscribe(
        &self,
        pairs: &[MarketPair],
        market_type: MarketType,
        depth: u32,
    ) -> AdapterResult<()> {
        let request = SubscriptionRequest {
            pairs: pairs.to_vec(),
            market_type,
            depth,
        };

        let previous = self.last_subscription.lock().replace(request.clone());

        if let Some(prev) = previous {
            let gone: Vec<MarketPair> = prev
                .pairs
                .iter()
                .filter(|old| !pairs.iter().any(|new| new.symbol == old.symbol))
                .cloned()
                .collect();
            if !gone.is_empty() {
                if let Err(e) = self.unsubscribe(&gone, prev.market_type, prev.depth).await {
                    warn!(venue = %self.venue, error = %e, "unsubscribe of stale pairs failed");
                }
            }
        }

        {
            let mut ids = self.pair_ids.lock();
            for pair in pairs {
                if let Ok(unified) = self.parse_symbol(&pair.symbol, market_type) {
                    ids.insert(unified.symbol, pair.pair_id);
                }
            }
        }

        self.send_subscription(&request).await
    }

    async fn send_subscription(&self, request: &SubscriptionRequest) -> AdapterResult<()> {
        let ws = self.connected_ws()?;

        for pair in &request.pairs {
            let wire = match self.wire_symbol(&pair.symbol, request.market_type) {
                Some(w) => w,
                None => continue,
            };
            for frame in protocol::subscribe_frames(self.venue, &wire, request.depth) {
                if self.config.debug_log_raw {
                    debug!(venue = %self.venue, %frame, "sending subscribe");
                }
                ws.send_text(frame).await?;
            }
        }
        info!(
            venue = %self.venue,
            pairs = request.pairs.len(),
            market_type = %request.market_type,
            depth = request.depth,
            "subscription sent"
        );
        Ok(())
    }

    /// Drop the given pairs from the venue subscription and the pair-id map.
    pub async fn unsubscribe(
        &self,
        pairs: &[MarketPair],
        market_type: MarketType,
        depth: u32,
    ) -> AdapterResult<()> {
        let ws = self.connected_ws()?;

        for pair in pairs {
            if let Ok(unified) = self.parse_symbol(&pair.symbol, market_type) {
                self.pair_ids.lock().remove(&unified.symbol);
            }
            let wire = match self.wire_symbol(&pair.symbol, market_type) {
                Some(w) => w,
                None => continue,
            };
            for frame in protocol::unsubscribe_frames(self.venue, &wire, depth) {
                if self.config.debug_log_raw {
                    debug!(venue = %self.venue, %frame, "sending unsubscribe");
                }
                ws.send_text(frame).await?;
            }
        }
        Ok(())
    }

    /// Mark inactive and close the socket; reader and writer exit on their
    /// next iteration.
    pub async fn stop(&self) {
        info!(venue = %self.venue, "stopping adapter");
        self.active.store(false, Ordering::Release);
        self.shutdown.cancel();
        let ws = self.ws.lock().clone();
        if let Some(ws) = ws {
            ws.close().await;
        }
    }

    fn connected_ws(&self) -> AdapterResult<Arc<WsConn>> {
        self.ws
            .lock()
            .clone()
            .filter(|ws| ws.is_connected())
            .ok_or(AdapterError::NotConnected)
    }

    fn parse_symbol(
        &self,
        symbol: &str,
        market_type: MarketType,
    ) -> Result<UnifiedSymbol, marketd_core::CoreError> {
        UnifiedSymbol::parse(symbol, market_type)
    }

    /// Translate a catalog symbol into the venue wire form; a malformed
    /// symbol skips the pair rather than failing the whole subscription.
    fn wire_symbol(&self, symbol: &str, market_type: MarketType) -> Option<String> {
        match self.parse_symbol(symbol, market_type) {
            Ok(unified) => Some(self.registry.to_venue(self.venue, &unified)),
            Err(e) => {
                warn!(venue = %self.venue, symbol, error = %e, "unparseable symbol, skipping");
                None
            }
        }
    }

    async fn keepalive_loop(self: Arc<Self>, frame: Message) {
        let mut ticker = tokio::time::interval(self.config.ping_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await; // immediate first tick

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => return,
                _ = ticker.tick() => {}
            }
            if !self.active.load(Ordering::Acquire) {
                return;
            }
            let Ok(ws) = self.connected_ws() else { continue };
            if let Err(e) = ws.send(frame.clone()).await {
                warn!(venue = %self.venue, error = %e, "keep-alive send failed");
            } else {
                debug!(venue = %self.venue, "keep-alive sent");
            }
        }
    }

    async fn read_loop(self: Arc<Self>) {
        debug!(venue = %self.venue, "read loop started");
        loop {
            if !self.active.load(Ordering::Acquire) {
                debug!(venue = %self.venue, "adapter inactive, exiting read loop");
                return;
            }
            let Ok(ws) = self.connected_ws() else {
                if !self.reconnect().await {
                    return;
                }
                continue;
            };

            let result = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!(venue = %self.venue, "shutdown, exiting read loop");
                    return;
                }
                result = ws.read() => result,
            };

            match result {
                Ok(Some(Message::Text(text))) => self.handle_frame(text.as_bytes()),
                Ok(Some(Message::Binary(bytes))) => self.handle_frame(&bytes),
                Ok(Some(Message::Ping(payload))) => {
                    if let Err(e) = ws.send(Message::Pong(payload)).await {
                        warn!(venue = %self.venue, error = %e, "pong send failed");
                    }
                }
                Ok(Some(_)) => {}
                Ok(None) => {
                    warn!(venue = %self.venue, "stream ended, reconnecting");
                    if !self.reconnect().await {
                        return;
                    }
                }
                Err(e) => {
                    error!(venue = %self.venue, error = %e, "read error, reconnecting");
                    if !self.reconnect().await {
                        return;
                    }
                }
            }
        }
    }

    /// Fixed-backoff reconnect; never gives up while the adapter is
    /// active. Returns false when the adapter was stopped meanwhile.
    async fn reconnect(&self) -> bool {
        loop {
            if !self.active.load(Ordering::Acquire) || self.shutdown.is_cancelled() {
                return false;
            }
            tokio::select! {
                _ = self.shutdown.cancelled() => return false,
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }

            let ws = match self.ws.lock().clone() {
                Some(ws) => ws,
                None => return false,
            };
            match ws.reconnect().await {
                Ok(()) => {
                    info!(venue = %self.venue, "reconnected, replaying subscription");
                    let last = self.last_subscription.lock().clone();
                    if let Some(request) = last {
                        if let Err(e) = self.send_subscription(&request).await {
                            error!(venue = %self.venue, error = %e, "resubscribe failed");
                        }
                    }
                    return true;
                }
                Err(e) => {
                    error!(venue = %self.venue, error = %e, "reconnect failed, retrying");
                }
            }
        }
    }

    fn handle_frame(&self, raw: &[u8]) {
        if raw.is_empty() {
            return;
        }
        if self.config.debug_log_raw {
            debug!(venue = %self.venue, raw = %String::from_utf8_lossy(raw), "received frame");
        }

        // HTX keep-alive is server-initiated; echo it before parsing.
        if self.venue == Venue::Htx {
            if let Some(ping) = HtxParser::ping_value(raw) {
                let pong = protocol::htx_pong(ping);
                if let Ok(ws) = self.connected_ws() {
                    let venue = self.venue;
                    tokio::spawn(async move {
                        if let Err(e) = ws.send_text(pong).await {
                            warn!(%venue, error = %e, "htx pong send failed");
                        }
                    });
                }
                return;
            }
        }

        let parsed = match self.parser.parse(raw) {
            Ok(Some(msg)) => msg,
            Ok(None) => return, // control frame
            Err(e) => {
                if self.config.debug_log_raw {
                    warn!(venue = %self.venue, error = %e, raw = %String::from_utf8_lossy(raw), "parse error");
                } else {
                    warn!(venue = %self.venue, error = %e, "parse error");
                }
                return;
            }
        };

        let mut msg = parsed;
        msg.pair_id = self
            .pair_ids
            .lock()
            .get(&msg.symbol)
            .copied()
            .unwrap_or(0);
        if msg.pair_id == 0 {
            debug!(venue = %self.venue, symbol = %msg.symbol, "no pair id mapping");
        }

        if self.config.debug_log_msg {
            debug!(venue = %self.venue, message = ?msg, "publishing unified message");
        }
        self.bus.publish(self.venue.as_str(), msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(venue: Venue) -> Arc<ExchangeAdapter> {
        let endpoints = VenueEndpoints {
            name: venue.to_string(),
            base_url: String::new(),
            ws_url: Some("ws://127.0.0.1:1/ws".into()),
        };
        Arc::new(
            ExchangeAdapter::new(venue, endpoints, Arc::new(MessageBus::new()), AdapterConfig::default())
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_subscribe_requires_connection() {
        let a = adapter(Venue::Binance);
        let pairs = [MarketPair { symbol: "BTC/USDT".into(), pair_id: 7 }];
        let err = a.subscribe(&pairs, MarketType::Spot, 5).await.unwrap_err();
        assert!(matches!(err, AdapterError::NotConnected));
    }

    #[test]
    fn test_wire_symbol_skips_garbage() {
        let a = adapter(Venue::Binance);
        assert_eq!(a.wire_symbol("BTC/USDT", MarketType::Spot).unwrap(), "btcusdt");
        assert!(a.wire_symbol("??", MarketType::Spot).is_none());
    }

    #[tokio::test]
    async fn test_inactive_until_started() {
        let a = adapter(Venue::Binance);
        assert!(!a.is_active());
    }
}
