//! HTX (Huobi) frame parser.
//!
//! HTX compresses every frame with gzip; the parser checks the magic bytes
//! (`0x1f 0x8b`) and inflates before decoding. `{"ping": N}` frames and
//! subscription acks (`id` present, no `ch`) map to `None` — the adapter
//! answers pings with `{"pong": N}`. Channels:
//! `market.<sym>.depth.stepK` (full snapshot), `market.<sym>.ticker`,
//! `market.<sym>.bbo`. Prices and volumes arrive as JSON numbers.

use crate::error::{ParseError, ParseResult};
use crate::util::{levels_from_num_pairs, ts_from_millis};
use flate2::read::GzDecoder;
use marketd_core::{
    MarketType, MessageData, OrderBookUpdateType, SymbolRegistry, UnifiedBestPrice,
    UnifiedMessage, UnifiedOrderBook, UnifiedTicker, Venue,
};
use serde::Deserialize;
use serde_json::Value;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    ch: String,
    #[serde(default)]
    ts: i64,
    #[serde(default)]
    tick: Value,
    #[serde(default)]
    id: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct DepthTick {
    #[serde(default)]
    bids: Vec<Vec<f64>>,
    #[serde(default)]
    asks: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct TickerTick {
    #[serde(default)]
    open: f64,
    #[serde(default)]
    high: f64,
    #[serde(default)]
    low: f64,
    #[serde(default)]
    close: f64,
    #[serde(default)]
    vol: f64,
    #[serde(default)]
    bid: f64,
    #[serde(default)]
    ask: f64,
}

#[derive(Debug, Deserialize)]
struct BboTick {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    bid: f64,
    #[serde(rename = "bidSize", default)]
    bid_size: f64,
    #[serde(default)]
    ask: f64,
    #[serde(rename = "askSize", default)]
    ask_size: f64,
}

#[derive(Debug, Clone, Default)]
pub struct HtxParser {
    registry: SymbolRegistry,
}

impl HtxParser {
    pub fn new() -> Self {
        Self {
            registry: SymbolRegistry::new(),
        }
    }

    /// Inflate a gzip frame; plain frames pass through untouched.
    pub fn decompress(raw: &[u8]) -> ParseResult<Vec<u8>> {
        if raw.len() < 2 || raw[0] != 0x1f || raw[1] != 0x8b {
            return Ok(raw.to_vec());
        }
        let mut decoder = GzDecoder::new(raw);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }

    /// Extract the ping value from a `{"ping": N}` frame, if any.
    /// Accepts both compressed and plain input.
    pub fn ping_value(raw: &[u8]) -> Option<i64> {
        let plain = Self::decompress(raw).ok()?;
        let value: Value = serde_json::from_slice(&plain).ok()?;
        value.get("ping")?.as_i64()
    }

    pub fn parse(&self, raw: &[u8]) -> ParseResult<Option<UnifiedMessage>> {
        let plain = Self::decompress(raw)?;

        // ping/pong keep-alives are control traffic
        if let Ok(value) = serde_json::from_slice::<Value>(&plain) {
            if value.get("ping").is_some() || value.get("pong").is_some() {
                return Ok(None);
            }
        }

        let envelope: Envelope = serde_json::from_slice(&plain)?;

        // subscription ack: id present without a channel
        if envelope.id.is_some() && envelope.ch.is_empty() {
            return Ok(None);
        }
        if envelope.ch.is_empty() {
            return Ok(None);
        }

        let timestamp = ts_from_millis(envelope.ts);

        if envelope.ch.contains(".depth") {
            self.parse_order_book(envelope, timestamp).map(Some)
        } else if envelope.ch.contains(".ticker") {
            self.parse_ticker(envelope, timestamp).map(Some)
        } else if envelope.ch.contains(".bbo") {
            self.parse_bbo(envelope, timestamp).map(Some)
        } else {
            Err(ParseError::UnknownStream(envelope.ch))
        }
    }

    fn parse_order_book(
        &self,
        envelope: Envelope,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> ParseResult<UnifiedMessage> {
        let tick: DepthTick = serde_json::from_value(envelope.tick.clone())?;
        let venue_symbol = symbol_from_channel(&envelope.ch)
            .ok_or_else(|| ParseError::InvalidShape(format!("no symbol in channel {}", envelope.ch)))?;

        let unified_symbol =
            self.registry
                .to_unified(Venue::Htx, &venue_symbol, MarketType::Spot)?;

        let mut book = UnifiedOrderBook::new(
            unified_symbol.clone(),
            timestamp,
            levels_from_num_pairs(&tick.bids),
            levels_from_num_pairs(&tick.asks),
            OrderBookUpdateType::Snapshot,
        );
        book.raw = Some(envelope.tick);

        Ok(UnifiedMessage::new(
            Venue::Htx,
            unified_symbol,
            timestamp,
            MessageData::OrderBook(book),
        ))
    }

    fn parse_ticker(
        &self,
        envelope: Envelope,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> ParseResult<UnifiedMessage> {
        let tick: TickerTick = serde_json::from_value(envelope.tick)?;
        let venue_symbol = symbol_from_channel(&envelope.ch)
            .ok_or_else(|| ParseError::InvalidShape(format!("no symbol in channel {}", envelope.ch)))?;

        let unified_symbol =
            self.registry
                .to_unified(Venue::Htx, &venue_symbol, MarketType::Spot)?;

        let change = tick.close - tick.open;
        let change_pct = if tick.open != 0.0 {
            change / tick.open * 100.0
        } else {
            0.0
        };

        let ticker = UnifiedTicker {
            symbol: unified_symbol.symbol.clone(),
            timestamp,
            last_price: tick.close,
            best_bid: tick.bid,
            best_ask: tick.ask,
            volume_24h: tick.vol,
            change_24h: change,
            change_pct_24h: change_pct,
            high_24h: tick.high,
            low_24h: tick.low,
        };

        Ok(UnifiedMessage::new(
            Venue::Htx,
            unified_symbol,
            timestamp,
            MessageData::Ticker(ticker),
        ))
    }

    fn parse_bbo(
        &self,
        envelope: Envelope,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> ParseResult<UnifiedMessage> {
        let tick: BboTick = serde_json::from_value(envelope.tick)?;

        let venue_symbol = if !tick.symbol.is_empty() {
            tick.symbol.clone()
        } else {
            symbol_from_channel(&envelope.ch)
                .ok_or_else(|| ParseError::InvalidShape("no symbol in bbo message".into()))?
        };

        let unified_symbol =
            self.registry
                .to_unified(Venue::Htx, &venue_symbol, MarketType::Spot)?;

        let best = UnifiedBestPrice {
            symbol: unified_symbol.symbol.clone(),
            timestamp,
            best_bid: tick.bid,
            best_ask: tick.ask,
            bid_volume: tick.bid_size,
            ask_volume: tick.ask_size,
        };

        Ok(UnifiedMessage::new(
            Venue::Htx,
            unified_symbol,
            timestamp,
            MessageData::BestPrice(best),
        ))
    }
}

/// `market.btcusdt.depth.step0` → `BTCUSDT`
fn symbol_from_channel(channel: &str) -> Option<String> {
    let mut parts = channel.split('.');
    if parts.next()? != "market" {
        return None;
    }
    let sym = parts.next()?;
    if sym.is_empty() {
        None
    } else {
        Some(sym.to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use marketd_core::MessageType;
    use serde_json::json;
    use std::io::Write;

    fn gz(payload: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(payload.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_gzip_ping_is_control() {
        let parser = HtxParser::new();
        let frame = gz(r#"{"ping": 1700000000}"#);
        assert!(parser.parse(&frame).unwrap().is_none());
        assert_eq!(HtxParser::ping_value(&frame), Some(1700000000));
    }

    #[test]
    fn test_subscription_ack_is_control() {
        let parser = HtxParser::new();
        let frame = gz(r#"{"id": "sub-btcusdt-0", "status": "ok", "subbed": "market.btcusdt.depth.step0", "ts": 1}"#);
        assert!(parser.parse(&frame).unwrap().is_none());
    }

    #[test]
    fn test_gzip_depth_snapshot() {
        let parser = HtxParser::new();
        let frame = json!({
            "ch": "market.btcusdt.depth.step0",
            "ts": 1700000000000i64,
            "tick": {
                "bids": [[100.0, 1.0], [99.9, 2.0]],
                "asks": [[100.1, 1.5]]
            }
        });
        let msg = parser.parse(&gz(&frame.to_string())).unwrap().unwrap();
        assert_eq!(msg.symbol, "BTC/USDT");
        let MessageData::OrderBook(book) = &msg.data else { panic!() };
        assert_eq!(book.update_type, OrderBookUpdateType::Snapshot);
        assert_eq!(book.bids[0].price, 100.0);
        assert!(book.asks[0].price > book.bids[0].price);
    }

    #[test]
    fn test_plain_frame_accepted() {
        // Defensive: uncompressed frames must parse too.
        let parser = HtxParser::new();
        let frame = json!({
            "ch": "market.ethusdt.bbo",
            "ts": 1700000000000i64,
            "tick": { "symbol": "ethusdt", "bid": 10.0, "bidSize": 1.0, "ask": 10.1, "askSize": 2.0 }
        });
        let msg = parser.parse(frame.to_string().as_bytes()).unwrap().unwrap();
        assert_eq!(msg.message_type, MessageType::BestPrice);
        assert_eq!(msg.symbol, "ETH/USDT");
    }

    #[test]
    fn test_ticker_change_derivation() {
        let parser = HtxParser::new();
        let frame = json!({
            "ch": "market.btcusdt.ticker",
            "ts": 1700000000000i64,
            "tick": { "open": 100.0, "close": 110.0, "high": 112.0, "low": 99.0, "vol": 5.0, "bid": 109.9, "ask": 110.1 }
        });
        let msg = parser.parse(&gz(&frame.to_string())).unwrap().unwrap();
        let MessageData::Ticker(t) = &msg.data else { panic!() };
        assert_eq!(t.change_24h, 10.0);
        assert!((t.change_pct_24h - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_channel_is_error() {
        let parser = HtxParser::new();
        let frame = json!({ "ch": "market.btcusdt.kline.1min", "ts": 1, "tick": {} });
        assert!(parser.parse(frame.to_string().as_bytes()).is_err());
    }
}
