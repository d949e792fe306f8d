//! CoinEx frame parser.
//!
//! JSON-RPC-like frames with a `method` and a heterogeneous `params`
//! array. `depth.update` params are `[is_full, depth_obj, symbol]`;
//! `state.update` params are `[{SYMBOL: fields}]`. `server.ping` frames
//! and id-only responses (subscribe acks) map to `None`.

use crate::error::{ParseError, ParseResult};
use crate::util::{levels_from_str_pairs, parse_f64};
use chrono::Utc;
use marketd_core::{
    MarketType, MessageData, OrderBookUpdateType, SymbolRegistry, UnifiedMessage,
    UnifiedOrderBook, UnifiedTicker, Venue,
};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    method: String,
    #[serde(default)]
    params: Vec<Value>,
    #[serde(default)]
    id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct DepthData {
    #[serde(default)]
    bids: Vec<Vec<String>>,
    #[serde(default)]
    asks: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct CoinexParser {
    registry: SymbolRegistry,
}

impl CoinexParser {
    pub fn new() -> Self {
        Self {
            registry: SymbolRegistry::new(),
        }
    }

    pub fn parse(&self, raw: &[u8]) -> ParseResult<Option<UnifiedMessage>> {
        let envelope: Envelope = serde_json::from_slice(raw)?;

        match envelope.method.as_str() {
            "depth.update" => self.parse_depth_update(envelope).map(Some),
            "state.update" => self.parse_state_update(envelope).map(Some),
            "server.ping" => Ok(None),
            "" if envelope.id.is_some() => Ok(None), // subscribe/unsubscribe response
            other => Err(ParseError::UnknownStream(other.to_string())),
        }
    }

    fn parse_depth_update(&self, envelope: Envelope) -> ParseResult<UnifiedMessage> {
        if envelope.params.len() < 3 {
            return Err(ParseError::InvalidShape("depth.update params too short".into()));
        }

        let is_full = envelope.params[0]
            .as_bool()
            .ok_or_else(|| ParseError::InvalidShape("depth.update is_full flag missing".into()))?;
        let depth_value = envelope.params[1].clone();
        let venue_symbol = envelope.params[2]
            .as_str()
            .ok_or_else(|| ParseError::InvalidShape("depth.update symbol missing".into()))?;

        let depth_data: DepthData = serde_json::from_value(depth_value.clone())?;

        let unified_symbol =
            self.registry
                .to_unified(Venue::Coinex, venue_symbol, MarketType::Spot)?;

        let update_type = if is_full {
            OrderBookUpdateType::Snapshot
        } else {
            OrderBookUpdateType::Incremental
        };

        let timestamp = Utc::now();
        let mut book = UnifiedOrderBook::new(
            unified_symbol.clone(),
            timestamp,
            levels_from_str_pairs(&depth_data.bids),
            levels_from_str_pairs(&depth_data.asks),
            update_type,
        );
        book.raw = Some(depth_value);

        Ok(UnifiedMessage::new(
            Venue::Coinex,
            unified_symbol,
            timestamp,
            MessageData::OrderBook(book),
        ))
    }

    fn parse_state_update(&self, envelope: Envelope) -> ParseResult<UnifiedMessage> {
        let first = envelope
            .params
            .first()
            .ok_or_else(|| ParseError::InvalidShape("state.update params empty".into()))?;
        let map = first
            .as_object()
            .ok_or_else(|| ParseError::InvalidShape("state.update payload is not an object".into()))?;

        // Updates arrive one symbol per frame.
        let (venue_symbol, state) = map
            .iter()
            .next()
            .ok_or_else(|| ParseError::InvalidShape("state.update with no symbol".into()))?;
        let state = state
            .as_object()
            .ok_or_else(|| ParseError::InvalidShape(format!("bad state data for {venue_symbol}")))?;

        let unified_symbol =
            self.registry
                .to_unified(Venue::Coinex, venue_symbol, MarketType::Spot)?;

        let field = |name: &str| -> f64 {
            state
                .get(name)
                .and_then(Value::as_str)
                .map(parse_f64)
                .unwrap_or(0.0)
        };

        let timestamp = Utc::now();
        let ticker = UnifiedTicker {
            symbol: unified_symbol.symbol.clone(),
            timestamp,
            last_price: field("last"),
            best_bid: 0.0,
            best_ask: 0.0,
            volume_24h: field("volume"),
            change_24h: 0.0,
            change_pct_24h: 0.0,
            high_24h: field("high"),
            low_24h: field("low"),
        };

        Ok(UnifiedMessage::new(
            Venue::Coinex,
            unified_symbol,
            timestamp,
            MessageData::Ticker(ticker),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketd_core::MessageType;
    use serde_json::json;

    #[test]
    fn test_depth_full_is_snapshot() {
        let parser = CoinexParser::new();
        let frame = json!({
            "method": "depth.update",
            "params": [true, {"bids": [["100", "1"]], "asks": [["101", "1"]]}, "BTCUSDT"]
        });
        let msg = parser.parse(frame.to_string().as_bytes()).unwrap().unwrap();
        assert_eq!(msg.symbol, "BTC/USDT");
        let MessageData::OrderBook(book) = &msg.data else { panic!() };
        assert_eq!(book.update_type, OrderBookUpdateType::Snapshot);
    }

    #[test]
    fn test_depth_partial_is_incremental() {
        let parser = CoinexParser::new();
        let frame = json!({
            "method": "depth.update",
            "params": [false, {"bids": [["100", "0"]], "asks": []}, "BTCUSDT"]
        });
        let msg = parser.parse(frame.to_string().as_bytes()).unwrap().unwrap();
        let MessageData::OrderBook(book) = &msg.data else { panic!() };
        assert_eq!(book.update_type, OrderBookUpdateType::Incremental);
        assert_eq!(book.bids[0].volume, 0.0);
    }

    #[test]
    fn test_state_update_ticker() {
        let parser = CoinexParser::new();
        let frame = json!({
            "method": "state.update",
            "params": [{
                "BTCUSDT": { "last": "114114", "high": "115000", "low": "113000", "volume": "42.5" }
            }]
        });
        let msg = parser.parse(frame.to_string().as_bytes()).unwrap().unwrap();
        assert_eq!(msg.message_type, MessageType::Ticker);
        let MessageData::Ticker(t) = &msg.data else { panic!() };
        assert_eq!(t.last_price, 114114.0);
        assert_eq!(t.volume_24h, 42.5);
    }

    #[test]
    fn test_ping_and_id_responses_are_control() {
        let parser = CoinexParser::new();
        let ping = json!({ "method": "server.ping", "params": [] });
        assert!(parser.parse(ping.to_string().as_bytes()).unwrap().is_none());

        let ack = json!({ "id": 1, "result": {"status": "success"}, "error": null });
        assert!(parser.parse(ack.to_string().as_bytes()).unwrap().is_none());
    }

    #[test]
    fn test_unknown_method_is_error() {
        let parser = CoinexParser::new();
        let frame = json!({ "method": "deals.update", "params": [] });
        assert!(parser.parse(frame.to_string().as_bytes()).is_err());
    }
}
