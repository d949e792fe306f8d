//! Bybit frame parser.
//!
//! Frames carry `topic`, `type`, `data` and a millisecond `ts`. The topic
//! prefix routes (`orderbook.*` vs `tickers.*`); `data` may be a single
//! object or a singleton array. `type == "snapshot"` marks a full book,
//! anything else is a delta.

use crate::error::{ParseError, ParseResult};
use crate::util::{levels_from_str_pairs, parse_f64, ts_from_millis};
use marketd_core::{
    MarketType, MessageData, OrderBookUpdateType, SymbolRegistry, UnifiedMessage,
    UnifiedOrderBook, UnifiedTicker, Venue,
};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    topic: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    ts: i64,
}

#[derive(Debug, Deserialize)]
struct OrderBookData {
    #[serde(rename = "s", default)]
    symbol: String,
    #[serde(rename = "b", default)]
    bids: Vec<Vec<String>>,
    #[serde(rename = "a", default)]
    asks: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct TickerData {
    #[serde(default)]
    symbol: String,
    #[serde(rename = "lastPrice", default)]
    last_price: String,
    #[serde(rename = "bid1Price", default)]
    bid_price: String,
    #[serde(rename = "ask1Price", default)]
    ask_price: String,
    #[serde(rename = "volume24h", default)]
    volume_24h: String,
    #[serde(rename = "price24hPcnt", default)]
    price_24h_pcnt: String,
    #[serde(rename = "highPrice24h", default)]
    high_24h: String,
    #[serde(rename = "lowPrice24h", default)]
    low_24h: String,
    #[serde(rename = "prevPrice24h", default)]
    prev_24h: String,
}

#[derive(Debug, Clone, Default)]
pub struct BybitParser {
    registry: SymbolRegistry,
}

impl BybitParser {
    pub fn new() -> Self {
        Self {
            registry: SymbolRegistry::new(),
        }
    }

    pub fn parse(&self, raw: &[u8]) -> ParseResult<Option<UnifiedMessage>> {
        let envelope: Envelope = serde_json::from_slice(raw)?;
        let timestamp = ts_from_millis(envelope.ts);

        if envelope.topic.contains("orderbook") {
            self.parse_order_book(envelope, timestamp).map(Some)
        } else if envelope.topic.contains("tickers") {
            self.parse_ticker(envelope, timestamp).map(Some)
        } else {
            Err(ParseError::UnknownStream(envelope.topic))
        }
    }

    fn parse_order_book(
        &self,
        envelope: Envelope,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> ParseResult<UnifiedMessage> {
        let data = unwrap_singleton(envelope.data);
        let book_data: OrderBookData = serde_json::from_value(data.clone())?;
        if book_data.symbol.is_empty() {
            return Err(ParseError::InvalidShape("orderbook data without symbol".into()));
        }

        let unified_symbol =
            self.registry
                .to_unified(Venue::Bybit, &book_data.symbol, MarketType::Spot)?;

        let update_type = if envelope.kind == "snapshot" {
            OrderBookUpdateType::Snapshot
        } else {
            OrderBookUpdateType::Incremental
        };

        let mut book = UnifiedOrderBook::new(
            unified_symbol.clone(),
            timestamp,
            levels_from_str_pairs(&book_data.bids),
            levels_from_str_pairs(&book_data.asks),
            update_type,
        );
        book.raw = Some(data);

        Ok(UnifiedMessage::new(
            Venue::Bybit,
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
        let data = unwrap_singleton(envelope.data);
        let ticker_data: TickerData = serde_json::from_value(data)?;
        if ticker_data.symbol.is_empty() {
            return Err(ParseError::InvalidShape("ticker data without symbol".into()));
        }

        let unified_symbol =
            self.registry
                .to_unified(Venue::Bybit, &ticker_data.symbol, MarketType::Spot)?;

        let last = parse_f64(&ticker_data.last_price);
        let ticker = UnifiedTicker {
            symbol: unified_symbol.symbol.clone(),
            timestamp,
            last_price: last,
            best_bid: parse_f64(&ticker_data.bid_price),
            best_ask: parse_f64(&ticker_data.ask_price),
            volume_24h: parse_f64(&ticker_data.volume_24h),
            change_24h: last - parse_f64(&ticker_data.prev_24h),
            change_pct_24h: parse_f64(&ticker_data.price_24h_pcnt),
            high_24h: parse_f64(&ticker_data.high_24h),
            low_24h: parse_f64(&ticker_data.low_24h),
        };

        Ok(UnifiedMessage::new(
            Venue::Bybit,
            unified_symbol,
            timestamp,
            MessageData::Ticker(ticker),
        ))
    }
}

/// Bybit sometimes wraps `data` in a singleton array.
fn unwrap_singleton(data: Value) -> Value {
    match data {
        Value::Array(mut items) if !items.is_empty() => items.remove(0),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketd_core::MessageType;
    use serde_json::json;

    #[test]
    fn test_snapshot_vs_delta() {
        let parser = BybitParser::new();

        let snap = json!({
            "topic": "orderbook.50.BTCUSDT",
            "type": "snapshot",
            "ts": 1700000000123i64,
            "data": { "s": "BTCUSDT", "b": [["100", "1"]], "a": [["101", "2"]] }
        });
        let msg = parser.parse(snap.to_string().as_bytes()).unwrap().unwrap();
        let MessageData::OrderBook(book) = &msg.data else { panic!() };
        assert_eq!(book.update_type, OrderBookUpdateType::Snapshot);
        assert_eq!(msg.symbol, "BTC/USDT");

        let delta = json!({
            "topic": "orderbook.50.BTCUSDT",
            "type": "delta",
            "ts": 1700000000456i64,
            "data": { "s": "BTCUSDT", "b": [["100", "0"]], "a": [] }
        });
        let msg = parser.parse(delta.to_string().as_bytes()).unwrap().unwrap();
        let MessageData::OrderBook(book) = &msg.data else { panic!() };
        assert_eq!(book.update_type, OrderBookUpdateType::Incremental);
    }

    #[test]
    fn test_data_as_singleton_array() {
        let parser = BybitParser::new();
        let frame = json!({
            "topic": "orderbook.1.ETHUSDT",
            "type": "snapshot",
            "ts": 0,
            "data": [{ "s": "ETHUSDT", "b": [["10", "5"]], "a": [["11", "6"]] }]
        });
        let msg = parser.parse(frame.to_string().as_bytes()).unwrap().unwrap();
        assert_eq!(msg.symbol, "ETH/USDT");
    }

    #[test]
    fn test_venue_timestamp_preferred() {
        let parser = BybitParser::new();
        let frame = json!({
            "topic": "tickers.BTCUSDT",
            "type": "snapshot",
            "ts": 1700000000000i64,
            "data": { "symbol": "BTCUSDT", "lastPrice": "42.0", "prevPrice24h": "40.0" }
        });
        let msg = parser.parse(frame.to_string().as_bytes()).unwrap().unwrap();
        assert_eq!(msg.timestamp.timestamp_millis(), 1700000000000);
        assert_eq!(msg.message_type, MessageType::Ticker);
        let MessageData::Ticker(t) = &msg.data else { panic!() };
        assert_eq!(t.change_24h, 2.0);
    }

    #[test]
    fn test_unknown_topic_is_error() {
        let parser = BybitParser::new();
        let frame = json!({ "topic": "kline.1.BTCUSDT", "type": "snapshot", "data": {} });
        assert!(parser.parse(frame.to_string().as_bytes()).is_err());
    }
}
