//! Binance frame parser.
//!
//! Combined-stream frames carry a `stream` name and a `data` object.
//! Routing is by stream suffix: `@depth` → order book, `@ticker` → 24h
//! ticker, `@bookTicker` → best price. Prices and volumes arrive as
//! decimal strings.

use crate::error::{ParseError, ParseResult};
use crate::util::{levels_from_str_pairs, parse_f64};
use chrono::Utc;
use marketd_core::{
    MarketType, MessageData, OrderBookUpdateType, SymbolRegistry, UnifiedBestPrice,
    UnifiedMessage, UnifiedOrderBook, UnifiedTicker, Venue,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct StreamEnvelope {
    #[serde(default)]
    stream: String,
}

#[derive(Debug, Deserialize)]
struct DepthMessage {
    data: DepthData,
}

#[derive(Debug, Deserialize)]
struct DepthData {
    #[serde(rename = "s", default)]
    symbol: Option<String>,
    #[serde(rename = "b", default)]
    bids: Vec<Vec<String>>,
    #[serde(rename = "a", default)]
    asks: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct TickerMessage {
    data: TickerData,
}

#[derive(Debug, Deserialize)]
struct TickerData {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "p", default)]
    price_change: String,
    #[serde(rename = "P", default)]
    price_change_pct: String,
    #[serde(rename = "c", default)]
    last_price: String,
    #[serde(rename = "b", default)]
    bid_price: String,
    #[serde(rename = "a", default)]
    ask_price: String,
    #[serde(rename = "v", default)]
    volume: String,
    #[serde(rename = "h", default)]
    high: String,
    #[serde(rename = "l", default)]
    low: String,
}

#[derive(Debug, Deserialize)]
struct BookTickerMessage {
    data: BookTickerData,
}

#[derive(Debug, Deserialize)]
struct BookTickerData {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "b", default)]
    bid_price: String,
    #[serde(rename = "B", default)]
    bid_qty: String,
    #[serde(rename = "a", default)]
    ask_price: String,
    #[serde(rename = "A", default)]
    ask_qty: String,
}

#[derive(Debug, Clone, Default)]
pub struct BinanceParser {
    registry: SymbolRegistry,
}

impl BinanceParser {
    pub fn new() -> Self {
        Self {
            registry: SymbolRegistry::new(),
        }
    }

    pub fn parse(&self, raw: &[u8]) -> ParseResult<Option<UnifiedMessage>> {
        let envelope: StreamEnvelope = serde_json::from_slice(raw)?;
        let stream = envelope.stream;

        if stream.contains("@bookTicker") {
            self.parse_best_price(raw).map(Some)
        } else if stream.contains("@ticker") {
            self.parse_ticker(raw).map(Some)
        } else if stream.contains("@depth") {
            self.parse_order_book(raw, &stream).map(Some)
        } else {
            Err(ParseError::UnknownStream(stream))
        }
    }

    fn parse_order_book(&self, raw: &[u8], stream: &str) -> ParseResult<UnifiedMessage> {
        let msg: DepthMessage = serde_json::from_slice(raw)?;
        let timestamp = Utc::now();

        // Fixed-depth streams (@depth5/@depth20) push full top-N views;
        // the bare diff stream is a delta.
        let update_type = if depth_stream_is_fixed(stream) {
            OrderBookUpdateType::Snapshot
        } else {
            OrderBookUpdateType::Incremental
        };

        // The fixed-depth payload omits `s`; recover the symbol from the
        // stream name (`btcusdt@depth5`).
        let venue_symbol = match msg.data.symbol {
            Some(s) => s,
            None => stream
                .split('@')
                .next()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| ParseError::InvalidShape(format!("no symbol in {stream}")))?
                .to_string(),
        };

        let unified_symbol =
            self.registry
                .to_unified(Venue::Binance, &venue_symbol, MarketType::Spot)?;

        let book = UnifiedOrderBook::new(
            unified_symbol.clone(),
            timestamp,
            levels_from_str_pairs(&msg.data.bids),
            levels_from_str_pairs(&msg.data.asks),
            update_type,
        );

        Ok(UnifiedMessage::new(
            Venue::Binance,
            unified_symbol,
            timestamp,
            MessageData::OrderBook(book),
        ))
    }

    fn parse_ticker(&self, raw: &[u8]) -> ParseResult<UnifiedMessage> {
        let msg: TickerMessage = serde_json::from_slice(raw)?;
        let timestamp = Utc::now();
        let unified_symbol =
            self.registry
                .to_unified(Venue::Binance, &msg.data.symbol, MarketType::Spot)?;

        let ticker = UnifiedTicker {
            symbol: unified_symbol.symbol.clone(),
            timestamp,
            last_price: parse_f64(&msg.data.last_price),
            best_bid: parse_f64(&msg.data.bid_price),
            best_ask: parse_f64(&msg.data.ask_price),
            volume_24h: parse_f64(&msg.data.volume),
            change_24h: parse_f64(&msg.data.price_change),
            change_pct_24h: parse_f64(&msg.data.price_change_pct),
            high_24h: parse_f64(&msg.data.high),
            low_24h: parse_f64(&msg.data.low),
        };

        Ok(UnifiedMessage::new(
            Venue::Binance,
            unified_symbol,
            timestamp,
            MessageData::Ticker(ticker),
        ))
    }

    fn parse_best_price(&self, raw: &[u8]) -> ParseResult<UnifiedMessage> {
        let msg: BookTickerMessage = serde_json::from_slice(raw)?;
        let timestamp = Utc::now();
        let unified_symbol =
            self.registry
                .to_unified(Venue::Binance, &msg.data.symbol, MarketType::Spot)?;

        let best = UnifiedBestPrice {
            symbol: unified_symbol.symbol.clone(),
            timestamp,
            best_bid: parse_f64(&msg.data.bid_price),
            best_ask: parse_f64(&msg.data.ask_price),
            bid_volume: parse_f64(&msg.data.bid_qty),
            ask_volume: parse_f64(&msg.data.ask_qty),
        };

        Ok(UnifiedMessage::new(
            Venue::Binance,
            unified_symbol,
            timestamp,
            MessageData::BestPrice(best),
        ))
    }
}

/// True for `sym@depth5`/`sym@depth20` style streams, false for the bare
/// `sym@depth` (or `sym@depth@100ms`) diff stream.
fn depth_stream_is_fixed(stream: &str) -> bool {
    stream
        .split_once("@depth")
        .map(|(_, rest)| rest.chars().next().is_some_and(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketd_core::MessageType;
    use serde_json::json;

    #[test]
    fn test_fixed_depth_is_snapshot() {
        let frame = json!({
            "stream": "btcusdt@depth5",
            "data": {
                "s": "BTCUSDT",
                "b": [["100.0", "1.0"], ["99.5", "2.0"]],
                "a": [["100.5", "1.5"]]
            }
        });
        let parser = BinanceParser::new();
        let msg = parser.parse(frame.to_string().as_bytes()).unwrap().unwrap();

        assert_eq!(msg.message_type, MessageType::OrderBook);
        assert_eq!(msg.symbol, "BTC/USDT");
        let MessageData::OrderBook(book) = &msg.data else {
            panic!("expected order book");
        };
        assert_eq!(book.update_type, OrderBookUpdateType::Snapshot);
        assert_eq!(book.bids.len(), 2);
        assert_eq!(book.asks.len(), 1);
        assert_eq!(book.depth, 3);
        assert!(book.bids[0].price > book.bids[1].price);
    }

    #[test]
    fn test_diff_depth_is_incremental() {
        let frame = json!({
            "stream": "btcusdt@depth",
            "data": {
                "s": "BTCUSDT",
                "b": [["100.0", "0"]],
                "a": []
            }
        });
        let parser = BinanceParser::new();
        let msg = parser.parse(frame.to_string().as_bytes()).unwrap().unwrap();
        let MessageData::OrderBook(book) = &msg.data else {
            panic!("expected order book");
        };
        assert_eq!(book.update_type, OrderBookUpdateType::Incremental);
        // volume 0 marks a deletion and must survive parsing
        assert_eq!(book.bids[0].volume, 0.0);
    }

    #[test]
    fn test_symbol_from_stream_when_payload_omits_it() {
        let frame = json!({
            "stream": "ethusdt@depth5",
            "data": { "b": [["10", "1"]], "a": [["11", "1"]] }
        });
        let parser = BinanceParser::new();
        let msg = parser.parse(frame.to_string().as_bytes()).unwrap().unwrap();
        assert_eq!(msg.symbol, "ETH/USDT");
    }

    #[test]
    fn test_book_ticker() {
        let frame = json!({
            "stream": "btcusdt@bookTicker",
            "data": { "s": "BTCUSDT", "b": "100.1", "B": "3", "a": "100.2", "A": "4" }
        });
        let parser = BinanceParser::new();
        let msg = parser.parse(frame.to_string().as_bytes()).unwrap().unwrap();
        assert_eq!(msg.message_type, MessageType::BestPrice);
        let MessageData::BestPrice(bp) = &msg.data else {
            panic!("expected best price");
        };
        assert_eq!(bp.best_bid, 100.1);
        assert_eq!(bp.ask_volume, 4.0);
    }

    #[test]
    fn test_ticker() {
        let frame = json!({
            "stream": "btcusdt@ticker",
            "data": {
                "s": "BTCUSDT", "p": "-50.0", "P": "-0.05", "c": "99950.0",
                "b": "99940.0", "a": "99960.0", "v": "1234.5",
                "h": "101000.0", "l": "99000.0"
            }
        });
        let parser = BinanceParser::new();
        let msg = parser.parse(frame.to_string().as_bytes()).unwrap().unwrap();
        let MessageData::Ticker(t) = &msg.data else {
            panic!("expected ticker");
        };
        assert_eq!(t.last_price, 99950.0);
        assert_eq!(t.change_pct_24h, -0.05);
    }

    #[test]
    fn test_unknown_stream_is_error() {
        let frame = json!({ "stream": "btcusdt@kline_1m", "data": {} });
        let parser = BinanceParser::new();
        assert!(parser.parse(frame.to_string().as_bytes()).is_err());
    }
}
