//! Poloniex frame parser.
//!
//! Frames carry `channel` and `data`, where `data` may be an object or an
//! array (first element wins). A channel containing `book` is an order
//! book delta stream; `ticker` is a 24h ticker. Numeric fields arrive as
//! strings.

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
    channel: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct BookUpdate {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    bids: Vec<Vec<String>>,
    #[serde(default)]
    asks: Vec<Vec<String>>,
    #[serde(default)]
    ts: i64,
}

#[derive(Debug, Deserialize)]
struct TickerUpdate {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    open: String,
    #[serde(default)]
    low: String,
    #[serde(default)]
    high: String,
    #[serde(default)]
    close: String,
    #[serde(default)]
    quantity: String,
    #[serde(default)]
    bid: String,
    #[serde(default)]
    ask: String,
    #[serde(default)]
    ts: i64,
}

#[derive(Debug, Clone, Default)]
pub struct PoloniexParser {
    registry: SymbolRegistry,
}

impl PoloniexParser {
    pub fn new() -> Self {
        Self {
            registry: SymbolRegistry::new(),
        }
    }

    pub fn parse(&self, raw: &[u8]) -> ParseResult<Option<UnifiedMessage>> {
        let envelope: Envelope = serde_json::from_slice(raw)?;

        if envelope.channel.contains("book") {
            self.parse_order_book(envelope).map(Some)
        } else if envelope.channel.contains("ticker") {
            self.parse_ticker(envelope).map(Some)
        } else {
            Err(ParseError::UnknownStream(envelope.channel))
        }
    }

    fn parse_order_book(&self, envelope: Envelope) -> ParseResult<UnifiedMessage> {
        let data = first_element(envelope.data)?;
        let update: BookUpdate = serde_json::from_value(data.clone())?;
        if update.symbol.is_empty() {
            return Err(ParseError::InvalidShape("book update without symbol".into()));
        }

        let unified_symbol =
            self.registry
                .to_unified(Venue::Poloniex, &update.symbol, MarketType::Spot)?;

        let timestamp = ts_from_millis(update.ts);
        let mut book = UnifiedOrderBook::new(
            unified_symbol.clone(),
            timestamp,
            levels_from_str_pairs(&update.bids),
            levels_from_str_pairs(&update.asks),
            OrderBookUpdateType::Incremental,
        );
        book.raw = Some(data);

        Ok(UnifiedMessage::new(
            Venue::Poloniex,
            unified_symbol,
            timestamp,
            MessageData::OrderBook(book),
        ))
    }

    fn parse_ticker(&self, envelope: Envelope) -> ParseResult<UnifiedMessage> {
        let data = first_element(envelope.data)?;
        let update: TickerUpdate = serde_json::from_value(data)?;
        if update.symbol.is_empty() {
            return Err(ParseError::InvalidShape("ticker update without symbol".into()));
        }

        let unified_symbol =
            self.registry
                .to_unified(Venue::Poloniex, &update.symbol, MarketType::Spot)?;

        let close = parse_f64(&update.close);
        let open = parse_f64(&update.open);
        let change = close - open;
        let change_pct = if open != 0.0 { change / open * 100.0 } else { 0.0 };

        let timestamp = ts_from_millis(update.ts);
        let ticker = UnifiedTicker {
            symbol: unified_symbol.symbol.clone(),
            timestamp,
            last_price: close,
            best_bid: parse_f64(&update.bid),
            best_ask: parse_f64(&update.ask),
            volume_24h: parse_f64(&update.quantity),
            change_24h: change,
            change_pct_24h: change_pct,
            high_24h: parse_f64(&update.high),
            low_24h: parse_f64(&update.low),
        };

        Ok(UnifiedMessage::new(
            Venue::Poloniex,
            unified_symbol,
            timestamp,
            MessageData::Ticker(ticker),
        ))
    }
}

/// Poloniex wraps `data` in an array; take the first element.
fn first_element(data: Value) -> ParseResult<Value> {
    match data {
        Value::Array(mut items) => {
            if items.is_empty() {
                Err(ParseError::InvalidShape("empty data array".into()))
            } else {
                Ok(items.remove(0))
            }
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketd_core::MessageType;
    use serde_json::json;

    #[test]
    fn test_book_is_incremental() {
        let parser = PoloniexParser::new();
        let frame = json!({
            "channel": "book",
            "data": [{
                "symbol": "BTC_USDT",
                "bids": [["100", "1"], ["99", "2"]],
                "asks": [["101", "1"]],
                "ts": 1700000000000i64
            }]
        });
        let msg = parser.parse(frame.to_string().as_bytes()).unwrap().unwrap();
        assert_eq!(msg.symbol, "BTC/USDT");
        let MessageData::OrderBook(book) = &msg.data else { panic!() };
        assert_eq!(book.update_type, OrderBookUpdateType::Incremental);
        assert_eq!(book.depth, 3);
    }

    #[test]
    fn test_data_as_plain_object() {
        let parser = PoloniexParser::new();
        let frame = json!({
            "channel": "book_lv2",
            "data": { "symbol": "ETH_USDT", "bids": [["10", "1"]], "asks": [], "ts": 0 }
        });
        let msg = parser.parse(frame.to_string().as_bytes()).unwrap().unwrap();
        assert_eq!(msg.symbol, "ETH/USDT");
    }

    #[test]
    fn test_ticker_change_derivation() {
        let parser = PoloniexParser::new();
        let frame = json!({
            "channel": "ticker",
            "data": [{
                "symbol": "BTC_USDT", "open": "100", "close": "90",
                "high": "105", "low": "89", "quantity": "12",
                "bid": "89.9", "ask": "90.1", "ts": 1700000000000i64
            }]
        });
        let msg = parser.parse(frame.to_string().as_bytes()).unwrap().unwrap();
        assert_eq!(msg.message_type, MessageType::Ticker);
        let MessageData::Ticker(t) = &msg.data else { panic!() };
        assert_eq!(t.change_24h, -10.0);
        assert!((t.change_pct_24h + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_data_array_is_error() {
        let parser = PoloniexParser::new();
        let frame = json!({ "channel": "book", "data": [] });
        assert!(parser.parse(frame.to_string().as_bytes()).is_err());
    }

    #[test]
    fn test_unknown_channel_is_error() {
        let parser = PoloniexParser::new();
        let frame = json!({ "channel": "trades", "data": {} });
        assert!(parser.parse(frame.to_string().as_bytes()).is_err());
    }
}
