//! Kucoin frame parser.
//!
//! Frames carry a `type` (`welcome`/`ack`/`pong`/`message`) and, for data
//! frames, a `topic` with the symbol after the `:`. Non-`message` frames
//! are control traffic and map to `None`. Topics:
//! `/spotMarket/level2Depth{N}:SYM` (full top-N snapshot),
//! `/spotMarket/level1:SYM` (best price), `/market/match:SYM` (trade);
//! the legacy `/market/level2:SYM` and `/market/ticker:SYM` forms are
//! accepted as well.

use crate::error::{ParseError, ParseResult};
use crate::util::{levels_from_str_pairs, parse_f64, ts_from_millis};
use marketd_core::{
    MarketType, MessageData, OrderBookUpdateType, SymbolRegistry, TradeSide, UnifiedBestPrice,
    UnifiedMessage, UnifiedOrderBook, UnifiedTrade, Venue,
};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    topic: String,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    ts: i64,
}

#[derive(Debug, Deserialize)]
struct DepthData {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    bids: Vec<Vec<String>>,
    #[serde(default)]
    asks: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct Level1Data {
    #[serde(default)]
    symbol: String,
    #[serde(rename = "bestBid", default)]
    best_bid: String,
    #[serde(rename = "bestBidSize", default)]
    best_bid_size: String,
    #[serde(rename = "bestAsk", default)]
    best_ask: String,
    #[serde(rename = "bestAskSize", default)]
    best_ask_size: String,
}

#[derive(Debug, Deserialize)]
struct MatchData {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    side: String,
    #[serde(default)]
    size: String,
    #[serde(default)]
    price: String,
    #[serde(rename = "tradeId", default)]
    trade_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct KucoinParser {
    registry: SymbolRegistry,
}

impl KucoinParser {
    pub fn new() -> Self {
        Self {
            registry: SymbolRegistry::new(),
        }
    }

    pub fn parse(&self, raw: &[u8]) -> ParseResult<Option<UnifiedMessage>> {
        let envelope: Envelope = serde_json::from_slice(raw)?;

        match envelope.kind.as_str() {
            "welcome" | "ack" | "pong" => return Ok(None),
            _ => {}
        }

        let timestamp = ts_from_millis(envelope.ts);

        if envelope.topic.contains("/spotMarket/level2Depth")
            || envelope.topic.contains("/market/level2")
        {
            self.parse_order_book(envelope, timestamp).map(Some)
        } else if envelope.topic.contains("/spotMarket/level1")
            || envelope.topic.contains("/market/ticker")
        {
            self.parse_best_price(envelope, timestamp).map(Some)
        } else if envelope.topic.contains("/market/match") {
            self.parse_match(envelope, timestamp).map(Some)
        } else {
            Err(ParseError::UnknownStream(envelope.topic))
        }
    }

    fn parse_order_book(
        &self,
        envelope: Envelope,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> ParseResult<UnifiedMessage> {
        let depth_data: DepthData = serde_json::from_value(envelope.data.clone())?;

        // Level2Depth payloads omit the symbol; it lives in the topic.
        let venue_symbol = if !depth_data.symbol.is_empty() {
            depth_data.symbol.clone()
        } else {
            symbol_from_topic(&envelope.topic)
                .ok_or_else(|| ParseError::InvalidShape(format!("no symbol in topic {}", envelope.topic)))?
        };

        let unified_symbol =
            self.registry
                .to_unified(Venue::Kucoin, &venue_symbol, MarketType::Spot)?;

        let mut book = UnifiedOrderBook::new(
            unified_symbol.clone(),
            timestamp,
            levels_from_str_pairs(&depth_data.bids),
            levels_from_str_pairs(&depth_data.asks),
            OrderBookUpdateType::Snapshot,
        );
        book.raw = Some(envelope.data);

        Ok(UnifiedMessage::new(
            Venue::Kucoin,
            unified_symbol,
            timestamp,
            MessageData::OrderBook(book),
        ))
    }

    fn parse_best_price(
        &self,
        envelope: Envelope,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> ParseResult<UnifiedMessage> {
        let level1: Level1Data = serde_json::from_value(envelope.data)?;

        let venue_symbol = if !level1.symbol.is_empty() {
            level1.symbol.clone()
        } else {
            symbol_from_topic(&envelope.topic)
                .ok_or_else(|| ParseError::InvalidShape("no symbol in level1 message".into()))?
        };

        let unified_symbol =
            self.registry
                .to_unified(Venue::Kucoin, &venue_symbol, MarketType::Spot)?;

        let best = UnifiedBestPrice {
            symbol: unified_symbol.symbol.clone(),
            timestamp,
            best_bid: parse_f64(&level1.best_bid),
            best_ask: parse_f64(&level1.best_ask),
            bid_volume: parse_f64(&level1.best_bid_size),
            ask_volume: parse_f64(&level1.best_ask_size),
        };

        Ok(UnifiedMessage::new(
            Venue::Kucoin,
            unified_symbol,
            timestamp,
            MessageData::BestPrice(best),
        ))
    }

    fn parse_match(
        &self,
        envelope: Envelope,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> ParseResult<UnifiedMessage> {
        let m: MatchData = serde_json::from_value(envelope.data)?;

        let venue_symbol = if !m.symbol.is_empty() {
            m.symbol.clone()
        } else {
            symbol_from_topic(&envelope.topic)
                .ok_or_else(|| ParseError::InvalidShape("no symbol in match message".into()))?
        };

        let unified_symbol =
            self.registry
                .to_unified(Venue::Kucoin, &venue_symbol, MarketType::Spot)?;

        let side = if m.side == "buy" {
            TradeSide::Buy
        } else {
            TradeSide::Sell
        };

        let trade = UnifiedTrade {
            symbol: unified_symbol.symbol.clone(),
            timestamp,
            trade_id: m.trade_id,
            price: parse_f64(&m.price),
            volume: parse_f64(&m.size),
            side,
        };

        Ok(UnifiedMessage::new(
            Venue::Kucoin,
            unified_symbol,
            timestamp,
            MessageData::Trade(trade),
        ))
    }
}

/// `/spotMarket/level2Depth5:ERG-USDT` → `ERG-USDT`
fn symbol_from_topic(topic: &str) -> Option<String> {
    let (_, sym) = topic.split_once(':')?;
    if sym.is_empty() {
        None
    } else {
        Some(sym.to_string())
    }
}
