//! Unified message schema.
//!
//! One `UnifiedMessage` per decoded venue event. The payload is a closed
//! variant keyed by the message type; venues that do not provide a field
//! leave it at zero.

use crate::symbol::UnifiedSymbol;
use crate::venue::Venue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message type discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    OrderBook,
    Ticker,
    BestPrice,
    Trade,
    OrderEvent,
    Kline,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageType::OrderBook => "orderbook",
            MessageType::Ticker => "ticker",
            MessageType::BestPrice => "best_price",
            MessageType::Trade => "trade",
            MessageType::OrderEvent => "order_event",
            MessageType::Kline => "kline",
        };
        f.write_str(s)
    }
}

/// Order book update kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBookUpdateType {
    /// Full replacement of the book.
    Snapshot,
    /// Delta to apply; `volume == 0` deletes the price level.
    Incremental,
}

/// One price level of an order book side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub volume: f64,
}

impl PriceLevel {
    pub fn new(price: f64, volume: f64) -> Self {
        Self { price, volume }
    }
}

/// Unified order book.
///
/// Bids are descending by price, asks ascending, both in the order the
/// venue supplied them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedOrderBook {
    pub symbol: String,
    pub unified_symbol: UnifiedSymbol,
    pub timestamp: DateTime<Utc>,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    /// Total level count across both sides.
    pub depth: usize,
    pub update_type: OrderBookUpdateType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl UnifiedOrderBook {
    pub fn new(
        unified_symbol: UnifiedSymbol,
        timestamp: DateTime<Utc>,
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
        update_type: OrderBookUpdateType,
    ) -> Self {
        let depth = bids.len() + asks.len();
        Self {
            symbol: unified_symbol.symbol.clone(),
            unified_symbol,
            timestamp,
            bids,
            asks,
            depth,
            update_type,
            raw: None,
        }
    }
}

/// Unified 24h ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedTicker {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub last_price: f64,
    pub best_bid: f64,
    pub best_ask: f64,
    pub volume_24h: f64,
    pub change_24h: f64,
    pub change_pct_24h: f64,
    pub high_24h: f64,
    pub low_24h: f64,
}

/// Unified top-of-book (best bid/offer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedBestPrice {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub best_bid: f64,
    pub best_ask: f64,
    pub bid_volume: f64,
    pub ask_volume: f64,
}

/// Trade side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Unified public trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedTrade {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub trade_id: String,
    pub price: f64,
    pub volume: f64,
    pub side: TradeSide,
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
}

/// Order kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

/// Unified private order event. Produced by authenticated streams, which
/// live outside the ingestion pipeline; the schema is shared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedOrderEvent {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub order_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
    pub status: OrderStatus,
    pub side: TradeSide,
    pub order_type: OrderType,
    pub price: f64,
    pub volume: f64,
    pub filled_volume: f64,
    pub remaining_volume: f64,
    pub fee: f64,
    pub fee_currency: String,
}

/// Payload variant keyed by message type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageData {
    OrderBook(UnifiedOrderBook),
    Ticker(UnifiedTicker),
    BestPrice(UnifiedBestPrice),
    Trade(UnifiedTrade),
    OrderEvent(UnifiedOrderEvent),
}

impl MessageData {
    pub fn message_type(&self) -> MessageType {
        match self {
            MessageData::OrderBook(_) => MessageType::OrderBook,
            MessageData::Ticker(_) => MessageType::Ticker,
            MessageData::BestPrice(_) => MessageType::BestPrice,
            MessageData::Trade(_) => MessageType::Trade,
            MessageData::OrderEvent(_) => MessageType::OrderEvent,
        }
    }
}

/// One decoded event from one venue, in the unified schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedMessage {
    /// Lowercased venue id, also the bus topic.
    pub venue: Venue,
    /// Unified display symbol.
    pub symbol: String,
    pub unified_symbol: UnifiedSymbol,
    pub message_type: MessageType,
    pub timestamp: DateTime<Utc>,
    pub data: MessageData,
    /// System-internal id of the subscribed pair; 0 when unmapped.
    pub pair_id: i64,
}

impl UnifiedMessage {
    pub fn new(
        venue: Venue,
        unified_symbol: UnifiedSymbol,
        timestamp: DateTime<Utc>,
        data: MessageData,
    ) -> Self {
        Self {
            venue,
            symbol: unified_symbol.symbol.clone(),
            message_type: data.message_type(),
            unified_symbol,
            timestamp,
            data,
            pair_id: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::MarketType;

    fn sym() -> UnifiedSymbol {
        UnifiedSymbol::parse("BTC/USDT", MarketType::Spot).unwrap()
    }

    #[test]
    fn test_message_type_follows_data() {
        let book = UnifiedOrderBook::new(
            sym(),
            Utc::now(),
            vec![PriceLevel::new(100.0, 1.0)],
            vec![PriceLevel::new(101.0, 2.0)],
            OrderBookUpdateType::Snapshot,
        );
        assert_eq!(book.depth, 2);

        let msg = UnifiedMessage::new(Venue::Binance, sym(), Utc::now(), MessageData::OrderBook(book));
        assert_eq!(msg.message_type, MessageType::OrderBook);
        assert_eq!(msg.symbol, "BTC/USDT");
        assert_eq!(msg.pair_id, 0);
    }

    #[test]
    fn test_serde_round_trip() {
        let msg = UnifiedMessage::new(
            Venue::Coinex,
            sym(),
            Utc::now(),
            MessageData::BestPrice(UnifiedBestPrice {
                symbol: "BTC/USDT".into(),
                timestamp: Utc::now(),
                best_bid: 100.0,
                best_ask: 100.5,
                bid_volume: 1.0,
                ask_volume: 2.0,
            }),
        );
        let json = serde_json::to_string(&msg).unwrap();
        let back: UnifiedMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.message_type, MessageType::BestPrice);
        assert_eq!(back.venue, Venue::Coinex);
    }
}
