//! Core data model for the market-data aggregator.
//!
//! Defines the unified message schema that every venue feed is normalized
//! into, the unified symbol representation, and the venue registry used by
//! parsers and adapters to translate symbols in both directions.

pub mod error;
pub mod message;
pub mod symbol;
pub mod venue;

pub use error::{CoreError, Result};
pub use message::{
    MessageData, MessageType, OrderBookUpdateType, OrderStatus, OrderType, PriceLevel, TradeSide,
    UnifiedBestPrice, UnifiedMessage, UnifiedOrderBook, UnifiedOrderEvent, UnifiedTicker,
    UnifiedTrade,
};
pub use symbol::{MarketType, SymbolRegistry, UnifiedSymbol};
pub use venue::Venue;
