//! Per-venue streaming adapters.
//!
//! One [`ExchangeAdapter`] per `(venue, market_type)`: it owns the
//! WebSocket, issues venue-specific subscribe frames, drives keep-alives,
//! feeds received frames through the venue parser, decorates messages with
//! the subscribed pair id, and publishes to the bus. On read errors it
//! reconnects with a fixed backoff and replays the last subscription.

pub mod adapter;
pub mod error;
pub mod factory;
pub mod protocol;

pub use adapter::{AdapterConfig, ExchangeAdapter, MarketPair, VenueEndpoints};
pub use error::{AdapterError, AdapterResult};
pub use factory::build_adapter;
