//! Venue protocol parsers.
//!
//! Each parser is a pure function over raw frame bytes: it either produces
//! one [`UnifiedMessage`], returns `Ok(None)` for control/keep-alive frames
//! the caller must silently drop, or fails with a non-fatal [`ParseError`].
//! Parsers hold no mutable state and are safe to call concurrently.

pub mod binance;
pub mod bybit;
pub mod coinex;
pub mod error;
pub mod htx;
pub mod kucoin;
pub mod poloniex;
mod util;

pub use binance::BinanceParser;
pub use bybit::BybitParser;
pub use coinex::CoinexParser;
pub use error::{ParseError, ParseResult};
pub use htx::HtxParser;
pub use kucoin::KucoinParser;
pub use poloniex::PoloniexParser;

use marketd_core::{UnifiedMessage, Venue};

/// Tagged dispatch over the six venue parsers.
#[derive(Debug, Clone)]
pub enum VenueParser {
    Binance(BinanceParser),
    Bybit(BybitParser),
    Kucoin(KucoinParser),
    Htx(HtxParser),
    Coinex(CoinexParser),
    Poloniex(PoloniexParser),
}

impl VenueParser {
    /// Build the parser for a venue.
    pub fn for_venue(venue: Venue) -> VenueParser {
        match venue {
            Venue::Binance => VenueParser::Binance(BinanceParser::new()),
            Venue::Bybit => VenueParser::Bybit(BybitParser::new()),
            Venue::Kucoin => VenueParser::Kucoin(KucoinParser::new()),
            Venue::Htx => VenueParser::Htx(HtxParser::new()),
            Venue::Coinex => VenueParser::Coinex(CoinexParser::new()),
            Venue::Poloniex => VenueParser::Poloniex(PoloniexParser::new()),
        }
    }

    pub fn venue(&self) -> Venue {
        match self {
            VenueParser::Binance(_) => Venue::Binance,
            VenueParser::Bybit(_) => Venue::Bybit,
            VenueParser::Kucoin(_) => Venue::Kucoin,
            VenueParser::Htx(_) => Venue::Htx,
            VenueParser::Coinex(_) => Venue::Coinex,
            VenueParser::Poloniex(_) => Venue::Poloniex,
        }
    }

    pub fn can_parse(&self, venue: Venue, _raw: &[u8]) -> bool {
        self.venue() == venue
    }

    /// Decode one raw venue frame. `Ok(None)` marks a control frame.
    pub fn parse(&self, raw: &[u8]) -> ParseResult<Option<UnifiedMessage>> {
        match self {
            VenueParser::Binance(p) => p.parse(raw),
            VenueParser::Bybit(p) => p.parse(raw),
            VenueParser::Kucoin(p) => p.parse(raw),
            VenueParser::Htx(p) => p.parse(raw),
            VenueParser::Coinex(p) => p.parse(raw),
            VenueParser::Poloniex(p) => p.parse(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_matches_venue() {
        for v in Venue::ALL {
            let p = VenueParser::for_venue(v);
            assert_eq!(p.venue(), v);
            assert!(p.can_parse(v, b"{}"));
        }
        let p = VenueParser::for_venue(Venue::Binance);
        assert!(!p.can_parse(Venue::Bybit, b"{}"));
    }
}
