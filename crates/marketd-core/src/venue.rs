//! Venue identifiers.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported spot exchanges.
///
/// The lowercased name doubles as the bus topic for the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Binance,
    Bybit,
    Kucoin,
    Htx,
    Coinex,
    Poloniex,
}

impl Venue {
    pub const ALL: [Venue; 6] = [
        Venue::Binance,
        Venue::Bybit,
        Venue::Kucoin,
        Venue::Htx,
        Venue::Coinex,
        Venue::Poloniex,
    ];

    /// Canonical lowercased id, used as bus topic and catalog key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Venue::Binance => "binance",
            Venue::Bybit => "bybit",
            Venue::Kucoin => "kucoin",
            Venue::Htx => "htx",
            Venue::Coinex => "coinex",
            Venue::Poloniex => "poloniex",
        }
    }

    /// Parse a catalog exchange name, case-insensitive.
    ///
    /// `huobi` is accepted as an alias for HTX.
    pub fn parse(name: &str) -> Result<Venue> {
        match name.trim().to_lowercase().as_str() {
            "binance" => Ok(Venue::Binance),
            "bybit" => Ok(Venue::Bybit),
            "kucoin" => Ok(Venue::Kucoin),
            "htx" | "huobi" => Ok(Venue::Htx),
            "coinex" => Ok(Venue::Coinex),
            "poloniex" => Ok(Venue::Poloniex),
            other => Err(CoreError::UnknownVenue(other.to_string())),
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(Venue::parse("Binance").unwrap(), Venue::Binance);
        assert_eq!(Venue::parse("HTX").unwrap(), Venue::Htx);
        assert_eq!(Venue::parse("huobi").unwrap(), Venue::Htx);
        assert!(Venue::parse("okx").is_err());
    }

    #[test]
    fn test_topic_form() {
        for v in Venue::ALL {
            assert_eq!(v.as_str(), v.as_str().to_lowercase());
        }
    }
}
