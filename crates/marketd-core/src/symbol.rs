//! Unified trading-pair symbols.
//!
//! Venues disagree on symbol shape (`BTCUSDT`, `BTC-USDT`, `btcusdt`,
//! `BTC_USDT`). Everything inside the pipeline uses the unified form:
//! `BASE/QUOTE` for spot, `BASEQUOTE` for futures. The registry converts
//! between the unified form and the exact venue wire form.

use crate::error::{CoreError, Result};
use crate::venue::Venue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Market segment of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketType {
    Spot,
    Futures,
}

impl MarketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketType::Spot => "spot",
            MarketType::Futures => "futures",
        }
    }

    /// Parse a catalog market type, case-insensitive. `future` is accepted.
    pub fn parse(s: &str) -> Result<MarketType> {
        match s.trim().to_lowercase().as_str() {
            "spot" => Ok(MarketType::Spot),
            "futures" | "future" => Ok(MarketType::Futures),
            other => Err(CoreError::UnknownMarketType(other.to_string())),
        }
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified representation of a trading pair.
///
/// Invariant: `symbol` is `BASE/QUOTE` for spot and `BASEQUOTE` for
/// futures, with both currencies uppercased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedSymbol {
    pub base_currency: String,
    pub quote_currency: String,
    pub market_type: MarketType,
    /// Display form following the market-type rule.
    pub symbol: String,
    /// Exact symbol string the venue sent.
    pub original_symbol: String,
}

impl UnifiedSymbol {
    pub fn new(base: &str, quote: &str, market_type: MarketType) -> Self {
        let base = base.to_uppercase();
        let quote = quote.to_uppercase();
        let symbol = match market_type {
            MarketType::Spot => format!("{base}/{quote}"),
            MarketType::Futures => format!("{base}{quote}"),
        };
        Self {
            base_currency: base,
            quote_currency: quote,
            market_type,
            symbol,
            original_symbol: String::new(),
        }
    }

    /// Parse any of the common symbol shapes into the unified form.
    ///
    /// Accepts `/`, `-`, `_` separators and the concatenated form; for
    /// concatenated symbols the quote is inferred by longest-suffix match
    /// against the known quote currencies before falling back to heuristic
    /// splits.
    pub fn parse(symbol: &str, market_type: MarketType) -> Result<UnifiedSymbol> {
        let raw = symbol.trim().to_uppercase();

        let (base, quote) = if let Some((b, q)) = split_once_checked(&raw, '/') {
            (b, q)
        } else if let Some((b, q)) = split_once_checked(&raw, '-') {
            (b, q)
        } else if let Some((b, q)) = split_once_checked(&raw, '_') {
            (b, q)
        } else {
            split_concatenated(&raw)
                .ok_or_else(|| CoreError::InvalidSymbol(symbol.to_string()))?
        };

        if base.is_empty() || quote.is_empty() {
            return Err(CoreError::InvalidSymbol(symbol.to_string()));
        }

        let mut unified = UnifiedSymbol::new(&base, &quote, market_type);
        unified.original_symbol = raw;
        Ok(unified)
    }
}

impl fmt::Display for UnifiedSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

fn split_once_checked(symbol: &str, sep: char) -> Option<(String, String)> {
    if !symbol.contains(sep) {
        return None;
    }
    let parts: Vec<&str> = symbol.split(sep).collect();
    if parts.len() != 2 {
        return None;
    }
    Some((parts[0].to_string(), parts[1].to_string()))
}

/// Known quote currencies, longest-suffix match order.
const COMMON_QUOTES: [&str; 15] = [
    "USDT", "USDC", "BUSD", "TUSD", "USDP", "BTC", "ETH", "BNB", "USD", "EUR", "GBP", "DAI",
    "FDUSD", "BTTC", "TRX",
];

/// Split a concatenated symbol like `BTCUSDT` into base and quote.
fn split_concatenated(symbol: &str) -> Option<(String, String)> {
    for q in COMMON_QUOTES {
        if symbol.ends_with(q) && symbol.len() > q.len() {
            return Some((symbol[..symbol.len() - q.len()].to_string(), q.to_string()));
        }
    }

    // Heuristic fallbacks for symbols without a known quote suffix.
    if symbol.len() == 6 {
        return Some((symbol[..3].to_string(), symbol[3..].to_string()));
    }
    if symbol.len() > 6 {
        return Some((
            symbol[..symbol.len() - 3].to_string(),
            symbol[symbol.len() - 3..].to_string(),
        ));
    }

    None
}

/// Stateless converter between unified symbols and venue wire forms.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolRegistry;

impl SymbolRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Convert a venue symbol string into the unified form.
    pub fn to_unified(
        &self,
        venue: Venue,
        venue_symbol: &str,
        market_type: MarketType,
    ) -> Result<UnifiedSymbol> {
        let symbol = match venue {
            // Kucoin futures append an `M` marker to the pair.
            Venue::Kucoin if market_type == MarketType::Futures => venue_symbol
                .strip_suffix('M')
                .unwrap_or(venue_symbol)
                .to_string(),
            _ => venue_symbol.to_string(),
        };
        UnifiedSymbol::parse(&symbol, market_type)
    }

    /// Convert a unified symbol into the exact venue wire form.
    pub fn to_venue(&self, venue: Venue, unified: &UnifiedSymbol) -> String {
        let base = &unified.base_currency;
        let quote = &unified.quote_currency;
        match venue {
            Venue::Binance | Venue::Htx | Venue::Poloniex => {
                format!("{base}{quote}").to_lowercase()
            }
            Venue::Bybit | Venue::Coinex => format!("{base}{quote}"),
            Venue::Kucoin => match unified.market_type {
                MarketType::Spot => format!("{base}-{quote}"),
                MarketType::Futures => format!("{base}{quote}M"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spot_form_rule() {
        let s = UnifiedSymbol::new("btc", "usdt", MarketType::Spot);
        assert_eq!(s.symbol, "BTC/USDT");
        assert_eq!(s.base_currency, "BTC");
        assert_eq!(s.quote_currency, "USDT");
    }

    #[test]
    fn test_futures_form_rule() {
        let s = UnifiedSymbol::new("BTC", "USDT", MarketType::Futures);
        assert_eq!(s.symbol, "BTCUSDT");
    }

    #[test]
    fn test_parse_separators() {
        for raw in ["BTC/USDT", "BTC-USDT", "BTC_USDT", "BTCUSDT"] {
            let s = UnifiedSymbol::parse(raw, MarketType::Spot).unwrap();
            assert_eq!(s.symbol, "BTC/USDT", "failed for {raw}");
        }
    }

    #[test]
    fn test_parse_preserves_original() {
        let s = UnifiedSymbol::parse("erg-usdt", MarketType::Spot).unwrap();
        assert_eq!(s.original_symbol, "ERG-USDT");
        assert_eq!(s.symbol, "ERG/USDT");
    }

    #[test]
    fn test_concatenated_suffix_priority() {
        // Longest known suffix wins: ends in both BTC and... only BTC here.
        let s = UnifiedSymbol::parse("ETHBTC", MarketType::Spot).unwrap();
        assert_eq!(s.base_currency, "ETH");
        assert_eq!(s.quote_currency, "BTC");

        let s = UnifiedSymbol::parse("DOGEUSDC", MarketType::Spot).unwrap();
        assert_eq!(s.base_currency, "DOGE");
        assert_eq!(s.quote_currency, "USDC");
    }

    #[test]
    fn test_concatenated_fallback_split() {
        // No known quote suffix, 6 chars: split in half.
        let s = UnifiedSymbol::parse("ABCXYZ", MarketType::Spot).unwrap();
        assert_eq!(s.base_currency, "ABC");
        assert_eq!(s.quote_currency, "XYZ");
    }

    #[test]
    fn test_invalid_symbols() {
        assert!(UnifiedSymbol::parse("A/B/C", MarketType::Spot).is_err());
        assert!(UnifiedSymbol::parse("AB", MarketType::Spot).is_err());
    }

    #[test]
    fn test_venue_wire_forms() {
        let reg = SymbolRegistry::new();
        let s = UnifiedSymbol::parse("BTC/USDT", MarketType::Spot).unwrap();

        assert_eq!(reg.to_venue(Venue::Binance, &s), "btcusdt");
        assert_eq!(reg.to_venue(Venue::Bybit, &s), "BTCUSDT");
        assert_eq!(reg.to_venue(Venue::Kucoin, &s), "BTC-USDT");
        assert_eq!(reg.to_venue(Venue::Htx, &s), "btcusdt");
        assert_eq!(reg.to_venue(Venue::Coinex, &s), "BTCUSDT");
        assert_eq!(reg.to_venue(Venue::Poloniex, &s), "btcusdt");
    }

    #[test]
    fn test_kucoin_futures_suffix() {
        let reg = SymbolRegistry::new();
        let s = UnifiedSymbol::parse("XBT/USDT", MarketType::Futures).unwrap();
        assert_eq!(reg.to_venue(Venue::Kucoin, &s), "XBTUSDTM");

        let back = reg
            .to_unified(Venue::Kucoin, "XBTUSDTM", MarketType::Futures)
            .unwrap();
        assert_eq!(back.base_currency, "XBT");
        assert_eq!(back.quote_currency, "USDT");
        assert_eq!(back.symbol, "XBTUSDT");
    }
}
