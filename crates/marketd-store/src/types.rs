//! Catalog row types and the price snapshot row.

use chrono::{DateTime, NaiveDate, Utc};
use marketd_core::{PriceLevel, UnifiedOrderBook};
use serde::{Deserialize, Serialize};

/// One active `(venue, pair, symbol, market_type)` row from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoredPair {
    pub exchange_id: i64,
    /// Lowercased exchange name.
    pub exchange_name: String,
    pub pair_id: i64,
    pub symbol: String,
    pub market_type: String,
}

/// Exchange connection record from the catalog. Only active, non-deleted
/// rows are ever returned.
#[derive(Debug, Clone)]
pub struct ExchangeRecord {
    pub id: i64,
    pub name: String,
    pub base_url: String,
    pub ws_url: Option<String>,
}

/// One `(exchange_id, pair_id, exchange_name)` row of the price-sampler
/// monitoring set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerPair {
    pub exchange_id: i64,
    pub pair_id: i64,
    pub exchange_name: String,
}

/// Number of levels persisted per book side.
pub const SNAPSHOT_LEVELS: usize = 5;

/// One `price_spot_log` row: date, timestamp, pair id, then five ask and
/// five bid levels (price, volume) in the column order of the insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub date: NaiveDate,
    pub price_timestamp: DateTime<Utc>,
    pub pair_id: i64,
    /// Asks ascending from the best (lowest) price; padded with zeros.
    pub asks: [PriceLevel; SNAPSHOT_LEVELS],
    /// Bids descending from the best (highest) price; padded with zeros.
    pub bids: [PriceLevel; SNAPSHOT_LEVELS],
}

impl PriceRow {
    /// Build a row from the latest cached book: the first five levels per
    /// side in venue order, zero-padded where the book is shallower.
    pub fn from_book(pair_id: i64, book: &UnifiedOrderBook, at: DateTime<Utc>) -> PriceRow {
        PriceRow {
            date: at.date_naive(),
            price_timestamp: at,
            pair_id,
            asks: take_levels(&book.asks),
            bids: take_levels(&book.bids),
        }
    }
}

fn take_levels(side: &[PriceLevel]) -> [PriceLevel; SNAPSHOT_LEVELS] {
    let mut out = [PriceLevel::new(0.0, 0.0); SNAPSHOT_LEVELS];
    for (slot, level) in out.iter_mut().zip(side.iter()) {
        *slot = *level;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketd_core::{MarketType, OrderBookUpdateType, UnifiedSymbol};

    fn book(bids: &[(f64, f64)], asks: &[(f64, f64)]) -> UnifiedOrderBook {
        let sym = UnifiedSymbol::parse("BTC/USDT", MarketType::Spot).unwrap();
        UnifiedOrderBook::new(
            sym,
            Utc::now(),
            bids.iter().map(|&(p, v)| PriceLevel::new(p, v)).collect(),
            asks.iter().map(|&(p, v)| PriceLevel::new(p, v)).collect(),
            OrderBookUpdateType::Snapshot,
        )
    }

    #[test]
    fn test_padding_shallow_side() {
        // 3 bids, 7 asks: bids 4 and 5 are zero, asks truncate to 5.
        let b = book(
            &[(100.0, 1.0), (99.0, 2.0), (98.0, 3.0)],
            &[
                (101.0, 1.0),
                (102.0, 2.0),
                (103.0, 3.0),
                (104.0, 4.0),
                (105.0, 5.0),
                (106.0, 6.0),
                (107.0, 7.0),
            ],
        );
        let at = Utc::now();
        let row = PriceRow::from_book(9, &b, at);

        assert_eq!(row.pair_id, 9);
        assert_eq!(row.price_timestamp, at);
        assert_eq!(row.date, at.date_naive());

        assert_eq!(row.bids[0], PriceLevel::new(100.0, 1.0));
        assert_eq!(row.bids[2], PriceLevel::new(98.0, 3.0));
        assert_eq!(row.bids[3], PriceLevel::new(0.0, 0.0));
        assert_eq!(row.bids[4], PriceLevel::new(0.0, 0.0));

        for (i, ask) in row.asks.iter().enumerate() {
            assert_eq!(ask.price, 101.0 + i as f64, "ask order must be preserved");
        }
    }

    #[test]
    fn test_empty_book_is_all_zeros() {
        let row = PriceRow::from_book(1, &book(&[], &[]), Utc::now());
        assert!(row.asks.iter().all(|l| l.price == 0.0 && l.volume == 0.0));
        assert!(row.bids.iter().all(|l| l.price == 0.0 && l.volume == 0.0));
    }
}
