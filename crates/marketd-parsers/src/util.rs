//! Shared parsing helpers.

use chrono::{DateTime, TimeZone, Utc};
use marketd_core::PriceLevel;

/// Parse a venue decimal string; malformed input yields 0.0.
pub(crate) fn parse_f64(s: &str) -> f64 {
    s.trim().parse().unwrap_or(0.0)
}

/// Venue millisecond timestamp, falling back to now for zero/garbage.
pub(crate) fn ts_from_millis(ms: i64) -> DateTime<Utc> {
    if ms > 0 {
        Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
    } else {
        Utc::now()
    }
}

/// Convert `[["price","volume"], ...]` string pairs into price levels,
/// keeping venue order and zero volumes (deletion markers on deltas).
pub(crate) fn levels_from_str_pairs(pairs: &[Vec<String>]) -> Vec<PriceLevel> {
    pairs
        .iter()
        .filter(|p| p.len() >= 2)
        .map(|p| PriceLevel::new(parse_f64(&p[0]), parse_f64(&p[1])))
        .collect()
}

/// Convert `[[price, volume], ...]` numeric pairs into price levels.
pub(crate) fn levels_from_num_pairs(pairs: &[Vec<f64>]) -> Vec<PriceLevel> {
    pairs
        .iter()
        .filter(|p| p.len() >= 2)
        .map(|p| PriceLevel::new(p[0], p[1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_f64_lenient() {
        assert_eq!(parse_f64("1.5"), 1.5);
        assert_eq!(parse_f64(" 2 "), 2.0);
        assert_eq!(parse_f64("bogus"), 0.0);
    }

    #[test]
    fn test_levels_keep_order_and_zero_volume() {
        let pairs = vec![
            vec!["100.5".to_string(), "0".to_string()],
            vec!["100.4".to_string(), "2".to_string()],
            vec!["short".to_string()],
        ];
        let levels = levels_from_str_pairs(&pairs);
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].price, 100.5);
        assert_eq!(levels[0].volume, 0.0);
        assert_eq!(levels[1].price, 100.4);
    }
}
