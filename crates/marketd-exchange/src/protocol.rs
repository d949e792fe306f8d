//! Venue wire conventions.
//!
//! This module is the single source for the subscribe/unsubscribe frame
//! shapes, REST probe paths, and keep-alive frames of each venue. The
//! adapter stays venue-agnostic; everything venue-specific is a lookup
//! here keyed on [`Venue`].

use marketd_core::Venue;
use marketd_ws::Message;
use serde_json::json;

/// REST path probed before connecting.
pub fn probe_path(venue: Venue) -> &'static str {
    match venue {
        Venue::Binance => "/api/v3/ping",
        Venue::Bybit => "/v5/market/time",
        Venue::Kucoin => "/api/v1/timestamp",
        Venue::Htx => "/v1/common/timestamp",
        Venue::Coinex => "/v1/market/list",
        Venue::Poloniex => "/markets",
    }
}

/// True when the venue requires a REST-issued session token in the WS URL.
pub fn needs_session_token(venue: Venue) -> bool {
    venue == Venue::Kucoin
}

/// Application-level keep-alive sent every ping interval.
///
/// HTX is server-initiated (ping arrives over the socket and is echoed by
/// the read loop), so no writer task runs for it.
pub fn keepalive(venue: Venue) -> Option<Message> {
    let frame = match venue {
        Venue::Binance => return Some(Message::Ping(Vec::new())),
        Venue::Bybit => json!({"op": "ping"}),
        Venue::Kucoin => json!({"id": "keepalive", "type": "ping"}),
        Venue::Coinex => json!({"method": "server.ping", "params": [], "id": 999}),
        Venue::Poloniex => json!({"event": "ping"}),
        Venue::Htx => return None,
    };
    Some(Message::Text(frame.to_string()))
}

/// Kucoin depth topics exist for 5 and 20 levels; anything else falls back
/// to 5.
fn kucoin_depth(depth: u32) -> u32 {
    if depth == 20 {
        20
    } else {
        5
    }
}

/// Subscribe frames for one symbol (order book + best-price/ticker).
/// `symbol` is already in venue wire form.
pub fn subscribe_frames(venue: Venue, symbol: &str, depth: u32) -> Vec<String> {
    match venue {
        Venue::Binance => vec![json!({
            "method": "SUBSCRIBE",
            "params": [format!("{symbol}@depth{depth}"), format!("{symbol}@bookTicker")],
            "id": 1
        })
        .to_string()],
        Venue::Bybit => vec![
            json!({"op": "subscribe", "args": [format!("orderbook.{depth}.{symbol}")]}).to_string(),
            json!({"op": "subscribe", "args": [format!("tickers.{symbol}")]}).to_string(),
        ],
        Venue::Kucoin => {
            let d = kucoin_depth(depth);
            vec![
                json!({
                    "id": format!("sub-{symbol}-{d}"),
                    "type": "subscribe",
                    "topic": format!("/spotMarket/level2Depth{d}:{symbol}"),
                    "response": true
                })
                .to_string(),
                json!({
                    "id": format!("sub-ticker-{symbol}"),
                    "type": "subscribe",
                    "topic": format!("/spotMarket/level1:{symbol}"),
                    "response": true
                })
                .to_string(),
            ]
        }
        Venue::Htx => vec![
            json!({"sub": format!("market.{symbol}.depth.step{depth}"), "id": format!("sub-{symbol}-{depth}")})
                .to_string(),
            json!({"sub": format!("market.{symbol}.ticker"), "id": format!("sub-ticker-{symbol}")})
                .to_string(),
        ],
        Venue::Coinex => vec![
            json!({"method": "depth.subscribe", "params": [symbol, depth, "0"], "id": 1}).to_string(),
            json!({"method": "state.subscribe", "params": [symbol], "id": 2}).to_string(),
        ],
        Venue::Poloniex => vec![
            json!({"command": "subscribe", "channel": format!("contractMarket/level2Depth5:{symbol}")})
                .to_string(),
            json!({"command": "subscribe", "channel": format!("contractMarket/ticker:{symbol}")})
                .to_string(),
        ],
    }
}

/// Unsubscribe frames for one symbol, mirroring [`subscribe_frames`].
pub fn unsubscribe_frames(venue: Venue, symbol: &str, depth: u32) -> Vec<String> {
    match venue {
        Venue::Binance => vec![json!({
            "method": "UNSUBSCRIBE",
            "params": [format!("{symbol}@depth{depth}"), format!("{symbol}@bookTicker")],
            "id": 2
        })
        .to_string()],
        Venue::Bybit => vec![
            json!({"op": "unsubscribe", "args": [format!("orderbook.{depth}.{symbol}")]}).to_string(),
            json!({"op": "unsubscribe", "args": [format!("tickers.{symbol}")]}).to_string(),
        ],
        Venue::Kucoin => {
            let d = kucoin_depth(depth);
            vec![
                json!({
                    "id": format!("unsub-{symbol}-{d}"),
                    "type": "unsubscribe",
                    "topic": format!("/spotMarket/level2Depth{d}:{symbol}"),
                    "response": true
                })
                .to_string(),
                json!({
                    "id": format!("unsub-ticker-{symbol}"),
                    "type": "unsubscribe",
                    "topic": format!("/spotMarket/level1:{symbol}"),
                    "response": true
                })
                .to_string(),
            ]
        }
        Venue::Htx => vec![
            json!({"unsub": format!("market.{symbol}.depth.step{depth}"), "id": format!("unsub-{symbol}-{depth}")})
                .to_string(),
            json!({"unsub": format!("market.{symbol}.ticker"), "id": format!("unsub-ticker-{symbol}")})
                .to_string(),
        ],
        Venue::Coinex => vec![
            json!({"method": "depth.unsubscribe", "params": [symbol, depth, "0"], "id": 3}).to_string(),
            json!({"method": "state.unsubscribe", "params": [symbol], "id": 4}).to_string(),
        ],
        Venue::Poloniex => vec![
            json!({"command": "unsubscribe", "channel": format!("contractMarket/level2Depth5:{symbol}")})
                .to_string(),
            json!({"command": "unsubscribe", "channel": format!("contractMarket/ticker:{symbol}")})
                .to_string(),
        ],
    }
}

/// HTX `{"pong": N}` reply frame.
pub fn htx_pong(ping: i64) -> String {
    json!({"pong": ping}).to_string()
}
