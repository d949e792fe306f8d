//! Price sampler.
//!
//! Subscribes to every venue topic, funnels messages into one internal
//! channel, keeps the latest order book per monitored pair id, and on a
//! fixed cadence writes the top five levels of each side to the store in
//! one transaction. Nothing here ever blocks a publisher: both the bus
//! queues and the internal forwarder drop on full.

use crate::error::MonitorResult;
use chrono::{DateTime, Utc};
use marketd_bus::MessageBus;
use marketd_core::{MessageData, MessageType, UnifiedMessage, UnifiedOrderBook, Venue};
use marketd_store::{PriceRow, SamplerPair, Store};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Queue size of each per-venue bus subscription.
const VENUE_QUEUE: usize = 100;

/// Queue size of the internal universal channel.
const INTERNAL_QUEUE: usize = 1000;

/// Samples the latest books of all monitored pairs into the store.
pub struct PriceSampler {
    store: Arc<Store>,
    bus: Arc<MessageBus>,
    interval: Duration,
    books: Arc<RwLock<HashMap<i64, UnifiedOrderBook>>>,
    monitored: Arc<RwLock<HashMap<i64, SamplerPair>>>,
    tasks: parking_lot::Mutex<Vec<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl PriceSampler {
    pub fn new(store: Arc<Store>, bus: Arc<MessageBus>, interval: Duration) -> Self {
        Self {
            store,
            bus,
            interval,
            books: Arc::new(RwLock::new(HashMap::new())),
            monitored: Arc::new(RwLock::new(HashMap::new())),
            tasks: parking_lot::Mutex::new(Vec::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Load the monitored set, wire up the bus, and spawn the consumer and
    /// ticker tasks.
    pub async fn start(self: &Arc<Self>) -> MonitorResult<()> {
        info!(interval = ?self.interval, "starting price sampler");

        let pairs = self.store.monitoring_pairs().await?;
        {
            let mut monitored = self.monitored.write();
            for pair in pairs {
                monitored.insert(pair.pair_id, pair);
            }
            info!(pairs = monitored.len(), "loaded monitored pairs");
        }

        let (tx, rx) = mpsc::channel::<UnifiedMessage>(INTERNAL_QUEUE);

        // Universal subscriber: one forwarder per venue topic.
        for venue in Venue::ALL {
            let mut sub = self.bus.subscribe(venue.as_str(), VENUE_QUEUE);
            let bus = Arc::clone(&self.bus);
            let tx = tx.clone();
            let shutdown = self.shutdown.clone();
            let handle = tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        msg = sub.recv() => {
                            let Some(msg) = msg else { break };
                            if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(msg) {
                                warn!(venue = %venue, "sampler channel full, dropping message");
                            }
                        }
                    }
                }
                bus.unsubscribe(&sub);
                debug!(venue = %venue, "sampler forwarder stopped");
            });
            self.tasks.lock().push(handle);
        }

        // Consumer: latest-writer-wins book cache keyed by pair id.
        {
            let books = Arc::clone(&self.books);
            let monitored = Arc::clone(&self.monitored);
            let shutdown = self.shutdown.clone();
            let mut rx = rx;
            let handle = tokio::spawn(async move {
                loop {
                    let msg = tokio::select! {
                        _ = shutdown.cancelled() => break,
                        msg = rx.recv() => match msg {
                            Some(msg) => msg,
                            None => break,
                        },
                    };
                    if msg.message_type != MessageType::OrderBook || msg.pair_id <= 0 {
                        continue;
                    }
                    if !monitored.read().contains_key(&msg.pair_id) {
                        continue;
                    }
                    if let MessageData::OrderBook(book) = msg.data {
                        debug!(
                            pair_id = msg.pair_id,
                            venue = %msg.venue,
                            bids = book.bids.len(),
                            asks = book.asks.len(),
                            "order book cached"
                        );
                        books.write().insert(msg.pair_id, book);
                    }
                }
                debug!("sampler consumer stopped");
            });
            self.tasks.lock().push(handle);
        }

        // Ticker: snapshot and persist on the configured cadence.
        {
            let sampler = Arc::clone(self);
            let handle = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(sampler.interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = sampler.shutdown.cancelled() => break,
                        _ = ticker.tick() => {}
                    }
                    if let Err(e) = sampler.collect_and_save().await {
                        error!(error = %e, "price collection tick failed");
                    }
                }
                debug!("sampler ticker stopped");
            });
            self.tasks.lock().push(handle);
        }

        info!("price sampler started");
        Ok(())
    }

    /// One sampler tick: refresh the monitored set, snapshot the cached
    /// books, and write all rows in a single transaction.
    async fn collect_and_save(&self) -> MonitorResult<()> {
        let pairs = self.store.monitoring_pairs().await?;
        if pairs.is_empty() {
            debug!("no pairs to monitor");
            return Ok(());
        }
        {
            let mut monitored = self.monitored.write();
            monitored.clear();
            for pair in &pairs {
                monitored.insert(pair.pair_id, pair.clone());
            }
        }

        let now = Utc::now();
        let rows = {
            let books = self.books.read();
            rows_for_tick(&pairs, &books, now)
        };

        if rows.is_empty() {
            debug!("no price data collected");
            return Ok(());
        }
        self.store.insert_price_rows(&rows).await?;
        debug!(rows = rows.len(), "price snapshot written");
        Ok(())
    }

    /// Cancel the tasks, drop the bus subscriptions, and wait for
    /// everything to wind down.
    pub async fn stop(&self) {
        info!("stopping price sampler");
        self.shutdown.cancel();
        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            let _ = task.await;
        }
        info!("price sampler stopped");
    }
}

/// Build the rows for one tick: the latest cached book per monitored pair,
/// first five levels per side in venue order, zero-padded. Pairs without a
/// cached book (or with an empty side) are skipped with a warning.
fn rows_for_tick(
    pairs: &[SamplerPair],
    books: &HashMap<i64, UnifiedOrderBook>,
    at: DateTime<Utc>,
) -> Vec<PriceRow> {
    let mut rows = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let Some(book) = books.get(&pair.pair_id) else {
            warn!(
                pair_id = pair.pair_id,
                venue = %pair.exchange_name,
                "no order book cached, skipping pair"
            );
            continue;
        };
        if book.bids.is_empty() || book.asks.is_empty() {
            warn!(
                pair_id = pair.pair_id,
                venue = %pair.exchange_name,
                bids = book.bids.len(),
                asks = book.asks.len(),
                "one-sided order book, skipping pair"
            );
            continue;
        }
        rows.push(PriceRow::from_book(pair.pair_id, book, at));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketd_core::{MarketType, OrderBookUpdateType, PriceLevel, UnifiedSymbol};

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

    fn pair(id: i64) -> SamplerPair {
        SamplerPair {
            exchange_id: 1,
            pair_id: id,
            exchange_name: "binance".into(),
        }
    }

    #[test]
    fn test_rows_skip_uncached_and_one_sided() {
        let mut books = HashMap::new();
        books.insert(1, book(&[(100.0, 1.0)], &[(101.0, 1.0)]));
        books.insert(2, book(&[(100.0, 1.0)], &[])); // one-sided

        let rows = rows_for_tick(&[pair(1), pair(2), pair(3)], &books, Utc::now());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pair_id, 1);
    }

    #[test]
    fn test_rows_carry_tick_timestamp_and_padding() {
        let mut books = HashMap::new();
        books.insert(
            7,
            book(
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
            ),
        );
        let at = Utc::now();
        let rows = rows_for_tick(&[pair(7)], &books, at);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.price_timestamp, at);
        // exactly the first five asks, in order
        assert_eq!(row.asks[0].price, 101.0);
        assert_eq!(row.asks[4].price, 105.0);
        // three bids, then zero padding
        assert_eq!(row.bids[2].price, 98.0);
        assert_eq!(row.bids[3], PriceLevel::new(0.0, 0.0));
        assert_eq!(row.bids[4], PriceLevel::new(0.0, 0.0));
    }

    #[tokio::test]
    async fn test_latest_writer_wins_cache_semantics() {
        // The cache the consumer task maintains: a plain insert per book.
        let books: Arc<RwLock<HashMap<i64, UnifiedOrderBook>>> =
            Arc::new(RwLock::new(HashMap::new()));

        books.write().insert(5, book(&[(1.0, 1.0)], &[(2.0, 1.0)]));
        books.write().insert(5, book(&[(10.0, 1.0)], &[(11.0, 1.0)]));

        let rows = rows_for_tick(&[pair(5)], &books.read(), Utc::now());
        assert_eq!(rows[0].bids[0].price, 10.0);
    }
}
