//! Subscription supervisor.
//!
//! Every reconciliation tick the supervisor loads the desired set of
//! `(venue, market_type, symbols)` subscriptions from the catalog, groups
//! it by `venue|market_type`, and brings the set of live adapters in line:
//! missing keys get a new adapter, existing keys get their subscription
//! reconciled, vanished keys are stopped. Errors are counted and retried
//! on the next tick; there is no circuit breaker.

use crate::error::MonitorResult;
use marketd_bus::MessageBus;
use marketd_core::MarketType;
use marketd_exchange::{
    build_adapter, AdapterConfig, ExchangeAdapter, MarketPair, VenueEndpoints,
};
use marketd_store::{MonitoredPair, Store};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Reconciliation cadence.
const RECONCILE_INTERVAL: Duration = Duration::from_secs(5);

/// Default depth requested from every venue.
const DEFAULT_DEPTH: u32 = 5;

/// One desired subscription group.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DesiredGroup {
    pub venue_name: String,
    pub market_type: MarketType,
    pub pairs: Vec<MarketPair>,
}

/// Group catalog rows by `venue|market_type`. Rows with an unknown market
/// type are dropped and reported back to the caller.
pub(crate) fn group_pairs(
    rows: &[MonitoredPair],
) -> (HashMap<String, DesiredGroup>, usize) {
    let mut groups: HashMap<String, DesiredGroup> = HashMap::new();
    let mut rejected = 0usize;

    for row in rows {
        let venue_name = row.exchange_name.to_lowercase();
        let market_type = match MarketType::parse(&row.market_type) {
            Ok(mt) => mt,
            Err(e) => {
                warn!(symbol = %row.symbol, error = %e, "skipping pair with unknown market type");
                rejected += 1;
                continue;
            }
        };
        let key = format!("{venue_name}|{market_type}");
        groups
            .entry(key)
            .or_insert_with(|| DesiredGroup {
                venue_name: venue_name.clone(),
                market_type,
                pairs: Vec::new(),
            })
            .pairs
            .push(MarketPair {
                symbol: row.symbol.clone(),
                pair_id: row.pair_id,
            });
    }
    (groups, rejected)
}

/// Supervisor counters plus uptime since the first worker start.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorMetrics {
    pub active_workers: usize,
    pub total_started: u64,
    pub total_stopped: u64,
    pub total_errors: u64,
    pub uptime: Option<Duration>,
}

/// Reconciles live adapters against the catalog's desired state.
pub struct FeedSupervisor {
    store: Arc<Store>,
    bus: Arc<MessageBus>,
    adapter_config: AdapterConfig,
    workers: Mutex<HashMap<String, Arc<ExchangeAdapter>>>,
    total_started: AtomicU64,
    total_stopped: AtomicU64,
    total_errors: AtomicU64,
    first_start: parking_lot::Mutex<Option<Instant>>,
    shutdown: CancellationToken,
}

impl FeedSupervisor {
    pub fn new(store: Arc<Store>, bus: Arc<MessageBus>, adapter_config: AdapterConfig) -> Self {
        Self {
            store,
            bus,
            adapter_config,
            workers: Mutex::new(HashMap::new()),
            total_started: AtomicU64::new(0),
            total_stopped: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            first_start: parking_lot::Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    /// Run reconciliation ticks until stopped.
    pub async fn run(self: Arc<Self>) {
        info!("feed supervisor started");
        let mut ticker = tokio::time::interval(RECONCILE_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("feed supervisor stopping");
                    return;
                }
                _ = ticker.tick() => {}
            }
            self.reconcile().await;

            let m = self.metrics().await;
            debug!(
                active = m.active_workers,
                started = m.total_started,
                stopped = m.total_stopped,
                errors = m.total_errors,
                "reconcile tick complete"
            );
        }
    }

    /// One reconciliation pass. A catalog failure leaves the worker set
    /// untouched; the next tick retries.
    pub async fn reconcile(&self) {
        let rows = match self.store.active_pairs_for_data_monitor().await {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, "catalog unreachable, skipping reconcile tick");
                return;
            }
        };

        let (desired, rejected) = group_pairs(&rows);
        self.total_errors.fetch_add(rejected as u64, Ordering::Relaxed);
        debug!(groups = desired.len(), pairs = rows.len(), "reconciling");

        let mut workers = self.workers.lock().await;

        for (key, group) in &desired {
            match workers.get(key) {
                Some(adapter) => {
                    if let Err(e) = adapter
                        .subscribe(&group.pairs, group.market_type, DEFAULT_DEPTH)
                        .await
                    {
                        warn!(key = %key, error = %e, "subscription refresh failed");
                        self.total_errors.fetch_add(1, Ordering::Relaxed);
                    }
                }
                None => match self.spawn_worker(group).await {
                    Ok(adapter) => {
                        workers.insert(key.clone(), adapter);
                        self.total_started.fetch_add(1, Ordering::Relaxed);
                        self.first_start.lock().get_or_insert_with(Instant::now);
                        info!(key = %key, "worker started");
                    }
                    Err(e) => {
                        error!(key = %key, error = %e, "worker start failed");
                        self.total_errors.fetch_add(1, Ordering::Relaxed);
                    }
                },
            }
        }

        let stale: Vec<String> = workers
            .keys()
            .filter(|key| !desired.contains_key(*key))
            .cloned()
            .collect();
        for key in stale {
            if let Some(adapter) = workers.remove(&key) {
                adapter.stop().await;
                self.total_stopped.fetch_add(1, Ordering::Relaxed);
                info!(key = %key, "worker stopped, no longer in catalog");
            }
        }
    }

    async fn spawn_worker(&self, group: &DesiredGroup) -> MonitorResult<Arc<ExchangeAdapter>> {
        let record = self.store.exchange_by_name(&group.venue_name).await?;
        let endpoints = VenueEndpoints {
            name: record.name,
            base_url: record.base_url,
            ws_url: record.ws_url,
        };
        let adapter = build_adapter(endpoints, Arc::clone(&self.bus), self.adapter_config.clone())?;
        Arc::clone(&adapter).start().await?;
        adapter
            .subscribe(&group.pairs, group.market_type, DEFAULT_DEPTH)
            .await?;
        Ok(adapter)
    }

    /// Stop every worker and the reconciliation loop.
    pub async fn stop(&self) {
        self.shutdown.cancel();
        let mut workers = self.workers.lock().await;
        for (key, adapter) in workers.drain() {
            adapter.stop().await;
            self.total_stopped.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "worker stopped");
        }
        info!("all feed workers stopped");
    }

    pub async fn metrics(&self) -> SupervisorMetrics {
        SupervisorMetrics {
            active_workers: self.workers.lock().await.len(),
            total_started: self.total_started.load(Ordering::Relaxed),
            total_stopped: self.total_stopped.load(Ordering::Relaxed),
            total_errors: self.total_errors.load(Ordering::Relaxed),
            uptime: self.first_start.lock().map(|t| t.elapsed()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(venue: &str, market_type: &str, pair_id: i64, symbol: &str) -> MonitoredPair {
        MonitoredPair {
            exchange_id: 1,
            exchange_name: venue.to_string(),
            pair_id,
            symbol: symbol.to_string(),
            market_type: market_type.to_string(),
        }
    }

    #[test]
    fn test_grouping_by_venue_and_market() {
        let rows = vec![
            row("Binance", "SPOT", 1, "BTCUSDT"),
            row("binance", "spot", 2, "ETHUSDT"),
            row("bybit", "spot", 3, "BTCUSDT"),
            row("binance", "futures", 4, "BTCUSDT"),
        ];
        let (groups, rejected) = group_pairs(&rows);
        assert_eq!(rejected, 0);
        assert_eq!(groups.len(), 3);

        let binance_spot = &groups["binance|spot"];
        assert_eq!(binance_spot.market_type, MarketType::Spot);
        assert_eq!(
            binance_spot.pairs,
            vec![
                MarketPair { symbol: "BTCUSDT".into(), pair_id: 1 },
                MarketPair { symbol: "ETHUSDT".into(), pair_id: 2 },
            ]
        );
        assert_eq!(groups["binance|futures"].market_type, MarketType::Futures);
        assert_eq!(groups["bybit|spot"].pairs.len(), 1);
    }

    #[test]
    fn test_unknown_market_type_is_rejected_not_fatal() {
        let rows = vec![
            row("binance", "spot", 1, "BTCUSDT"),
            row("binance", "margin", 2, "ETHUSDT"),
        ];
        let (groups, rejected) = group_pairs(&rows);
        assert_eq!(rejected, 1);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["binance|spot"].pairs.len(), 1);
    }

    #[test]
    fn test_desired_set_drives_removals() {
        // The worker-set diff the reconcile pass applies.
        let rows_before = vec![row("binance", "spot", 1, "X"), row("bybit", "spot", 2, "Y")];
        let rows_after = vec![row("binance", "spot", 1, "X"), row("binance", "spot", 3, "Z")];

        let (before, _) = group_pairs(&rows_before);
        let (after, _) = group_pairs(&rows_after);

        let stale: Vec<&String> = before.keys().filter(|k| !after.contains_key(*k)).collect();
        assert_eq!(stale, vec!["bybit|spot"]);
        assert_eq!(after["binance|spot"].pairs.len(), 2);
    }
}
