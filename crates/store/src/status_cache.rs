//! In-memory cache of the latest `ConnectionStatus` per venue, surfaced on
//! the status beacon (§4.5 "1s status beacon").

use dashmap::DashMap;
use std::sync::Arc;
use trade_agg_core::model::{ConnectionStatus, Venue};
use tracing::debug;

struct ConnectionStatusCacheInner {
    statuses: DashMap<Venue, ConnectionStatus>,
    dropped_trades: DashMap<Venue, u64>,
}

impl ConnectionStatusCacheInner {
    fn new() -> Self {
        Self {
            statuses: DashMap::new(),
            dropped_trades: DashMap::new(),
        }
    }
}

/// Handle to the shared connection-status table. Cloning is cheap — it
/// shares the same underlying `DashMap`s.
#[derive(Clone)]
pub struct ConnectionStatusCacheHandle {
    inner: Arc<ConnectionStatusCacheInner>,
}

impl ConnectionStatusCacheHandle {
    pub fn set(&self, status: ConnectionStatus) {
        debug!(venue = %status.venue, connected = status.connected, "updated connection status");
        self.inner.statuses.insert(status.venue, status);
    }

    pub fn get(&self, venue: Venue) -> Option<ConnectionStatus> {
        self.inner.statuses.get(&venue).map(|entry| *entry.value())
    }

    pub fn all(&self) -> Vec<ConnectionStatus> {
        self.inner.statuses.iter().map(|entry| *entry.value()).collect()
    }

    /// Accumulate dropped-trade counts from the aggregator's bounded intake
    /// queue (SPEC_FULL.md §3 supplemented telemetry).
    pub fn record_dropped(&self, venue: Venue, count: u64) {
        *self.inner.dropped_trades.entry(venue).or_insert(0) += count;
    }

    pub fn dropped_count(&self, venue: Venue) -> u64 {
        self.inner
            .dropped_trades
            .get(&venue)
            .map(|entry| *entry.value())
            .unwrap_or(0)
    }

    pub fn clear(&self) {
        self.inner.statuses.clear();
        self.inner.dropped_trades.clear();
    }
}

/// Owns the status table; `handle()` hands out clonable, `Send + Sync`
/// accessors to the rest of the worker.
pub struct ConnectionStatusCache {
    inner: Arc<ConnectionStatusCacheInner>,
}

impl ConnectionStatusCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ConnectionStatusCacheInner::new()),
        }
    }

    pub fn handle(&self) -> ConnectionStatusCacheHandle {
        ConnectionStatusCacheHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for ConnectionStatusCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(venue: Venue, connected: bool) -> ConnectionStatus {
        ConnectionStatus {
            venue,
            connected,
            last_ingest_utc_ns: 0,
            latency_ms_estimate: 0,
        }
    }

    #[test]
    fn set_then_get_round_trips() {
        let cache = ConnectionStatusCache::new();
        let handle = cache.handle();

        handle.set(sample(Venue::Binance, true));
        let status = handle.get(Venue::Binance).unwrap();
        assert!(status.connected);
        assert!(handle.get(Venue::Okx).is_none());
    }

    #[test]
    fn dropped_trade_counts_accumulate_per_venue() {
        let cache = ConnectionStatusCache::new();
        let handle = cache.handle();

        handle.record_dropped(Venue::Kraken, 3);
        handle.record_dropped(Venue::Kraken, 4);
        handle.record_dropped(Venue::Okx, 1);

        assert_eq!(handle.dropped_count(Venue::Kraken), 7);
        assert_eq!(handle.dropped_count(Venue::Okx), 1);
        assert_eq!(handle.dropped_count(Venue::Binance), 0);
    }

    #[test]
    fn clones_share_the_same_underlying_table() {
        let cache = ConnectionStatusCache::new();
        let a = cache.handle();
        let b = a.clone();

        a.set(sample(Venue::Bitget, false));
        assert_eq!(b.get(Venue::Bitget).unwrap().connected, false);
    }
}
