//! The live set of venue supervisors backing the currently-selected symbol
//! (§4.9 "Owns... the set of live adapters"). Stopping and starting this set
//! is how `setSymbol` switches venues (§4.9's adapter-set table).

use crate::adapters::AnyAdapter;
use std::sync::Arc;
use tokio::sync::mpsc;
use trade_agg_core::model::{NormalizedTrade, Symbol};
use trade_agg_core::symbol_map::venues_for_symbol;
use trade_agg_exchanges_common::{start_supervisor, SupervisorConfig, SupervisorHandle, VenueProtocol};
use trade_agg_hub::HubHandle;
use tracing::info;

/// A running supervisor for one venue, paired with the adapter it drives
/// (kept alive for the supervisor's `Arc` to stay valid, and so `backfill`
/// can reuse the same adapter instance for REST calls on this symbol).
pub struct LiveAdapter {
    pub adapter: Arc<AnyAdapter>,
    handle: SupervisorHandle,
}

/// Owns every venue supervisor currently streaming trades for one symbol.
#[derive(Default)]
pub struct AdapterSet {
    live: Vec<LiveAdapter>,
}

impl AdapterSet {
    pub fn new() -> Self {
        Self { live: Vec::new() }
    }

    /// Stops every currently-running supervisor (§4.4 `disconnect()`,
    /// idempotent) then starts a fresh one per venue for `symbol` (§4.9's
    /// adapter-set table).
    pub async fn restart_for_symbol(
        &mut self,
        symbol: Symbol,
        http: reqwest::Client,
        trade_tx: mpsc::Sender<NormalizedTrade>,
        hub: HubHandle,
        config: SupervisorConfig,
    ) {
        self.stop_all().await;

        for &venue in venues_for_symbol(symbol) {
            info!(%venue, %symbol, "starting adapter");
            let adapter = Arc::new(AnyAdapter::for_venue(venue, http.clone()));
            let supervisor_handle = start_supervisor(
                Arc::clone(&adapter),
                symbol,
                trade_tx.clone(),
                hub.clone(),
                config,
            );
            self.live.push(LiveAdapter {
                adapter,
                handle: supervisor_handle,
            });
        }
    }

    /// Stop every supervisor and release the set (§4.9 `shutdown`).
    pub async fn stop_all(&mut self) {
        for live in self.live.drain(..) {
            live.handle.disconnect().await;
        }
    }

    /// Returns the adapter for `venue` if it is currently live, for reuse by
    /// the backfill planner instead of constructing a fresh client.
    pub fn find(&self, venue: trade_agg_core::model::Venue) -> Option<&Arc<AnyAdapter>> {
        self.live
            .iter()
            .find(|live| live.adapter.venue() == venue)
            .map(|live| &live.adapter)
    }
}
