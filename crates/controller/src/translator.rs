//! Pure translation from internal [`HubEvent`]s to outbound wire [`Event`]s
//! (§6), factored out of [`crate::controller::Controller`] so the worker's
//! background hub-forwarding task can hold a cheap clone independent of the
//! controller that owns command dispatch.

use std::sync::{Arc, Mutex};
use trade_agg_aggregator::AggregatorHandle;
use trade_agg_hub::HubEvent;
use trade_agg_port::{Envelope, Event, StatusPayload};
use trade_agg_store::ConnectionStatusCacheHandle;

pub(crate) type SharedAggregator = Arc<Mutex<Option<AggregatorHandle>>>;

#[derive(Clone)]
pub struct EventTranslator {
    status_cache: ConnectionStatusCacheHandle,
    aggregator_slot: SharedAggregator,
}

impl EventTranslator {
    pub(crate) fn new(status_cache: ConnectionStatusCacheHandle, aggregator_slot: SharedAggregator) -> Self {
        Self {
            status_cache,
            aggregator_slot,
        }
    }

    /// Translate one background event. `Status` events update the shared
    /// connection-status cache and are enriched with the current
    /// dropped-trade counter (SPEC_FULL.md §3) before being framed.
    pub fn translate(&self, event: HubEvent) -> Option<Envelope> {
        match event {
            HubEvent::Aggregated(point) => Some(Envelope::new(Event::Aggregated(point), None)),
            HubEvent::Candle { req_id, candle } => Some(Envelope::new(Event::Candle(candle), req_id)),
            HubEvent::Status(status) => {
                self.status_cache.set(status);
                let queue_dropped_total = self
                    .aggregator_slot
                    .lock()
                    .expect("aggregator slot poisoned")
                    .as_ref()
                    .map(|h| h.dropped_total())
                    .unwrap_or(0);
                Some(Envelope::new(
                    Event::Status(StatusPayload {
                        exchange: status.venue,
                        connected: status.connected,
                        last_ingest_utc_ns: status.last_ingest_utc_ns,
                        latency_ms_estimate: status.latency_ms_estimate,
                        queue_dropped_total,
                    }),
                    None,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trade_agg_core::model::{ConnectionStatus, Venue};
    use trade_agg_store::ConnectionStatusCache;

    #[test]
    fn status_event_enriches_with_dropped_total_and_updates_cache() {
        let cache = ConnectionStatusCache::new();
        let translator = EventTranslator::new(cache.handle(), Arc::new(Mutex::new(None)));

        let envelope = translator
            .translate(HubEvent::Status(ConnectionStatus {
                venue: Venue::Binance,
                connected: true,
                last_ingest_utc_ns: 10,
                latency_ms_estimate: 5,
            }))
            .unwrap();

        match envelope.event {
            Event::Status(payload) => {
                assert_eq!(payload.exchange, Venue::Binance);
                assert_eq!(payload.queue_dropped_total, 0);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(cache.handle().get(Venue::Binance).is_some());
    }
}
