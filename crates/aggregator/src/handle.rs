use crate::intake::Intake;
use crate::rolling::RollingAggregator;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::error;
use trade_agg_core::model::{NormalizedTrade, Symbol, Timeframe};
use trade_agg_core::time::now_s;
use trade_agg_hub::{HubEvent, HubHandle};

const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Handle for enqueueing trades into a running aggregator instance. Cheap
/// to clone; every adapter holds one for the currently-selected symbol.
#[derive(Clone)]
pub struct AggregatorHandle {
    intake: Arc<Intake>,
}

impl AggregatorHandle {
    pub fn enqueue(&self, trade: NormalizedTrade) {
        self.intake.enqueue(trade);
    }

    pub fn dropped_total(&self) -> u64 {
        self.intake.dropped_total()
    }
}

/// Owns the background tick task. Dropping this without calling [`Self::stop`]
/// leaves the task running — the controller always holds it and stops it
/// explicitly on `setSymbol`/`setTimeframe`/`shutdown` (§4.6 restart
/// semantics, §4.9).
pub struct AggregatorTask {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl AggregatorTask {
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(err) = self.join.await {
            if !err.is_cancelled() {
                error!(error = %err, "aggregator task panicked");
            }
        }
    }
}

/// Starts a fresh rolling aggregator for `(symbol, timeframe)`. Every
/// `setSymbol`/`setTimeframe` command stops the previous task and calls
/// this again — no bucket state carries across the change (§4.6).
pub fn start(
    symbol: Symbol,
    timeframe: Timeframe,
    queue_capacity: usize,
    hub: HubHandle,
) -> (AggregatorHandle, AggregatorTask) {
    let intake = Arc::new(Intake::new(queue_capacity));
    let handle = AggregatorHandle {
        intake: Arc::clone(&intake),
    };

    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();
    let join = tokio::spawn(async move {
        let mut aggregator = RollingAggregator::new(symbol, timeframe);
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        loop {
            tokio::select! {
                _ = task_cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let now = now_s();
                    for trade in intake.drain() {
                        if let Some(point) = aggregator.fold_trade(&trade, now) {
                            hub.try_publish(HubEvent::Aggregated(point));
                        }
                    }
                    for point in aggregator.close_due_buckets(now) {
                        hub.try_publish(HubEvent::Aggregated(point));
                    }
                }
            }
        }
    });

    (handle, AggregatorTask { cancel, join })
}

#[cfg(test)]
mod tests {
    use super::*;
    use trade_agg_core::fixed_point::Fx;
    use trade_agg_core::model::Venue;
    use trade_agg_hub::Hub;

    #[tokio::test]
    async fn enqueued_trade_produces_an_aggregated_event_after_bucket_close() {
        let hub = Hub::new();
        let hub_handle = hub.handle();
        let mut receiver = hub_handle.take_receiver().await;

        let (agg, task) = start(Symbol::BtcUsdt, Timeframe::M1, 1024, hub_handle);

        agg.enqueue(NormalizedTrade {
            symbol: Symbol::BtcUsdt,
            venue: Venue::Binance,
            price: Fx::parse("100").unwrap(),
            size: Fx::parse("1").unwrap(),
            timestamp_utc_ns: (now_s() - 120) * 1_000_000_000,
        });

        let event = tokio::time::timeout(Duration::from_secs(2), receiver.recv())
            .await
            .expect("timed out waiting for aggregated event")
            .expect("hub closed");

        match event {
            HubEvent::Aggregated(point) => {
                assert_eq!(point.symbol, Symbol::BtcUsdt);
                assert!(!point.amend);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        task.stop().await;
    }
}
