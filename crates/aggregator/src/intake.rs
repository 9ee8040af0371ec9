//! Bounded, drop-oldest intake queue (§9 "unbounded internal queue" design
//! note, resolved by bounding it — see SPEC_FULL.md §3).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use trade_agg_core::model::NormalizedTrade;
use tracing::warn;

pub struct Intake {
    queue: Mutex<VecDeque<NormalizedTrade>>,
    capacity: usize,
    dropped_total: AtomicU64,
}

impl Intake {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            dropped_total: AtomicU64::new(0),
        }
    }

    /// Non-blocking; drops the oldest queued trade when at capacity rather
    /// than applying backpressure to the adapter calling this.
    pub fn enqueue(&self, trade: NormalizedTrade) {
        let mut queue = self.queue.lock().expect("intake queue poisoned");
        if queue.len() >= self.capacity {
            queue.pop_front();
            let total = self.dropped_total.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(total, "aggregator intake queue full, dropping oldest trade");
        }
        queue.push_back(trade);
    }

    pub fn drain(&self) -> Vec<NormalizedTrade> {
        let mut queue = self.queue.lock().expect("intake queue poisoned");
        queue.drain(..).collect()
    }

    pub fn dropped_total(&self) -> u64 {
        self.dropped_total.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trade_agg_core::fixed_point::Fx;
    use trade_agg_core::model::{Symbol, Venue};

    fn trade(n: i64) -> NormalizedTrade {
        NormalizedTrade {
            symbol: Symbol::BtcUsdt,
            venue: Venue::Binance,
            price: Fx::parse("1").unwrap(),
            size: Fx::parse("1").unwrap(),
            timestamp_utc_ns: n,
        }
    }

    #[test]
    fn drains_in_arrival_order() {
        let intake = Intake::new(10);
        intake.enqueue(trade(1));
        intake.enqueue(trade(2));
        intake.enqueue(trade(3));

        let drained = intake.drain();
        assert_eq!(
            drained.iter().map(|t| t.timestamp_utc_ns).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(intake.drain().is_empty());
    }

    #[test]
    fn drops_oldest_once_at_capacity() {
        let intake = Intake::new(2);
        intake.enqueue(trade(1));
        intake.enqueue(trade(2));
        intake.enqueue(trade(3)); // drops trade(1)

        let drained = intake.drain();
        assert_eq!(
            drained.iter().map(|t| t.timestamp_utc_ns).collect::<Vec<_>>(),
            vec![2, 3]
        );
        assert_eq!(intake.dropped_total(), 1);
    }
}
