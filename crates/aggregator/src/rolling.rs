//! The rolling aggregator's per-instance bucket state (§4.6). Pure and
//! synchronous — the async tick/queue plumbing lives in [`crate::handle`].

use trade_agg_core::fixed_point::{Fx, FxAcc};
use trade_agg_core::model::{AggregatedDataPoint, NormalizedTrade, Symbol, Timeframe};
use trade_agg_core::time::floor_to_bucket;

/// Trades older than this relative to wall-clock `now` are corrupt/misaligned
/// and discarded outright (§4.6 sanity filter).
const SANITY_WINDOW_SECS: i64 = 7 * 24 * 60 * 60;

/// Window, after a bucket's close, during which further trades for that
/// bucket still produce `amend = true` events (§4.6 / §8 single-bucket
/// emission law).
const AMEND_GRACE_SECS: i64 = 2;

/// One symbol/timeframe's worth of rolling-bucket state. Recreated (never
/// mutated across) a symbol or timeframe change (§4.6 restart semantics).
#[derive(Debug)]
pub struct RollingAggregator {
    symbol: Symbol,
    timeframe: Timeframe,
    bucket_open_s: Option<i64>,
    pv_sum: FxAcc,
    v_sum: FxAcc,
    last_price: Option<Fx>,
    last_emitted: Option<AggregatedDataPoint>,
    // Snapshot of the accumulator state behind `last_emitted`, kept alive
    // through the amend grace window so a late trade for the
    // already-closed bucket can be folded in without disturbing the sums
    // already accumulating for the next bucket.
    amend_pv_sum: FxAcc,
    amend_v_sum: FxAcc,
    amend_last_price: Option<Fx>,
}

impl RollingAggregator {
    pub fn new(symbol: Symbol, timeframe: Timeframe) -> Self {
        Self {
            symbol,
            timeframe,
            bucket_open_s: None,
            pv_sum: FxAcc::ZERO,
            v_sum: FxAcc::ZERO,
            last_price: None,
            last_emitted: None,
            amend_pv_sum: FxAcc::ZERO,
            amend_v_sum: FxAcc::ZERO,
            amend_last_price: None,
        }
    }

    /// Fold one trade into the current bucket. Returns `Some(point)` only
    /// when folding this specific trade itself triggers an `amend = true`
    /// emission (§4.6 step 2) — the `amend = false` boundary emission is
    /// driven separately by [`Self::close_due_buckets`], since it can fire
    /// with no trade present at all.
    pub fn fold_trade(&mut self, trade: &NormalizedTrade, now_s: i64) -> Option<AggregatedDataPoint> {
        if trade.timestamp_utc_s() < now_s - SANITY_WINDOW_SECS {
            return None;
        }

        let tf_s = self.timeframe.seconds();
        let bucket_open = floor_to_bucket(trade.timestamp_utc_s(), tf_s);

        if let Some(last) = self.last_emitted {
            if bucket_open == last.timestamp_utc_s {
                let within_grace = now_s - (last.timestamp_utc_s + tf_s) <= AMEND_GRACE_SECS;
                if !within_grace {
                    // Late trade for a bucket whose amend window has
                    // already elapsed: too stale to amend.
                    return None;
                }
                self.amend_pv_sum = self.amend_pv_sum.add_product(trade.price, trade.size);
                self.amend_v_sum = self.amend_v_sum.add(trade.size);
                self.amend_last_price = Some(trade.price);
                let point = build_point(
                    self.symbol,
                    self.timeframe,
                    last.timestamp_utc_s,
                    true,
                    self.amend_pv_sum,
                    self.amend_v_sum,
                    self.amend_last_price,
                );
                self.last_emitted = Some(point);
                return Some(point);
            }
        }

        match self.bucket_open_s {
            None => {
                self.bucket_open_s = Some(bucket_open);
            }
            Some(current) if bucket_open > current => {
                self.bucket_open_s = Some(bucket_open);
                self.pv_sum = FxAcc::ZERO;
                self.v_sum = FxAcc::ZERO;
            }
            Some(current) if bucket_open < current => {
                // Stale trade outside the amend grace window: drop.
                return None;
            }
            Some(_) => {}
        }

        self.pv_sum = self.pv_sum.add_product(trade.price, trade.size);
        self.v_sum = self.v_sum.add(trade.size);
        self.last_price = Some(trade.price);
        None
    }

    /// Emits the `amend = false` boundary event(s) for any bucket whose
    /// close time has passed as of `now_s` (§4.6 step 4). Loops so a gap in
    /// ticks (no trades, process stall) still produces one emission per
    /// elapsed bucket rather than silently skipping ahead.
    pub fn close_due_buckets(&mut self, now_s: i64) -> Vec<AggregatedDataPoint> {
        let tf_s = self.timeframe.seconds();
        let mut emitted = Vec::new();

        while let Some(open) = self.bucket_open_s {
            if now_s < open + tf_s {
                break;
            }
            let point = build_point(
                self.symbol,
                self.timeframe,
                open,
                false,
                self.pv_sum,
                self.v_sum,
                self.last_price,
            );
            self.last_emitted = Some(point);
            self.amend_pv_sum = self.pv_sum;
            self.amend_v_sum = self.v_sum;
            self.amend_last_price = self.last_price;
            emitted.push(point);

            self.bucket_open_s = Some(open + tf_s);
            self.pv_sum = FxAcc::ZERO;
            self.v_sum = FxAcc::ZERO;
        }

        emitted
    }
}

fn build_point(
    symbol: Symbol,
    timeframe: Timeframe,
    timestamp_utc_s: i64,
    amend: bool,
    pv_sum: FxAcc,
    v_sum: FxAcc,
    last_price: Option<Fx>,
) -> AggregatedDataPoint {
    let last_price = last_price.unwrap_or(Fx::ZERO);
    let volume = v_sum.to_fx_saturating();
    let vwap = if v_sum.is_zero() {
        last_price
    } else {
        pv_sum.checked_div(v_sum).unwrap_or(last_price)
    };

    AggregatedDataPoint {
        symbol,
        timeframe,
        timestamp_utc_s,
        vwap,
        volume,
        last_price,
        amend,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trade_agg_core::model::Venue;

    fn trade(price: &str, size: &str, ts_s: i64) -> NormalizedTrade {
        NormalizedTrade {
            symbol: Symbol::BtcUsdt,
            venue: Venue::Binance,
            price: Fx::parse(price).unwrap(),
            size: Fx::parse(size).unwrap(),
            timestamp_utc_ns: ts_s * 1_000_000_000,
        }
    }

    #[test]
    fn single_bucket_emits_exactly_once_then_amends_within_grace() {
        let mut agg = RollingAggregator::new(Symbol::BtcUsdt, Timeframe::M1);
        agg.fold_trade(&trade("100", "1", 10), 10);
        agg.fold_trade(&trade("200", "1", 50), 50);

        let emitted = agg.close_due_buckets(60);
        assert_eq!(emitted.len(), 1);
        assert!(!emitted[0].amend);
        assert_eq!(emitted[0].vwap, Fx::parse("150").unwrap());
        assert_eq!(emitted[0].volume, Fx::parse("2").unwrap());

        // Late trade whose own timestamp (55) still falls in the
        // already-closed bucket [0, 60), delivered one second after close.
        let amend = agg.fold_trade(&trade("400", "1", 55), 61).unwrap();
        assert!(amend.amend);
        assert_eq!(amend.volume, Fx::parse("3").unwrap());
    }

    /// S4/S5 from the documented message-port scenarios: a two-trade 1m
    /// bucket, then a late third trade amending it within the grace window.
    #[test]
    fn documented_aggregation_and_amend_scenario_matches_exactly() {
        let mut agg = RollingAggregator::new(Symbol::BtcUsdt, Timeframe::M1);
        agg.fold_trade(&trade("100.0", "1.0", 0), 0);
        agg.fold_trade(&trade("102.0", "2.0", 10), 10);

        let emitted = agg.close_due_buckets(60);
        assert_eq!(emitted.len(), 1);
        let point = emitted[0];
        assert!(!point.amend);
        assert_eq!(point.vwap, Fx::parse("101.33333333").unwrap());
        assert_eq!(point.volume, Fx::parse("3.00000000").unwrap());
        assert_eq!(point.last_price, Fx::parse("102.00000000").unwrap());

        let amend = agg.fold_trade(&trade("98.0", "1.0", 30), 61).unwrap();
        assert!(amend.amend);
        assert_eq!(amend.vwap, Fx::parse("100.50000000").unwrap());
        assert_eq!(amend.volume, Fx::parse("4.00000000").unwrap());
        assert_eq!(amend.last_price, Fx::parse("98.00000000").unwrap());
    }

    #[test]
    fn amend_outside_grace_window_is_dropped() {
        let mut agg = RollingAggregator::new(Symbol::BtcUsdt, Timeframe::M1);
        agg.fold_trade(&trade("100", "1", 10), 10);
        agg.close_due_buckets(60);

        // 3s after close: past the 2s grace window.
        let result = agg.fold_trade(&trade("999", "1", 59), 63);
        assert!(result.is_none());
    }

    #[test]
    fn zero_volume_bucket_vwap_falls_back_to_last_price() {
        let mut agg = RollingAggregator::new(Symbol::BtcUsdt, Timeframe::M1);
        agg.fold_trade(&trade("100", "0", 10), 10);
        let emitted = agg.close_due_buckets(60);
        assert_eq!(emitted[0].vwap, Fx::parse("100").unwrap());
        assert_eq!(emitted[0].volume, Fx::ZERO);
    }

    #[test]
    fn sanity_filter_drops_trades_older_than_seven_days() {
        let mut agg = RollingAggregator::new(Symbol::BtcUsdt, Timeframe::M1);
        let now = 10 * 24 * 60 * 60;
        let stale = trade("100", "1", 0);
        assert!(agg.fold_trade(&stale, now).is_none());
        assert!(agg.close_due_buckets(now).is_empty());
    }

    #[test]
    fn a_gap_with_no_trades_still_closes_each_elapsed_bucket() {
        let mut agg = RollingAggregator::new(Symbol::BtcUsdt, Timeframe::M1);
        agg.fold_trade(&trade("100", "1", 5), 5);
        let emitted = agg.close_due_buckets(5 + 60 * 3);
        assert_eq!(emitted.len(), 3);
        assert!(emitted.iter().all(|p| !p.amend));
    }
}
