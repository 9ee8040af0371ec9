//! Candle up-aggregation (§4.8): deterministically roll ascending,
//! lower-granularity candles into a target timeframe that is an integer
//! multiple of the source granularity.

use trade_agg_core::fixed_point::FxAcc;
use trade_agg_core::model::Candle;
use trade_agg_core::time::floor_to_bucket;

/// Roll `candles` (ascending by `open_time_utc_s`, all of the same source
/// granularity) up into `target_timeframe_secs`. `target_timeframe_secs`
/// must be an integer multiple of the source granularity — callers
/// (backfill planners) only invoke this once they've confirmed that.
pub fn up_aggregate(candles: &[Candle], target_timeframe_secs: i64) -> Vec<Candle> {
    let mut out: Vec<Candle> = Vec::new();

    for candle in candles {
        let bucket_open = floor_to_bucket(candle.open_time_utc_s, target_timeframe_secs);

        match out.last_mut() {
            Some(last) if last.open_time_utc_s == bucket_open => {
                last.close = candle.close;
                if candle.high > last.high {
                    last.high = candle.high;
                }
                if candle.low < last.low {
                    last.low = candle.low;
                }
                last.volume = FxAcc::ZERO
                    .add(last.volume)
                    .add(candle.volume)
                    .to_fx_saturating();
            }
            _ => {
                out.push(Candle {
                    symbol: candle.symbol,
                    timeframe: candle.timeframe,
                    open_time_utc_s: bucket_open,
                    open: candle.open,
                    high: candle.high,
                    low: candle.low,
                    close: candle.close,
                    volume: candle.volume,
                });
            }
        }
    }

    out
}

/// Relabels every candle's `timeframe` field to `target`, leaving OHLCV
/// untouched — used after up-aggregation and after direct native fetches so
/// the response always carries the requested timeframe (§4.7 closing note).
pub fn relabel(candles: Vec<Candle>, target: trade_agg_core::model::Timeframe) -> Vec<Candle> {
    candles
        .into_iter()
        .map(|mut c| {
            c.timeframe = target;
            c
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use trade_agg_core::fixed_point::Fx;
    use trade_agg_core::model::{Symbol, Timeframe};

    fn candle(open_time_utc_s: i64, o: &str, h: &str, l: &str, c: &str, v: &str) -> Candle {
        Candle {
            symbol: Symbol::BtcUsdt,
            timeframe: Timeframe::M1,
            open_time_utc_s,
            open: Fx::parse(o).unwrap(),
            high: Fx::parse(h).unwrap(),
            low: Fx::parse(l).unwrap(),
            close: Fx::parse(c).unwrap(),
            volume: Fx::parse(v).unwrap(),
        }
    }

    #[test]
    fn rolls_five_one_minute_candles_into_one_five_minute_candle() {
        let minutes: Vec<Candle> = (0..5)
            .map(|i| candle(i * 60, "100", "110", "90", "105", "1"))
            .collect();

        let rolled = up_aggregate(&minutes, 300);
        assert_eq!(rolled.len(), 1);
        assert_eq!(rolled[0].open_time_utc_s, 0);
        assert_eq!(rolled[0].open, Fx::parse("100").unwrap());
        assert_eq!(rolled[0].close, Fx::parse("105").unwrap());
        assert_eq!(rolled[0].high, Fx::parse("110").unwrap());
        assert_eq!(rolled[0].low, Fx::parse("90").unwrap());
        assert_eq!(rolled[0].volume, Fx::parse("5").unwrap());
    }

    #[test]
    fn output_stays_ascending_across_multiple_target_buckets() {
        let minutes: Vec<Candle> = (0..10)
            .map(|i| candle(i * 60, "100", "100", "100", "100", "1"))
            .collect();

        let rolled = up_aggregate(&minutes, 300);
        assert_eq!(rolled.len(), 2);
        assert_eq!(rolled[0].open_time_utc_s, 0);
        assert_eq!(rolled[1].open_time_utc_s, 300);
        assert!(rolled[0].open_time_utc_s < rolled[1].open_time_utc_s);
    }

    /// S6 from the documented backfill scenario: 60 one-minute candles
    /// roll up into exactly 2 thirty-minute candles.
    #[test]
    fn documented_gap_fill_scenario_rolls_sixty_one_minute_candles_into_two() {
        let minutes: Vec<Candle> = (0..60)
            .map(|i| candle(i * 60, "100", "100", "100", "100", "1"))
            .collect();

        let rolled = relabel(up_aggregate(&minutes, 1_800), Timeframe::M30);
        assert_eq!(rolled.len(), 2);
        assert!(rolled.iter().all(|c| c.timeframe == Timeframe::M30));
        assert_eq!(rolled[0].volume, Fx::parse("30").unwrap());
        assert_eq!(rolled[1].volume, Fx::parse("30").unwrap());
    }

    #[test]
    fn relabel_changes_timeframe_without_touching_ohlcv() {
        let source = vec![candle(0, "1", "2", "0.5", "1.5", "10")];
        let relabeled = relabel(source.clone(), Timeframe::H1);
        assert_eq!(relabeled[0].timeframe, Timeframe::H1);
        assert_eq!(relabeled[0].open, source[0].open);
    }
}
