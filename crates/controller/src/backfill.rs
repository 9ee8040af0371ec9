//! The backfill planner (§4.7): venue selection, REST fetch through the
//! selected venue's own pagination discipline, and the partial-success
//! enrichment supplement (SPEC_FULL.md §3).

use crate::adapters::AnyAdapter;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use trade_agg_core::model::{Candle, Symbol, Timeframe};
use trade_agg_core::symbol_map::backfill_preference;
use trade_agg_exchanges_common::HistoricalCandles;

/// Outcome of a backfill attempt: the candles fetched, plus whether the
/// venue appears to have returned less than the full requested window
/// (SPEC_FULL.md §3 "error event enrichment on partial backfill").
pub struct BackfillResult {
    pub candles: Vec<Candle>,
    pub partial: bool,
}

/// Runs `fetch_historical_candles` against the first preferred venue for
/// `symbol` (§4.7's preference-order table). The preference order is a
/// fixed ranking, not a failover chain — per §7 "a non-200 REST response
/// yields an empty candle set and a successful ack", a failing primary
/// venue does not fall through to the next.
pub async fn run(
    adapter: &Arc<AnyAdapter>,
    symbol: Symbol,
    timeframe: Timeframe,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> BackfillResult {
    match adapter.fetch_historical_candles(symbol, timeframe, start, end).await {
        Ok(candles) => {
            let partial = looks_partial(&candles, timeframe, start, end);
            BackfillResult { candles, partial }
        }
        Err(err) => {
            tracing::warn!(%symbol, %timeframe, error = %err, "backfill REST fetch failed, returning empty set");
            BackfillResult {
                candles: Vec::new(),
                partial: true,
            }
        }
    }
}

/// The venue preferred first for `symbol` (§4.7).
pub fn preferred_venue(symbol: Symbol) -> trade_agg_core::model::Venue {
    backfill_preference(symbol)[0]
}

/// Heuristic: fewer candles than the window could hold (minus one for an
/// open-ended final bucket) suggests the venue didn't have full coverage.
/// There is no dedicated signal for this (§9), so this is advisory only —
/// it only ever adds an informational event, never suppresses candles.
fn looks_partial(candles: &[Candle], timeframe: Timeframe, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    if candles.is_empty() {
        return true;
    }
    let span_secs = (end - start).num_seconds().max(0);
    let expected = (span_secs / timeframe.seconds()).max(1) as usize;
    candles.len() + 1 < expected
}
