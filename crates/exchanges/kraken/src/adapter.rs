use crate::types::{parse_trade_frame, KrakenOhlcResponse};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;
use trade_agg_core::fixed_point::Fx;
use trade_agg_core::model::{Candle, NormalizedTrade, Symbol, Timeframe, Venue};
use trade_agg_core::symbol_map::{kraken_rest_pair, venue_symbol};
use trade_agg_core::time::from_seconds_f64;
use trade_agg_exchanges_common::{HistoricalCandles, VenueProtocol};

const WS_URL: &str = "wss://ws.kraken.com";
const REST_URL: &str = "https://api.kraken.com/0/public/OHLC";

pub struct KrakenAdapter {
    http: reqwest::Client,
}

impl KrakenAdapter {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Default for KrakenAdapter {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

/// Kraken's OHLC `interval` parameter is in minutes and happens to cover
/// all eight canonical timeframes exactly, so no up-aggregation is needed.
fn interval_minutes(timeframe: Timeframe) -> i64 {
    timeframe.seconds() / 60
}

impl VenueProtocol for KrakenAdapter {
    fn venue(&self) -> Venue {
        Venue::Kraken
    }

    fn ws_url(&self, symbol: Symbol) -> Result<String> {
        venue_symbol(Venue::Kraken, symbol)
            .ok_or_else(|| anyhow!("kraken does not support {symbol}"))?;
        Ok(WS_URL.to_string())
    }

    fn subscribe_frames(&self, symbol: Symbol) -> Result<Vec<String>> {
        let pair = venue_symbol(Venue::Kraken, symbol)
            .ok_or_else(|| anyhow!("kraken does not support {symbol}"))?;
        let frame = serde_json::json!({
            "event": "subscribe",
            "pair": [pair],
            "subscription": {"name": "trade"},
        });
        Ok(vec![frame.to_string()])
    }

    fn parse_frame(&self, symbol: Symbol, text: &str) -> Vec<NormalizedTrade> {
        let Some(rows) = parse_trade_frame(text) else {
            return Vec::new();
        };

        rows.into_iter()
            .filter_map(|row| {
                let price = Fx::parse_lossy(&row.price);
                if price.is_zero() {
                    return None;
                }
                let time_s: f64 = row.time.parse().ok()?;
                Some(NormalizedTrade {
                    symbol,
                    venue: Venue::Kraken,
                    price,
                    size: Fx::parse_lossy(&row.volume),
                    timestamp_utc_ns: from_seconds_f64(time_s),
                })
            })
            .collect()
    }
}

#[async_trait]
impl HistoricalCandles for KrakenAdapter {
    async fn fetch_historical_candles(
        &self,
        symbol: Symbol,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        let pair = kraken_rest_pair(symbol)
            .ok_or_else(|| anyhow!("kraken does not support {symbol}"))?;

        let response = self
            .http
            .get(REST_URL)
            .query(&[
                ("pair", pair),
                ("interval", interval_minutes(timeframe).to_string()),
                ("since", start.timestamp().to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let payload: KrakenOhlcResponse = response.json().await?;
        if !payload.error.is_empty() {
            return Err(anyhow!("kraken OHLC error: {:?}", payload.error));
        }

        let rows = payload
            .result
            .iter()
            .find(|(key, _)| key.as_str() != "last")
            .map(|(_, value)| value.clone())
            .ok_or_else(|| anyhow!("kraken OHLC response missing pair result"))?;

        let rows = rows
            .as_array()
            .ok_or_else(|| anyhow!("kraken OHLC result is not an array"))?;

        let start_s = start.timestamp();
        let end_s = end.timestamp();

        let mut candles: Vec<Candle> = rows
            .iter()
            .filter_map(|row| {
                let row = row.as_array()?;
                let open_time_utc_s = row.first()?.as_i64()?;
                let open = row.get(1)?.as_str()?;
                let high = row.get(2)?.as_str()?;
                let low = row.get(3)?.as_str()?;
                let close = row.get(4)?.as_str()?;
                // index 5 is vwap, not volume; volume is index 6.
                let volume = row.get(6)?.as_str()?;
                Some(Candle {
                    symbol,
                    timeframe,
                    open_time_utc_s,
                    open: Fx::parse_lossy(open),
                    high: Fx::parse_lossy(high),
                    low: Fx::parse_lossy(low),
                    close: Fx::parse_lossy(close),
                    volume: Fx::parse_lossy(volume),
                })
            })
            .filter(|c| c.open_time_utc_s >= start_s && c.open_time_utc_s < end_s)
            .collect();
        candles.sort_by_key(|c| c.open_time_utc_s);
        debug!(count = candles.len(), "kraken: fetched historical candles");
        Ok(candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_trade_array() {
        let adapter = KrakenAdapter::default();
        let frame = r#"[340,[["65000.5","0.01","1700000000.123456","b","m",""]],"trade","XBT/USD"]"#;
        let trades = adapter.parse_frame(Symbol::BtcUsd, frame);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, Fx::parse("65000.5").unwrap());
        assert_eq!(trades[0].size, Fx::parse("0.01").unwrap());
    }

    #[test]
    fn non_trade_objects_are_dropped() {
        let adapter = KrakenAdapter::default();
        let frame = r#"{"event":"heartbeat"}"#;
        assert!(adapter.parse_frame(Symbol::BtcUsd, frame).is_empty());
    }

    #[test]
    fn subscription_status_arrays_are_dropped() {
        let adapter = KrakenAdapter::default();
        let frame = r#"[0,{"status":"subscribed"},"subscriptionStatus","XBT/USD"]"#;
        assert!(adapter.parse_frame(Symbol::BtcUsd, frame).is_empty());
    }

    #[test]
    fn subscribe_frame_uses_ws_pair_not_rest_pair() {
        let adapter = KrakenAdapter::default();
        let frames = adapter.subscribe_frames(Symbol::BtcUsd).unwrap();
        assert!(frames[0].contains("XBT/USD"));
    }
}
