use crate::types::CoinbaseMessage;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;
use trade_agg_aggregator::{relabel, up_aggregate};
use trade_agg_core::fixed_point::Fx;
use trade_agg_core::model::{Candle, NormalizedTrade, Symbol, Timeframe, Venue};
use trade_agg_core::symbol_map::venue_symbol;
use trade_agg_exchanges_common::{HistoricalCandles, VenueProtocol};

const WS_URL: &str = "wss://ws-feed.exchange.coinbase.com";
const REST_BASE: &str = "https://api.exchange.coinbase.com";

/// Coinbase Exchange's supported native candle granularities, in seconds
/// (§4.7).
const NATIVE_GRANULARITIES: [i64; 6] = [60, 300, 900, 3600, 21600, 86400];

pub struct CoinbaseAdapter {
    http: reqwest::Client,
}

impl CoinbaseAdapter {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Default for CoinbaseAdapter {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl VenueProtocol for CoinbaseAdapter {
    fn venue(&self) -> Venue {
        Venue::Coinbase
    }

    fn ws_url(&self, symbol: Symbol) -> Result<String> {
        venue_symbol(Venue::Coinbase, symbol)
            .ok_or_else(|| anyhow!("coinbase does not support {symbol}"))?;
        Ok(WS_URL.to_string())
    }

    fn subscribe_frames(&self, symbol: Symbol) -> Result<Vec<String>> {
        let sym = venue_symbol(Venue::Coinbase, symbol)
            .ok_or_else(|| anyhow!("coinbase does not support {symbol}"))?;
        let frame = serde_json::json!({
            "type": "subscribe",
            "product_ids": [sym],
            "channels": ["matches"],
        });
        Ok(vec![frame.to_string()])
    }

    fn parse_frame(&self, symbol: Symbol, text: &str) -> Vec<NormalizedTrade> {
        let message: CoinbaseMessage = match serde_json::from_str(text) {
            Ok(m) => m,
            Err(err) => {
                debug!(error = %err, "coinbase: dropping unparsable frame");
                return Vec::new();
            }
        };

        if message.kind != "match" {
            return Vec::new();
        }

        let (Some(price), Some(size), Some(time)) = (message.price, message.size, message.time)
        else {
            return Vec::new();
        };

        let price = Fx::parse_lossy(&price);
        if price.is_zero() {
            return Vec::new();
        }

        let Ok(parsed_time) = DateTime::parse_from_rfc3339(&time) else {
            return Vec::new();
        };

        vec![NormalizedTrade {
            symbol,
            venue: Venue::Coinbase,
            price,
            size: Fx::parse_lossy(&size),
            timestamp_utc_ns: parsed_time.timestamp_nanos_opt().unwrap_or(0),
        }]
    }
}

#[async_trait]
impl HistoricalCandles for CoinbaseAdapter {
    async fn fetch_historical_candles(
        &self,
        symbol: Symbol,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        let sym = venue_symbol(Venue::Coinbase, symbol)
            .ok_or_else(|| anyhow!("coinbase does not support {symbol}"))?;

        let requested_secs = timeframe.seconds();
        let native = NATIVE_GRANULARITIES.contains(&requested_secs);
        let fetch_granularity = if native { requested_secs } else { 60 };

        let url = format!("{REST_BASE}/products/{sym}/candles");
        let response = self
            .http
            .get(&url)
            .query(&[
                ("start", start.to_rfc3339()),
                ("end", end.to_rfc3339()),
                ("granularity", fetch_granularity.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let rows: Vec<[f64; 6]> = response.json().await?;
        let native_timeframe = if native {
            timeframe
        } else {
            Timeframe::M1
        };

        let mut candles: Vec<Candle> = rows
            .iter()
            .map(|row| row_to_candle(symbol, native_timeframe, row))
            .collect();
        // Coinbase returns candles newest-first.
        candles.sort_by_key(|c| c.open_time_utc_s);

        let rolled = if native {
            candles
        } else {
            up_aggregate(&candles, requested_secs)
        };

        Ok(relabel(rolled, timeframe))
    }
}

fn row_to_candle(symbol: Symbol, timeframe: Timeframe, row: &[f64; 6]) -> Candle {
    // Row shape: [time, low, high, open, close, volume].
    let [time, low, high, open, close, volume] = *row;
    Candle {
        symbol,
        timeframe,
        open_time_utc_s: time as i64,
        open: Fx::parse_lossy(&format!("{open}")),
        high: Fx::parse_lossy(&format!("{high}")),
        low: Fx::parse_lossy(&format!("{low}")),
        close: Fx::parse_lossy(&format!("{close}")),
        volume: Fx::parse_lossy(&format!("{volume}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_match_messages_become_trades() {
        let adapter = CoinbaseAdapter::default();
        let match_frame = r#"{"type":"match","price":"65000.25","size":"0.01","time":"2024-01-01T00:00:00.123456Z"}"#;
        let trades = adapter.parse_frame(Symbol::BtcUsd, match_frame);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, Fx::parse("65000.25").unwrap());

        let heartbeat = r#"{"type":"heartbeat","sequence":1}"#;
        assert!(adapter.parse_frame(Symbol::BtcUsd, heartbeat).is_empty());

        // last_match carries the same fields as match but must still be
        // excluded per §4.4.
        let last_match = r#"{"type":"last_match","price":"1","size":"1","time":"2024-01-01T00:00:00Z"}"#;
        assert!(adapter.parse_frame(Symbol::BtcUsd, last_match).is_empty());
    }

    #[test]
    fn row_to_candle_reads_coinbase_column_order() {
        let row = [1_700_000_000.0, 64_000.0, 66_000.0, 65_000.0, 65_500.0, 12.5];
        let candle = row_to_candle(Symbol::BtcUsd, Timeframe::M1, &row);
        assert_eq!(candle.open, Fx::parse("65000").unwrap());
        assert_eq!(candle.low, Fx::parse("64000").unwrap());
        assert_eq!(candle.high, Fx::parse("66000").unwrap());
        assert_eq!(candle.close, Fx::parse("65500").unwrap());
    }
}
