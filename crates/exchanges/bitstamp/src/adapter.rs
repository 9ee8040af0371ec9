use crate::types::{value_to_fx, value_to_i64, BitstampOhlcResponse, BitstampWsMessage};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;
use trade_agg_core::fixed_point::Fx;
use trade_agg_core::model::{Candle, NormalizedTrade, Symbol, Timeframe, Venue};
use trade_agg_core::symbol_map::venue_symbol;
use trade_agg_core::time::from_seconds;
use trade_agg_exchanges_common::{HistoricalCandles, VenueProtocol};

const WS_URL: &str = "wss://ws.bitstamp.net";
const REST_BASE: &str = "https://www.bitstamp.net/api/v2/ohlc";

pub struct BitstampAdapter {
    http: reqwest::Client,
}

impl BitstampAdapter {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Default for BitstampAdapter {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl VenueProtocol for BitstampAdapter {
    fn venue(&self) -> Venue {
        Venue::Bitstamp
    }

    fn ws_url(&self, symbol: Symbol) -> Result<String> {
        venue_symbol(Venue::Bitstamp, symbol)
            .ok_or_else(|| anyhow!("bitstamp does not support {symbol}"))?;
        Ok(WS_URL.to_string())
    }

    fn subscribe_frames(&self, symbol: Symbol) -> Result<Vec<String>> {
        let sym = venue_symbol(Venue::Bitstamp, symbol)
            .ok_or_else(|| anyhow!("bitstamp does not support {symbol}"))?;
        let frame = serde_json::json!({
            "event": "bts:subscribe",
            "data": {"channel": format!("live_trades_{sym}")},
        });
        Ok(vec![frame.to_string()])
    }

    fn parse_frame(&self, symbol: Symbol, text: &str) -> Vec<NormalizedTrade> {
        let message: BitstampWsMessage = match serde_json::from_str(text) {
            Ok(m) => m,
            Err(err) => {
                debug!(error = %err, "bitstamp: dropping unparsable frame");
                return Vec::new();
            }
        };

        if message.event != "trade" {
            return Vec::new();
        }

        let Some(data) = message.data else {
            return Vec::new();
        };

        let price = value_to_fx(&data.price);
        if price.is_zero() {
            return Vec::new();
        }

        let Some(timestamp_s) = value_to_i64(&data.timestamp) else {
            return Vec::new();
        };

        vec![NormalizedTrade {
            symbol,
            venue: Venue::Bitstamp,
            price,
            size: value_to_fx(&data.amount),
            timestamp_utc_ns: from_seconds(timestamp_s),
        }]
    }
}

#[async_trait]
impl HistoricalCandles for BitstampAdapter {
    async fn fetch_historical_candles(
        &self,
        symbol: Symbol,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        let sym = venue_symbol(Venue::Bitstamp, symbol)
            .ok_or_else(|| anyhow!("bitstamp does not support {symbol}"))?;

        let url = format!("{REST_BASE}/{sym}/");
        let response = self
            .http
            .get(&url)
            .query(&[
                ("step", timeframe.seconds().to_string()),
                ("start", start.timestamp().to_string()),
                ("end", end.timestamp().to_string()),
                ("limit", "1000".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let payload: BitstampOhlcResponse = response.json().await?;
        let start_s = start.timestamp();
        let end_s = end.timestamp();

        let mut candles: Vec<Candle> = payload
            .data
            .ohlc
            .into_iter()
            .filter_map(|row| {
                let open_time_utc_s: i64 = row.timestamp.parse().ok()?;
                Some(Candle {
                    symbol,
                    timeframe,
                    open_time_utc_s,
                    open: Fx::parse_lossy(&row.open),
                    high: Fx::parse_lossy(&row.high),
                    low: Fx::parse_lossy(&row.low),
                    close: Fx::parse_lossy(&row.close),
                    volume: Fx::parse_lossy(&row.volume),
                })
            })
            .filter(|c| c.open_time_utc_s >= start_s && c.open_time_utc_s < end_s)
            .collect();
        candles.sort_by_key(|c| c.open_time_utc_s);
        Ok(candles)
    }
}
