use crate::types::BitvavoWsMessage;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;
use trade_agg_core::fixed_point::Fx;
use trade_agg_core::model::{Candle, NormalizedTrade, Symbol, Timeframe, Venue};
use trade_agg_core::symbol_map::venue_symbol;
use trade_agg_core::time::promote_ambiguous_ms_or_ns;
use trade_agg_exchanges_common::{HistoricalCandles, VenueProtocol};

const WS_URL: &str = "wss://ws.bitvavo.com/v2/";
const REST_BASE: &str = "https://api.bitvavo.com/v2/candles";

pub struct BitvavoAdapter {
    http: reqwest::Client,
}

impl BitvavoAdapter {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Default for BitvavoAdapter {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl VenueProtocol for BitvavoAdapter {
    fn venue(&self) -> Venue {
        Venue::Bitvavo
    }

    fn ws_url(&self, symbol: Symbol) -> Result<String> {
        venue_symbol(Venue::Bitvavo, symbol)
            .ok_or_else(|| anyhow!("bitvavo does not support {symbol}"))?;
        Ok(WS_URL.to_string())
    }

    fn subscribe_frames(&self, symbol: Symbol) -> Result<Vec<String>> {
        let market = venue_symbol(Venue::Bitvavo, symbol)
            .ok_or_else(|| anyhow!("bitvavo does not support {symbol}"))?;
        let frame = serde_json::json!({
            "action": "subscribe",
            "channels": [{"name": "trades", "markets": [market]}],
        });
        Ok(vec![frame.to_string()])
    }

    fn parse_frame(&self, symbol: Symbol, text: &str) -> Vec<NormalizedTrade> {
        let message: BitvavoWsMessage = match serde_json::from_str(text) {
            Ok(m) => m,
            Err(err) => {
                debug!(error = %err, "bitvavo: dropping unparsable frame");
                return Vec::new();
            }
        };

        if message.event != "trade" {
            return Vec::new();
        }

        let (Some(price), Some(amount), Some(timestamp)) =
            (message.price, message.amount, message.timestamp)
        else {
            return Vec::new();
        };

        let price = Fx::parse_lossy(&price);
        if price.is_zero() {
            return Vec::new();
        }

        vec![NormalizedTrade {
            symbol,
            venue: Venue::Bitvavo,
            price,
            size: Fx::parse_lossy(&amount),
            timestamp_utc_ns: promote_ambiguous_ms_or_ns(timestamp),
        }]
    }
}

#[async_trait]
impl HistoricalCandles for BitvavoAdapter {
    async fn fetch_historical_candles(
        &self,
        symbol: Symbol,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        let market = venue_symbol(Venue::Bitvavo, symbol)
            .ok_or_else(|| anyhow!("bitvavo does not support {symbol}"))?;

        let url = format!("{REST_BASE}/{market}/{}", timeframe.as_str());
        let response = self
            .http
            .get(&url)
            .query(&[
                ("start", (start.timestamp_millis()).to_string()),
                ("end", (end.timestamp_millis()).to_string()),
                ("limit", "1000".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let rows: Vec<[serde_json::Value; 6]> = response.json().await?;
        let start_ms = start.timestamp_millis();
        let end_ms = end.timestamp_millis();

        let mut candles: Vec<Candle> = rows
            .into_iter()
            .filter_map(|row| {
                let time_ms = row[0].as_i64()?;
                let as_str = |v: &serde_json::Value| -> Option<String> {
                    v.as_str().map(str::to_string).or_else(|| v.as_f64().map(|f| f.to_string()))
                };
                let open = as_str(&row[1])?;
                let high = as_str(&row[2])?;
                let low = as_str(&row[3])?;
                let close = as_str(&row[4])?;
                let volume = as_str(&row[5])?;
                Some(Candle {
                    symbol,
                    timeframe,
                    open_time_utc_s: time_ms / 1000,
                    open: Fx::parse_lossy(&open),
                    high: Fx::parse_lossy(&high),
                    low: Fx::parse_lossy(&low),
                    close: Fx::parse_lossy(&close),
                    volume: Fx::parse_lossy(&volume),
                })
            })
            .filter(|c| {
                let time_ms = c.open_time_utc_s * 1000;
                time_ms >= start_ms && time_ms < end_ms
            })
            .collect();
        candles.sort_by_key(|c| c.open_time_utc_s);
        Ok(candles)
    }
}
