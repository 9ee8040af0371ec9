use crate::types::BinanceTradeMessage;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::debug;
use trade_agg_core::fixed_point::Fx;
use trade_agg_core::model::{Candle, NormalizedTrade, Symbol, Timeframe, Venue};
use trade_agg_core::symbol_map::venue_symbol;
use trade_agg_core::time::from_millis;
use trade_agg_exchanges_common::{HistoricalCandles, VenueProtocol};

const WS_BASE: &str = "wss://stream.binance.com:9443/ws";
const REST_BASE: &str = "https://api.binance.com/api/v3/klines";
const PAGE_LIMIT: u32 = 1000;
const PAGE_DELAY: Duration = Duration::from_millis(200);

pub struct BinanceAdapter {
    http: reqwest::Client,
}

impl BinanceAdapter {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Default for BinanceAdapter {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

/// Binance's kline interval strings are identical to the canonical
/// timeframe strings (§4.7 implies no up-aggregation is needed here).
fn interval_str(tf: Timeframe) -> &'static str {
    tf.as_str()
}

impl VenueProtocol for BinanceAdapter {
    fn venue(&self) -> Venue {
        Venue::Binance
    }

    fn ws_url(&self, symbol: Symbol) -> Result<String> {
        let sym = venue_symbol(Venue::Binance, symbol)
            .ok_or_else(|| anyhow!("binance does not support {symbol}"))?;
        Ok(format!("{WS_BASE}/{}@trade", sym.to_lowercase()))
    }

    fn subscribe_frames(&self, _symbol: Symbol) -> Result<Vec<String>> {
        // Binance subscribes purely via the URL path; no subscribe frame.
        Ok(Vec::new())
    }

    fn parse_frame(&self, symbol: Symbol, text: &str) -> Vec<NormalizedTrade> {
        let message: BinanceTradeMessage = match serde_json::from_str(text) {
            Ok(m) => m,
            Err(err) => {
                debug!(error = %err, "binance: dropping unparsable frame");
                return Vec::new();
            }
        };

        let (Some(price), Some(size), Some(trade_time_ms)) =
            (message.price, message.quantity, message.trade_time_ms)
        else {
            return Vec::new();
        };

        let price = Fx::parse_lossy(&price);
        let size = Fx::parse_lossy(&size);
        if price.is_zero() {
            return Vec::new();
        }

        vec![NormalizedTrade {
            symbol,
            venue: Venue::Binance,
            price,
            size,
            timestamp_utc_ns: from_millis(trade_time_ms),
        }]
    }
}

#[async_trait]
impl HistoricalCandles for BinanceAdapter {
    async fn fetch_historical_candles(
        &self,
        symbol: Symbol,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        let sym = venue_symbol(Venue::Binance, symbol)
            .ok_or_else(|| anyhow!("binance does not support {symbol}"))?;

        let mut candles = Vec::new();
        let mut cursor_ms = start.timestamp_millis();
        let end_ms = end.timestamp_millis();

        loop {
            let response = self
                .http
                .get(REST_BASE)
                .query(&[
                    ("symbol", sym.to_string()),
                    ("interval", interval_str(timeframe).to_string()),
                    ("startTime", cursor_ms.to_string()),
                    ("endTime", end_ms.to_string()),
                    ("limit", PAGE_LIMIT.to_string()),
                ])
                .send()
                .await?
                .error_for_status()?;

            let page: Vec<Vec<serde_json::Value>> = response.json().await?;
            let page_len = page.len();
            if page.is_empty() {
                break;
            }

            let mut last_open_ms = cursor_ms;
            for row in &page {
                let candle = parse_row(symbol, timeframe, row)?;
                last_open_ms = row[0].as_i64().unwrap_or(last_open_ms);
                candles.push(candle);
            }

            if (page_len as u32) < PAGE_LIMIT || last_open_ms >= end_ms {
                break;
            }
            cursor_ms = last_open_ms + 1;
            tokio::time::sleep(PAGE_DELAY).await;
        }

        Ok(candles)
    }
}

fn parse_row(symbol: Symbol, timeframe: Timeframe, row: &[serde_json::Value]) -> Result<Candle> {
    if row.len() < 6 {
        return Err(anyhow!("binance kline row too short"));
    }
    let open_time_ms = row[0].as_i64().ok_or_else(|| anyhow!("missing open time"))?;
    let decimal = |idx: usize| -> Fx { row[idx].as_str().map(Fx::parse_lossy).unwrap_or(Fx::ZERO) };

    Ok(Candle {
        symbol,
        timeframe,
        open_time_utc_s: open_time_ms / 1000,
        open: decimal(1),
        high: decimal(2),
        low: decimal(3),
        close: decimal(4),
        volume: decimal(5),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_url_uses_lowercase_symbol_and_trade_stream_suffix() {
        let adapter = BinanceAdapter::default();
        let url = adapter.ws_url(Symbol::BtcUsdt).unwrap();
        assert_eq!(url, "wss://stream.binance.com:9443/ws/btcusdt@trade");
    }

    #[test]
    fn ws_url_rejects_unsupported_pair() {
        let adapter = BinanceAdapter::default();
        assert!(adapter.ws_url(Symbol::BtcEur).is_err());
    }

    #[test]
    fn subscribe_frames_are_empty_since_binance_subscribes_via_url() {
        let adapter = BinanceAdapter::default();
        assert!(adapter.subscribe_frames(Symbol::BtcUsdt).unwrap().is_empty());
    }

    #[test]
    fn parses_a_trade_frame() {
        let adapter = BinanceAdapter::default();
        let frame = r#"{"e":"trade","s":"BTCUSDT","p":"65000.50000000","q":"0.01500000","T":1700000000000}"#;
        let trades = adapter.parse_frame(Symbol::BtcUsdt, frame);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, Fx::parse("65000.5").unwrap());
        assert_eq!(trades[0].timestamp_utc_ns, 1_700_000_000_000_000_000);
    }

    #[test]
    fn non_trade_control_frame_yields_no_trades() {
        let adapter = BinanceAdapter::default();
        let frame = r#"{"result":null,"id":1}"#;
        assert!(adapter.parse_frame(Symbol::BtcUsdt, frame).is_empty());
    }

    #[test]
    fn malformed_frame_is_silently_dropped() {
        let adapter = BinanceAdapter::default();
        assert!(adapter.parse_frame(Symbol::BtcUsdt, "not json").is_empty());
    }
}
