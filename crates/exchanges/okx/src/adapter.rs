use crate::types::{OkxCandlesResponse, OkxWsMessage};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;
use trade_agg_core::fixed_point::Fx;
use trade_agg_core::model::{Candle, NormalizedTrade, Symbol, Timeframe, Venue};
use trade_agg_core::symbol_map::venue_symbol;
use trade_agg_core::time::from_millis;
use trade_agg_exchanges_common::{HistoricalCandles, VenueProtocol};

const WS_URL: &str = "wss://ws.okx.com:8443/ws/v5/public";
const REST_URL: &str = "https://www.okx.com/api/v5/market/candles";
const PAGE_LIMIT: u32 = 300;

pub struct OkxAdapter {
    http: reqwest::Client,
}

impl OkxAdapter {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Default for OkxAdapter {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

/// OKX's `bar` query parameter: minute bars keep the canonical lowercase
/// suffix, hour/day/week bars use OKX's uppercase convention.
fn bar_str(tf: Timeframe) -> &'static str {
    match tf {
        Timeframe::M1 => "1m",
        Timeframe::M5 => "5m",
        Timeframe::M15 => "15m",
        Timeframe::M30 => "30m",
        Timeframe::H1 => "1H",
        Timeframe::H4 => "4H",
        Timeframe::D1 => "1D",
        Timeframe::W1 => "1W",
    }
}

impl VenueProtocol for OkxAdapter {
    fn venue(&self) -> Venue {
        Venue::Okx
    }

    fn ws_url(&self, symbol: Symbol) -> Result<String> {
        venue_symbol(Venue::Okx, symbol).ok_or_else(|| anyhow!("okx does not support {symbol}"))?;
        Ok(WS_URL.to_string())
    }

    fn subscribe_frames(&self, symbol: Symbol) -> Result<Vec<String>> {
        let sym = venue_symbol(Venue::Okx, symbol).ok_or_else(|| anyhow!("okx does not support {symbol}"))?;
        let frame = serde_json::json!({
            "op": "subscribe",
            "args": [{"channel": "trades", "instId": sym}],
        });
        Ok(vec![frame.to_string()])
    }

    fn parse_frame(&self, symbol: Symbol, text: &str) -> Vec<NormalizedTrade> {
        let message: OkxWsMessage = match serde_json::from_str(text) {
            Ok(m) => m,
            Err(err) => {
                debug!(error = %err, "okx: dropping unparsable frame");
                return Vec::new();
            }
        };

        let Some(entries) = message.data else {
            return Vec::new();
        };

        entries
            .into_iter()
            .filter_map(|entry| {
                let price = Fx::parse_lossy(&entry.px);
                if price.is_zero() {
                    return None;
                }
                let ts_ms: i64 = entry.ts.parse().ok()?;
                Some(NormalizedTrade {
                    symbol,
                    venue: Venue::Okx,
                    price,
                    size: Fx::parse_lossy(&entry.sz),
                    timestamp_utc_ns: from_millis(ts_ms),
                })
            })
            .collect()
    }
}

#[async_trait]
impl HistoricalCandles for OkxAdapter {
    async fn fetch_historical_candles(
        &self,
        symbol: Symbol,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        let sym = venue_symbol(Venue::Okx, symbol).ok_or_else(|| anyhow!("okx does not support {symbol}"))?;

        let response = self
            .http
            .get(REST_URL)
            .query(&[
                ("instId", sym),
                ("bar", bar_str(timeframe)),
                ("limit", "300"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let payload: OkxCandlesResponse = response.json().await?;
        if payload.code != "0" {
            return Err(anyhow!("okx candles error code {}", payload.code));
        }

        let start_s = start.timestamp();
        let end_s = end.timestamp();
        let mut candles: Vec<Candle> = payload
            .data
            .iter()
            .filter_map(|row| parse_row(symbol, timeframe, row))
            .filter(|c| c.open_time_utc_s >= start_s && c.open_time_utc_s < end_s)
            .collect();
        // OKX returns candles newest-first.
        candles.reverse();
        let _ = PAGE_LIMIT;
        Ok(candles)
    }
}

fn parse_row(symbol: Symbol, timeframe: Timeframe, row: &[String]) -> Option<Candle> {
    if row.len() < 6 {
        return None;
    }
    let open_time_ms: i64 = row[0].parse().ok()?;
    Some(Candle {
        symbol,
        timeframe,
        open_time_utc_s: open_time_ms / 1000,
        open: Fx::parse_lossy(&row[1]),
        high: Fx::parse_lossy(&row[2]),
        low: Fx::parse_lossy(&row[3]),
        close: Fx::parse_lossy(&row[4]),
        volume: Fx::parse_lossy(&row[5]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_str_uses_uppercase_for_hour_and_above() {
        assert_eq!(bar_str(Timeframe::M5), "5m");
        assert_eq!(bar_str(Timeframe::H1), "1H");
        assert_eq!(bar_str(Timeframe::W1), "1W");
    }

    #[test]
    fn parses_trades_channel_data() {
        let adapter = OkxAdapter::default();
        let frame = r#"{"arg":{"channel":"trades","instId":"BTC-USDT"},"data":[{"instId":"BTC-USDT","tradeId":"1","px":"65000.1","sz":"0.4","side":"buy","ts":"1700000000000"}]}"#;
        let trades = adapter.parse_frame(Symbol::BtcUsdt, frame);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, Fx::parse("65000.1").unwrap());
    }

    #[test]
    fn subscribe_ack_without_data_yields_no_trades() {
        let adapter = OkxAdapter::default();
        let frame = r#"{"event":"subscribe","arg":{"channel":"trades","instId":"BTC-USDT"}}"#;
        assert!(adapter.parse_frame(Symbol::BtcUsdt, frame).is_empty());
    }
}
