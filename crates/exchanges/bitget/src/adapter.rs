use crate::types::BitgetWsMessage;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;
use trade_agg_core::fixed_point::Fx;
use trade_agg_core::model::{Candle, NormalizedTrade, Symbol, Timeframe, Venue};
use trade_agg_core::symbol_map::venue_symbol;
use trade_agg_core::time::from_millis;
use trade_agg_exchanges_common::{HistoricalCandles, VenueProtocol};

const WS_URL: &str = "wss://ws.bitget.com/v2/ws/public";
const REST_URL: &str = "https://api.bitget.com/api/v2/spot/market/candles";
const PAGE_LIMIT: u32 = 1000;

pub struct BitgetAdapter {
    http: reqwest::Client,
}

impl BitgetAdapter {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Default for BitgetAdapter {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

fn granularity_str(tf: Timeframe) -> &'static str {
    match tf {
        Timeframe::M1 => "1min",
        Timeframe::M5 => "5min",
        Timeframe::M15 => "15min",
        Timeframe::M30 => "30min",
        Timeframe::H1 => "1h",
        Timeframe::H4 => "4h",
        Timeframe::D1 => "1day",
        Timeframe::W1 => "1week",
    }
}

impl VenueProtocol for BitgetAdapter {
    fn venue(&self) -> Venue {
        Venue::Bitget
    }

    fn ws_url(&self, symbol: Symbol) -> Result<String> {
        venue_symbol(Venue::Bitget, symbol).ok_or_else(|| anyhow!("bitget does not support {symbol}"))?;
        Ok(WS_URL.to_string())
    }

    fn subscribe_frames(&self, symbol: Symbol) -> Result<Vec<String>> {
        let sym = venue_symbol(Venue::Bitget, symbol)
            .ok_or_else(|| anyhow!("bitget does not support {symbol}"))?;
        let frame = serde_json::json!({
            "op": "subscribe",
            "args": [{"instType": "SPOT", "channel": "trade", "instId": sym}],
        });
        Ok(vec![frame.to_string()])
    }

    fn parse_frame(&self, symbol: Symbol, text: &str) -> Vec<NormalizedTrade> {
        let message: BitgetWsMessage = match serde_json::from_str(text) {
            Ok(m) => m,
            Err(err) => {
                debug!(error = %err, "bitget: dropping unparsable frame");
                return Vec::new();
            }
        };

        let Some(entries) = message.data else {
            return Vec::new();
        };

        entries
            .into_iter()
            .filter_map(|entry| {
                let price = Fx::parse_lossy(entry.price());
                if price.is_zero() {
                    return None;
                }
                let time_ms = entry.time_ms()?;
                Some(NormalizedTrade {
                    symbol,
                    venue: Venue::Bitget,
                    price,
                    size: Fx::parse_lossy(entry.size()),
                    timestamp_utc_ns: from_millis(time_ms),
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct BitgetCandlesResponse {
    code: String,
    data: Vec<Vec<String>>,
}

#[async_trait]
impl HistoricalCandles for BitgetAdapter {
    async fn fetch_historical_candles(
        &self,
        symbol: Symbol,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        let sym = venue_symbol(Venue::Bitget, symbol)
            .ok_or_else(|| anyhow!("bitget does not support {symbol}"))?;

        let response = self
            .http
            .get(REST_URL)
            .query(&[
                ("symbol", sym),
                ("granularity", granularity_str(timeframe)),
                ("limit", "1000"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let payload: BitgetCandlesResponse = response.json().await?;
        if payload.code != "00000" {
            return Err(anyhow!("bitget candles error code {}", payload.code));
        }

        let start_s = start.timestamp();
        let end_s = end.timestamp();
        let mut candles: Vec<Candle> = payload
            .data
            .iter()
            .filter_map(|row| parse_row(symbol, timeframe, row))
            .filter(|c| c.open_time_utc_s >= start_s && c.open_time_utc_s < end_s)
            .collect();
        // §9 open question: Bitget's REST order isn't documented; we sort
        // ascending rather than assume, which is correct regardless of the
        // venue's actual order.
        candles.sort_by_key(|c| c.open_time_utc_s);
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
    fn parses_object_shaped_trade_entries() {
        let adapter = BitgetAdapter::default();
        let frame = r#"{"action":"snapshot","arg":{},"data":[{"p":"65000.0","q":"0.2","t":"1700000000000"}]}"#;
        let trades = adapter.parse_frame(Symbol::BtcUsdt, frame);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, Fx::parse("65000").unwrap());
    }

    #[test]
    fn parses_array_shaped_trade_entries() {
        let adapter = BitgetAdapter::default();
        let frame = r#"{"action":"snapshot","arg":{},"data":[["65000.0","0.2","1700000000000"]]}"#;
        let trades = adapter.parse_frame(Symbol::BtcUsdt, frame);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].size, Fx::parse("0.2").unwrap());
    }
}
