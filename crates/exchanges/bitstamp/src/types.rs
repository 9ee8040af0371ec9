//! Wire shapes for Bitstamp's `live_trades_<pair>` channel (§4.4) and REST
//! OHLC endpoint (§4.7).

use serde::Deserialize;
use serde_json::Value;
use trade_agg_core::fixed_point::Fx;

#[derive(Debug, Deserialize)]
pub struct BitstampWsMessage {
    pub event: String,
    pub data: Option<BitstampTradeData>,
}

#[derive(Debug, Deserialize)]
pub struct BitstampTradeData {
    pub price: Value,
    pub amount: Value,
    pub timestamp: Value,
}

/// Bitstamp sends some numeric fields as JSON numbers and others as
/// strings depending on endpoint/channel; accept both rather than assume.
pub fn value_to_fx(value: &Value) -> Fx {
    match value {
        Value::String(s) => Fx::parse_lossy(s),
        Value::Number(n) => Fx::parse_lossy(&n.to_string()),
        _ => Fx::ZERO,
    }
}

pub fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
pub struct BitstampOhlcResponse {
    pub data: BitstampOhlcData,
}

#[derive(Debug, Deserialize)]
pub struct BitstampOhlcData {
    pub ohlc: Vec<BitstampOhlcRow>,
}

#[derive(Debug, Deserialize)]
pub struct BitstampOhlcRow {
    pub timestamp: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
}
