//! Parsing helpers for Kraken's WS trade array and REST OHLC object shape
//! (§4.4, §4.7, §9 open question on WS array layout).

use serde::Deserialize;
use serde_json::Value;

/// One row of Kraken's WS trade array: `[price, volume, time, side, type,
/// misc]`, all strings except the array itself.
pub struct KrakenWsTrade {
    pub price: String,
    pub volume: String,
    pub time: String,
}

/// Parses a raw WS text frame as a trade update, returning `None` for
/// control-frame JSON objects (heartbeat, systemStatus, subscriptionStatus)
/// which aren't shaped as the `[chanId, [...], "trade", pair]` array.
pub fn parse_trade_frame(text: &str) -> Option<Vec<KrakenWsTrade>> {
    let value: Value = serde_json::from_str(text).ok()?;
    let array = value.as_array()?;
    if array.len() < 4 {
        return None;
    }
    if array.get(2).and_then(Value::as_str) != Some("trade") {
        return None;
    }
    let rows = array.get(1)?.as_array()?;

    let trades = rows
        .iter()
        .filter_map(|row| {
            let row = row.as_array()?;
            Some(KrakenWsTrade {
                price: row.first()?.as_str()?.to_string(),
                volume: row.get(1)?.as_str()?.to_string(),
                time: row.get(2)?.as_str()?.to_string(),
            })
        })
        .collect();
    Some(trades)
}

#[derive(Debug, Deserialize)]
pub struct KrakenOhlcResponse {
    pub error: Vec<String>,
    pub result: serde_json::Map<String, Value>,
}
