//! Wire shapes for OKX's public trades channel (§4.4) and REST candles
//! (§4.7).

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct OkxWsMessage {
    pub event: Option<String>,
    pub data: Option<Vec<OkxTradeData>>,
}

#[derive(Debug, Deserialize)]
pub struct OkxTradeData {
    pub px: String,
    pub sz: String,
    pub ts: String,
}

#[derive(Debug, Deserialize)]
pub struct OkxCandlesResponse {
    pub code: String,
    pub data: Vec<Vec<String>>,
}
