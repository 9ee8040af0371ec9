//! Wire shapes for Bitvavo's `trades` channel (§4.4) and REST candles
//! endpoint (§4.7).

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct BitvavoWsMessage {
    pub event: String,
    pub market: Option<String>,
    pub price: Option<String>,
    pub amount: Option<String>,
    pub timestamp: Option<i64>,
}
