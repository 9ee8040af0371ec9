//! Wire shapes for Binance's combined trade stream and REST klines (§4.4,
//! §4.7). Fields are kept close to Binance's own abbreviations (`p`, `q`,
//! `T`) since that's what the venue actually sends.

use serde::Deserialize;

/// A single `<symbol>@trade` stream frame. Non-trade control frames (e.g.
/// subscription acks) don't carry `p`/`q`/`T` and are skipped by making
/// those fields optional.
#[derive(Debug, Deserialize)]
pub struct BinanceTradeMessage {
    #[serde(rename = "e")]
    pub event: Option<String>,
    #[serde(rename = "p")]
    pub price: Option<String>,
    #[serde(rename = "q")]
    pub quantity: Option<String>,
    #[serde(rename = "T")]
    pub trade_time_ms: Option<i64>,
}
