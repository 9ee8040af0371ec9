//! Wire shapes for Coinbase Exchange's `matches` channel (§4.4). Only
//! `type: "match"` messages are trades — `last_match`, `subscriptions`, and
//! heartbeats all parse into this same struct but are filtered out by the
//! adapter before they reach `parse_frame`'s caller.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CoinbaseMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub price: Option<String>,
    pub size: Option<String>,
    pub time: Option<String>,
}
