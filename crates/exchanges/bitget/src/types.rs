//! Wire shapes for Bitget's public trade channel (§4.4). Bitget's trade
//! entries arrive either as objects `{p,q,t}` or bare arrays `[p,q,t]`
//! depending on endpoint version; `BitgetTradeEntry` accepts both.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct BitgetWsMessage {
    pub action: Option<String>,
    pub data: Option<Vec<BitgetTradeEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BitgetTradeEntry {
    Object {
        p: String,
        q: String,
        t: String,
    },
    Array(Vec<String>),
}

impl BitgetTradeEntry {
    pub fn price(&self) -> &str {
        match self {
            BitgetTradeEntry::Object { p, .. } => p,
            BitgetTradeEntry::Array(fields) => fields.first().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn size(&self) -> &str {
        match self {
            BitgetTradeEntry::Object { q, .. } => q,
            BitgetTradeEntry::Array(fields) => fields.get(1).map(String::as_str).unwrap_or(""),
        }
    }

    pub fn time_ms(&self) -> Option<i64> {
        match self {
            BitgetTradeEntry::Object { t, .. } => t.parse().ok(),
            BitgetTradeEntry::Array(fields) => fields.get(2).and_then(|t| t.parse().ok()),
        }
    }
}
