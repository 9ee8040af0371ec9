//! Canonical data model shared by every crate in the workspace.

use crate::fixed_point::Fx;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the three supported canonical trading pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    BtcUsdt,
    BtcUsd,
    BtcEur,
}

impl Serialize for Symbol {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Symbol::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl Symbol {
    pub const ALL: [Symbol; 3] = [Symbol::BtcUsdt, Symbol::BtcUsd, Symbol::BtcEur];

    pub fn as_str(self) -> &'static str {
        match self {
            Symbol::BtcUsdt => "BTC/USDT",
            Symbol::BtcUsd => "BTC/USD",
            Symbol::BtcEur => "BTC/EUR",
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported symbol: {0:?}")]
pub struct UnsupportedSymbol(pub String);

impl FromStr for Symbol {
    type Err = UnsupportedSymbol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BTC/USDT" => Ok(Symbol::BtcUsdt),
            "BTC/USD" => Ok(Symbol::BtcUsd),
            "BTC/EUR" => Ok(Symbol::BtcEur),
            other => Err(UnsupportedSymbol(other.to_string())),
        }
    }
}

/// Supported aggregation/backfill timeframes, each with a fixed second count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
    W1,
}

impl Serialize for Timeframe {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Timeframe {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Timeframe::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl Timeframe {
    pub const ALL: [Timeframe; 8] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
        Timeframe::W1,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
            Timeframe::W1 => "1w",
        }
    }

    /// Bucket width in seconds.
    pub fn seconds(self) -> i64 {
        match self {
            Timeframe::M1 => 60,
            Timeframe::M5 => 5 * 60,
            Timeframe::M15 => 15 * 60,
            Timeframe::M30 => 30 * 60,
            Timeframe::H1 => 60 * 60,
            Timeframe::H4 => 4 * 60 * 60,
            Timeframe::D1 => 24 * 60 * 60,
            Timeframe::W1 => 7 * 24 * 60 * 60,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported timeframe: {0:?}")]
pub struct UnsupportedTimeframe(pub String);

impl FromStr for Timeframe {
    type Err = UnsupportedTimeframe;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Timeframe::M1),
            "5m" => Ok(Timeframe::M5),
            "15m" => Ok(Timeframe::M15),
            "30m" => Ok(Timeframe::M30),
            "1h" => Ok(Timeframe::H1),
            "4h" => Ok(Timeframe::H4),
            "1d" => Ok(Timeframe::D1),
            "1w" => Ok(Timeframe::W1),
            other => Err(UnsupportedTimeframe(other.to_string())),
        }
    }
}

/// Identifies one of the seven supported venues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Binance,
    Okx,
    Bitget,
    Coinbase,
    Bitstamp,
    Kraken,
    Bitvavo,
}

impl Venue {
    pub fn as_str(self) -> &'static str {
        match self {
            Venue::Binance => "binance",
            Venue::Okx => "okx",
            Venue::Bitget => "bitget",
            Venue::Coinbase => "coinbase",
            Venue::Bitstamp => "bitstamp",
            Venue::Kraken => "kraken",
            Venue::Bitvavo => "bitvavo",
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trade normalized into the canonical shape, immutable and value-typed.
///
/// Invariants: `price > 0`; `size >= 0`; `timestamp_utc_ns` is UTC
/// nanoseconds since the Unix epoch, promoted from whatever precision the
/// originating venue used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedTrade {
    pub symbol: Symbol,
    pub venue: Venue,
    pub price: Fx,
    pub size: Fx,
    pub timestamp_utc_ns: i64,
}

impl NormalizedTrade {
    pub fn timestamp_utc_s(&self) -> i64 {
        self.timestamp_utc_ns.div_euclid(1_000_000_000)
    }
}

/// One emitted bucket of the rolling aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedDataPoint {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub timestamp_utc_s: i64,
    pub vwap: Fx,
    pub volume: Fx,
    pub last_price: Fx,
    pub amend: bool,
}

/// An OHLCV candle, either fetched directly from a venue or produced by the
/// up-aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub open_time_utc_s: i64,
    pub open: Fx,
    pub high: Fx,
    pub low: Fx,
    pub close: Fx,
    pub volume: Fx,
}

/// Transient per-venue connection health, recomputed every status beacon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub venue: Venue,
    pub connected: bool,
    pub last_ingest_utc_ns: i64,
    pub latency_ms_estimate: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_round_trips_through_its_canonical_string() {
        for symbol in Symbol::ALL {
            assert_eq!(Symbol::from_str(symbol.as_str()).unwrap(), symbol);
        }
    }

    #[test]
    fn timeframe_round_trips_through_its_canonical_string() {
        for tf in Timeframe::ALL {
            assert_eq!(Timeframe::from_str(tf.as_str()).unwrap(), tf);
        }
    }

    #[test]
    fn rejects_unsupported_timeframe() {
        assert!(Timeframe::from_str("2m").is_err());
    }

    #[test]
    fn trade_timestamp_seconds_floors_toward_negative_infinity() {
        let trade = NormalizedTrade {
            symbol: Symbol::BtcUsdt,
            venue: Venue::Binance,
            price: Fx::parse("1").unwrap(),
            size: Fx::parse("1").unwrap(),
            timestamp_utc_ns: -500_000_000,
        };
        assert_eq!(trade.timestamp_utc_s(), -1);
    }
}
