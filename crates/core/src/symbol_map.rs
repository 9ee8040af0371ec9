//! Canonical ⇄ venue symbol translation (§4.2).
//!
//! Pure mapping table: canonical symbols map to a venue's native symbol for
//! both its WebSocket subscription and its REST endpoints. A pair not listed
//! for a venue has no mapping — callers must not instantiate an adapter for
//! that combination.

use crate::model::{Symbol, Venue};

/// Returns the venue-native symbol string for `(venue, symbol)`, or `None`
/// if that venue does not support the pair.
pub fn venue_symbol(venue: Venue, symbol: Symbol) -> Option<&'static str> {
    use Symbol::*;
    use Venue::*;

    match (venue, symbol) {
        (Binance, BtcUsdt) => Some("BTCUSDT"),
        (Okx, BtcUsdt) => Some("BTC-USDT"),
        (Bitget, BtcUsdt) => Some("BTCUSDT"),

        (Coinbase, BtcUsd) => Some("BTC-USD"),
        (Bitstamp, BtcUsd) => Some("btcusd"),
        (Kraken, BtcUsd) => Some("XBT/USD"),

        (Kraken, BtcEur) => Some("XBT/EUR"),
        (Bitvavo, BtcEur) => Some("BTC-EUR"),

        _ => None,
    }
}

/// Kraken's REST `pair` parameter differs from its WS subscription pair
/// (e.g. `XXBTZUSD` vs `XBT/USD`); §4.7 calls this out explicitly.
pub fn kraken_rest_pair(symbol: Symbol) -> Option<&'static str> {
    match symbol {
        Symbol::BtcUsd => Some("XXBTZUSD"),
        Symbol::BtcEur => Some("XXBTZEUR"),
        Symbol::BtcUsdt => None,
    }
}

/// The venues supervised for a given canonical symbol (§4.9's adapter set
/// table).
pub fn venues_for_symbol(symbol: Symbol) -> &'static [Venue] {
    match symbol {
        Symbol::BtcUsdt => &[Venue::Binance, Venue::Okx, Venue::Bitget],
        Symbol::BtcUsd => &[Venue::Coinbase, Venue::Bitstamp, Venue::Kraken],
        Symbol::BtcEur => &[Venue::Kraken, Venue::Bitvavo],
    }
}

/// Preferred backfill venue order for a given canonical symbol (§4.7).
pub fn backfill_preference(symbol: Symbol) -> &'static [Venue] {
    venues_for_symbol(symbol)
}
