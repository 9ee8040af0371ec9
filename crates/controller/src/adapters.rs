//! Per-venue polymorphism via enum dispatch (§9 "Abstract-method
//! polymorphism... Implementations may choose enum-with-variants"). Each
//! venue crate supplies a concrete adapter type implementing
//! [`VenueProtocol`]/[`HistoricalCandles`]; this enum wraps all seven so the
//! supervisor and the backfill planner can hold a single, uniform handle
//! regardless of which venue it's talking to.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use trade_agg_core::model::{Candle, NormalizedTrade, Symbol, Timeframe, Venue};
use trade_agg_exchanges_bitget::BitgetAdapter;
use trade_agg_exchanges_bitstamp::BitstampAdapter;
use trade_agg_exchanges_bitvavo::BitvavoAdapter;
use trade_agg_exchanges_binance::BinanceAdapter;
use trade_agg_exchanges_coinbase::CoinbaseAdapter;
use trade_agg_exchanges_common::{HistoricalCandles, VenueProtocol};
use trade_agg_exchanges_kraken::KrakenAdapter;
use trade_agg_exchanges_okx::OkxAdapter;

pub enum AnyAdapter {
    Binance(BinanceAdapter),
    Okx(OkxAdapter),
    Bitget(BitgetAdapter),
    Coinbase(CoinbaseAdapter),
    Bitstamp(BitstampAdapter),
    Kraken(KrakenAdapter),
    Bitvavo(BitvavoAdapter),
}

impl AnyAdapter {
    /// Construct the adapter for `venue`, sharing one HTTP client across
    /// every venue's REST calls (§5 "the HTTP client is owned per adapter").
    pub fn for_venue(venue: Venue, http: reqwest::Client) -> AnyAdapter {
        match venue {
            Venue::Binance => AnyAdapter::Binance(BinanceAdapter::new(http)),
            Venue::Okx => AnyAdapter::Okx(OkxAdapter::new(http)),
            Venue::Bitget => AnyAdapter::Bitget(BitgetAdapter::new(http)),
            Venue::Coinbase => AnyAdapter::Coinbase(CoinbaseAdapter::new(http)),
            Venue::Bitstamp => AnyAdapter::Bitstamp(BitstampAdapter::new(http)),
            Venue::Kraken => AnyAdapter::Kraken(KrakenAdapter::new(http)),
            Venue::Bitvavo => AnyAdapter::Bitvavo(BitvavoAdapter::new(http)),
        }
    }
}

impl VenueProtocol for AnyAdapter {
    fn venue(&self) -> Venue {
        match self {
            AnyAdapter::Binance(a) => a.venue(),
            AnyAdapter::Okx(a) => a.venue(),
            AnyAdapter::Bitget(a) => a.venue(),
            AnyAdapter::Coinbase(a) => a.venue(),
            AnyAdapter::Bitstamp(a) => a.venue(),
            AnyAdapter::Kraken(a) => a.venue(),
            AnyAdapter::Bitvavo(a) => a.venue(),
        }
    }

    fn ws_url(&self, symbol: Symbol) -> anyhow::Result<String> {
        match self {
            AnyAdapter::Binance(a) => a.ws_url(symbol),
            AnyAdapter::Okx(a) => a.ws_url(symbol),
            AnyAdapter::Bitget(a) => a.ws_url(symbol),
            AnyAdapter::Coinbase(a) => a.ws_url(symbol),
            AnyAdapter::Bitstamp(a) => a.ws_url(symbol),
            AnyAdapter::Kraken(a) => a.ws_url(symbol),
            AnyAdapter::Bitvavo(a) => a.ws_url(symbol),
        }
    }

    fn subscribe_frames(&self, symbol: Symbol) -> anyhow::Result<Vec<String>> {
        match self {
            AnyAdapter::Binance(a) => a.subscribe_frames(symbol),
            AnyAdapter::Okx(a) => a.subscribe_frames(symbol),
            AnyAdapter::Bitget(a) => a.subscribe_frames(symbol),
            AnyAdapter::Coinbase(a) => a.subscribe_frames(symbol),
            AnyAdapter::Bitstamp(a) => a.subscribe_frames(symbol),
            AnyAdapter::Kraken(a) => a.subscribe_frames(symbol),
            AnyAdapter::Bitvavo(a) => a.subscribe_frames(symbol),
        }
    }

    fn parse_frame(&self, symbol: Symbol, text: &str) -> Vec<NormalizedTrade> {
        match self {
            AnyAdapter::Binance(a) => a.parse_frame(symbol, text),
            AnyAdapter::Okx(a) => a.parse_frame(symbol, text),
            AnyAdapter::Bitget(a) => a.parse_frame(symbol, text),
            AnyAdapter::Coinbase(a) => a.parse_frame(symbol, text),
            AnyAdapter::Bitstamp(a) => a.parse_frame(symbol, text),
            AnyAdapter::Kraken(a) => a.parse_frame(symbol, text),
            AnyAdapter::Bitvavo(a) => a.parse_frame(symbol, text),
        }
    }
}

#[async_trait]
impl HistoricalCandles for AnyAdapter {
    async fn fetch_historical_candles(
        &self,
        symbol: Symbol,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Candle>> {
        match self {
            AnyAdapter::Binance(a) => a.fetch_historical_candles(symbol, timeframe, start, end).await,
            AnyAdapter::Okx(a) => a.fetch_historical_candles(symbol, timeframe, start, end).await,
            AnyAdapter::Bitget(a) => a.fetch_historical_candles(symbol, timeframe, start, end).await,
            AnyAdapter::Coinbase(a) => a.fetch_historical_candles(symbol, timeframe, start, end).await,
            AnyAdapter::Bitstamp(a) => a.fetch_historical_candles(symbol, timeframe, start, end).await,
            AnyAdapter::Kraken(a) => a.fetch_historical_candles(symbol, timeframe, start, end).await,
            AnyAdapter::Bitvavo(a) => a.fetch_historical_candles(symbol, timeframe, start, end).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_venue_constructs_the_matching_variant() {
        let http = reqwest::Client::new();
        assert!(matches!(AnyAdapter::for_venue(Venue::Binance, http.clone()), AnyAdapter::Binance(_)));
        assert!(matches!(AnyAdapter::for_venue(Venue::Bitvavo, http), AnyAdapter::Bitvavo(_)));
    }

    #[test]
    fn venue_accessor_matches_the_wrapped_adapter() {
        let http = reqwest::Client::new();
        let adapter = AnyAdapter::for_venue(Venue::Kraken, http);
        assert_eq!(adapter.venue(), Venue::Kraken);
    }
}
