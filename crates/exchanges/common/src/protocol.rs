use async_trait::async_trait;
use chrono::{DateTime, Utc};
use trade_agg_core::model::{Candle, NormalizedTrade, Symbol, Timeframe, Venue};

/// The venue-specific half of an adapter: how to reach it over WebSocket and
/// how to turn its wire frames into normalized trades. The connection
/// supervisor (§4.5) is identical across venues and lives in
/// [`crate::supervisor`] — this trait is everything that differs.
pub trait VenueProtocol: Send + Sync + 'static {
    fn venue(&self) -> Venue;

    /// WebSocket endpoint for `symbol`. Returns an error for an
    /// unsupported pair — the supervisor must not be started for it (§4.2).
    fn ws_url(&self, symbol: Symbol) -> anyhow::Result<String>;

    /// Frames to send immediately after the handshake completes, in order.
    /// Empty when the venue subscribes via URL path alone (Binance).
    fn subscribe_frames(&self, symbol: Symbol) -> anyhow::Result<Vec<String>>;

    /// Parse one inbound text frame into zero or more normalized trades.
    /// Malformed payloads and non-trade control frames both return an empty
    /// vec — parsing never propagates an error (§4.4 "silently dropped").
    fn parse_frame(&self, symbol: Symbol, text: &str) -> Vec<NormalizedTrade>;
}

/// The REST half of an adapter (§4.7): one-shot historical candle fetch,
/// implemented per venue's pagination discipline.
#[async_trait]
pub trait HistoricalCandles: Send + Sync + 'static {
    async fn fetch_historical_candles(
        &self,
        symbol: Symbol,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Candle>>;
}

/// Full adapter contract (§4.4): a venue must supply both halves.
pub trait ExchangeAdapter: VenueProtocol + HistoricalCandles {}

impl<T: VenueProtocol + HistoricalCandles> ExchangeAdapter for T {}
