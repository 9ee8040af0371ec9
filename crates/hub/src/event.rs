use trade_agg_core::model::{AggregatedDataPoint, Candle, ConnectionStatus};

/// Everything the adapter set and the aggregator fan into the controller.
/// There is exactly one consumer (the controller's event loop, which frames
/// these onto the message port), so, unlike the teacher's per-topic
/// broadcast hub, a single event type and a single queue are enough.
#[derive(Debug, Clone, PartialEq)]
pub enum HubEvent {
    /// A rolling-aggregator bucket emission or amendment (§4.6).
    Aggregated(AggregatedDataPoint),
    /// One candle produced while servicing a `backfill` command; carries the
    /// originating request id so the port can correlate the stream (§6).
    Candle {
        req_id: Option<String>,
        candle: Candle,
    },
    /// A connection-status transition from the supervisor (§4.5).
    Status(ConnectionStatus),
}
