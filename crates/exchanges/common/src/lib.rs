pub mod backoff;
pub mod protocol;
pub mod supervisor;
pub mod ws_client;

pub use backoff::Backoff;
pub use protocol::{ExchangeAdapter, HistoricalCandles, VenueProtocol};
pub use supervisor::{start as start_supervisor, SupervisorConfig, SupervisorHandle};
pub use ws_client::WsClient;
