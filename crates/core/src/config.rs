use serde::{Deserialize, Serialize};
use std::env;

/// Process-level configuration, loaded once at worker startup. Per-session
/// selection (symbol/timeframe) is not here — that travels over the message
/// port and through the state store (§4.3, §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub log_level: String,
    /// HTTP client timeout for REST backfill requests.
    pub http_timeout_ms: u64,
    /// Bound on the aggregator's intake queue (§9 "unbounded internal
    /// queue" design note).
    pub aggregator_queue_capacity: usize,
    /// WS ping interval, seconds (§4.5).
    pub ws_ping_interval_secs: u64,
    /// WS inactivity timeout, seconds (§4.5 / §5).
    pub ws_inactivity_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            http_timeout_ms: env::var("HTTP_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),
            aggregator_queue_capacity: env::var("AGGREGATOR_QUEUE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(65_536),
            ws_ping_interval_secs: env::var("WS_PING_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15),
            ws_inactivity_timeout_secs: env::var("WS_INACTIVITY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            http_timeout_ms: 10_000,
            aggregator_queue_capacity: 65_536,
            ws_ping_interval_secs: 15,
            ws_inactivity_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_timeouts() {
        let config = Config::default();
        assert_eq!(config.ws_ping_interval_secs, 15);
        assert_eq!(config.ws_inactivity_timeout_secs, 30);
        assert_eq!(config.aggregator_queue_capacity, 65_536);
    }
}
