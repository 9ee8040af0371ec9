//! The message-port wire protocol (§6): inbound commands and the outbound
//! event envelope.

use serde::{Deserialize, Serialize};
use trade_agg_core::model::{AggregatedDataPoint, Candle, Symbol, Timeframe, Venue};

/// Inbound command, internally tagged on `type` (§6). Field casing follows
/// the spec's wire examples literally: `req_id`/`ts` stay snake_case while
/// command-specific fields (`stateDirPath`, `startIso`, `endIso`) are
/// camelCase, matching the documented protocol rather than a single
/// convention.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    #[serde(rename = "init")]
    Init {
        req_id: Option<String>,
        ts: Option<String>,
        #[serde(rename = "stateDirPath")]
        state_dir_path: String,
        debug: Option<bool>,
    },
    #[serde(rename = "setSymbol")]
    SetSymbol {
        req_id: Option<String>,
        ts: Option<String>,
        symbol: String,
    },
    #[serde(rename = "setTimeframe")]
    SetTimeframe {
        req_id: Option<String>,
        ts: Option<String>,
        timeframe: String,
    },
    #[serde(rename = "backfill")]
    Backfill {
        req_id: Option<String>,
        ts: Option<String>,
        symbol: Option<String>,
        timeframe: Option<String>,
        #[serde(rename = "startIso")]
        start_iso: String,
        #[serde(rename = "endIso")]
        end_iso: String,
    },
    #[serde(rename = "shutdown")]
    Shutdown {
        req_id: Option<String>,
        ts: Option<String>,
    },
}

impl Command {
    pub fn req_id(&self) -> Option<&str> {
        match self {
            Command::Init { req_id, .. }
            | Command::SetSymbol { req_id, .. }
            | Command::SetTimeframe { req_id, .. }
            | Command::Backfill { req_id, .. }
            | Command::Shutdown { req_id, .. } => req_id.as_deref(),
        }
    }
}

/// Error produced when a raw frame doesn't decode as a [`Command`]
/// (§7 "Protocol errors" ⇒ `BAD_PAYLOAD`). Best-effort recovers `req_id`
/// from the raw payload so the caller can still correlate its error
/// response even though the command itself never fully parsed.
#[derive(Debug, thiserror::Error)]
#[error("undecodable command payload: {source}")]
pub struct CommandDecodeError {
    #[source]
    pub source: serde_json::Error,
    pub req_id: Option<String>,
}

pub fn decode_command(bytes: &[u8]) -> Result<Command, CommandDecodeError> {
    serde_json::from_slice(bytes).map_err(|source| {
        let req_id = serde_json::from_slice::<serde_json::Value>(bytes)
            .ok()
            .and_then(|v| v.get("req_id").and_then(|r| r.as_str()).map(str::to_string));
        CommandDecodeError { source, req_id }
    })
}

/// Outbound event payload (§6 "Outbound event envelope"), adjacently
/// tagged: `type` names the variant, `data` carries its payload.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Event {
    Aggregated(AggregatedDataPoint),
    Candle(Candle),
    Status(StatusPayload),
    Ack(AckPayload),
    Error(ErrorPayload),
}

/// `status` payload: a [`trade_agg_core::model::ConnectionStatus`] with its
/// venue field renamed to `exchange` (§6) and the dropped-trade counter
/// supplement (SPEC_FULL.md §3).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusPayload {
    pub exchange: Venue,
    pub connected: bool,
    pub last_ingest_utc_ns: i64,
    pub latency_ms_estimate: i64,
    pub queue_dropped_total: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AckPayload {
    #[serde(rename = "for")]
    pub for_command: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<Symbol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<Timeframe>,
}

impl AckPayload {
    pub fn ok(for_command: &'static str) -> Self {
        Self {
            for_command,
            ok: true,
            symbol: None,
            timeframe: None,
        }
    }

    pub fn init(symbol: Symbol, timeframe: Timeframe) -> Self {
        Self {
            for_command: "init",
            ok: true,
            symbol: Some(symbol),
            timeframe: Some(timeframe),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidArg,
    UnknownCmd,
    Unavailable,
    BadPayload,
    Internal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
}

/// The full outbound frame: `event` plus the correlating `req_id` (§6).
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    #[serde(flatten)]
    pub event: Event,
    #[serde(rename = "req_id", skip_serializing_if = "Option::is_none")]
    pub req_id: Option<String>,
}

impl Envelope {
    pub fn new(event: Event, req_id: Option<String>) -> Self {
        Self { event, req_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_command_decodes_with_mixed_field_casing() {
        let raw = br#"{"type":"init","req_id":"a","stateDirPath":"/tmp/x","debug":true}"#;
        let command = decode_command(raw).unwrap();
        match command {
            Command::Init { req_id, state_dir_path, debug, .. } => {
                assert_eq!(req_id.as_deref(), Some("a"));
                assert_eq!(state_dir_path, "/tmp/x");
                assert_eq!(debug, Some(true));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn backfill_command_decodes_camelcase_range_fields() {
        let raw = br#"{"type":"backfill","req_id":"b","startIso":"2024-01-01T00:00:00Z","endIso":"2024-01-02T00:00:00Z"}"#;
        let command = decode_command(raw).unwrap();
        match command {
            Command::Backfill { start_iso, end_iso, .. } => {
                assert_eq!(start_iso, "2024-01-01T00:00:00Z");
                assert_eq!(end_iso, "2024-01-02T00:00:00Z");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn undecodable_payload_still_recovers_req_id() {
        let raw = br#"{"type":"bogus","req_id":"c"}"#;
        let err = decode_command(raw).unwrap_err();
        assert_eq!(err.req_id.as_deref(), Some("c"));
    }

    #[test]
    fn ack_envelope_serializes_with_type_data_and_req_id() {
        let envelope = Envelope::new(
            Event::Ack(AckPayload::init(Symbol::BtcUsdt, Timeframe::M1)),
            Some("a".to_string()),
        );
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["type"], "ack");
        assert_eq!(json["data"]["for"], "init");
        assert_eq!(json["data"]["symbol"], "BTC/USDT");
        assert_eq!(json["req_id"], "a");
    }

    #[test]
    fn error_payload_uses_screaming_snake_case_codes() {
        let envelope = Envelope::new(
            Event::Error(ErrorPayload {
                code: ErrorCode::InvalidArg,
                message: "bad timeframe".to_string(),
            }),
            None,
        );
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["data"]["code"], "INVALID_ARG");
        assert!(json.get("req_id").is_none());
    }
}
