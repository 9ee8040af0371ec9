//! Black-box message-port scenarios (spec §8): S1-S3 drive a real worker
//! instance end to end over an in-memory duplex pipe, mirroring the
//! teacher's `integration-tests/tests/api_integration_tests.rs` structure
//! (one test per documented scenario).

use trade_agg_core::config::Config;
use trade_agg_integration_tests::TestPort;

fn fast_config() -> Config {
    let mut config = Config::default();
    config.http_timeout_ms = 1_000;
    config
}

/// S1 Init with no saved state.
#[tokio::test]
async fn s1_init_with_no_saved_state_resolves_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let mut port = TestPort::spawn(fast_config()).await;

    port.send(&format!(
        r#"{{"type":"init","req_id":"a","stateDirPath":"{}"}}"#,
        dir.path().to_string_lossy()
    ))
    .await;

    let event = port.recv().await;
    assert_eq!(event["type"], "ack");
    assert_eq!(event["req_id"], "a");
    assert_eq!(event["data"]["for"], "init");
    assert_eq!(event["data"]["ok"], true);
    assert_eq!(event["data"]["symbol"], "BTC/USDT");
    assert_eq!(event["data"]["timeframe"], "1m");

    port.close().await;
}

/// S2 Persisted selection.
#[tokio::test]
async fn s2_persisted_selection_is_resolved_on_init() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("state.json"),
        br#"{"lastSymbol":"BTC/USD","lastTimeframe":"5m"}"#,
    )
    .unwrap();

    let mut port = TestPort::spawn(fast_config()).await;
    port.send(&format!(
        r#"{{"type":"init","req_id":"a","stateDirPath":"{}"}}"#,
        dir.path().to_string_lossy()
    ))
    .await;

    let event = port.recv().await;
    assert_eq!(event["data"]["symbol"], "BTC/USD");
    assert_eq!(event["data"]["timeframe"], "5m");

    port.close().await;
}

/// S3 Invalid timeframe.
#[tokio::test]
async fn s3_invalid_timeframe_yields_invalid_arg_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut port = TestPort::spawn(fast_config()).await;

    port.send(&format!(
        r#"{{"type":"init","req_id":"a","stateDirPath":"{}"}}"#,
        dir.path().to_string_lossy()
    ))
    .await;
    let _ack = port.recv().await;

    port.send(r#"{"type":"setTimeframe","timeframe":"2m","req_id":"b"}"#)
        .await;

    let event = port.recv().await;
    assert_eq!(event["type"], "error");
    assert_eq!(event["req_id"], "b");
    assert_eq!(event["data"]["code"], "INVALID_ARG");

    port.close().await;
}

/// An undecodable frame (missing required fields) surfaces as a
/// `BAD_PAYLOAD` error rather than tearing down the port (§7 "Protocol
/// errors").
#[tokio::test]
async fn unparseable_command_yields_bad_payload_error_and_keeps_the_port_alive() {
    let mut port = TestPort::spawn(fast_config()).await;

    port.send(r#"{"type":"bogus","req_id":"x"}"#).await;
    let event = port.recv().await;
    assert_eq!(event["type"], "error");
    assert_eq!(event["req_id"], "x");
    assert_eq!(event["data"]["code"], "BAD_PAYLOAD");

    port.send(r#"{"type":"shutdown","req_id":"y"}"#).await;
    let event = port.recv().await;
    assert_eq!(event["type"], "ack");
    assert_eq!(event["req_id"], "y");

    port.close().await;
}
