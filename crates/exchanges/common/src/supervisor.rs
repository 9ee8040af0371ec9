//! The connection supervisor (§4.5): identical state machine
//! (Connecting → Subscribing → Streaming → Backoff, with a Terminal exit)
//! driven generically over any [`VenueProtocol`], so each venue crate only
//! supplies `ws_url`/`subscribe_frames`/`parse_frame`.

use crate::backoff::Backoff;
use crate::protocol::VenueProtocol;
use crate::ws_client::WsClient;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use trade_agg_core::model::{ConnectionStatus, NormalizedTrade, Symbol};
use trade_agg_core::time::now_ns;
use trade_agg_hub::{HubEvent, HubHandle};

const INACTIVITY_POLL_INTERVAL: Duration = Duration::from_secs(5);
const STATUS_BEACON_INTERVAL: Duration = Duration::from_secs(1);

/// Tunables carried in from `Config` (§2); defaults match §4.5/§5.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorConfig {
    pub ping_interval: Duration,
    pub inactivity_timeout: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(15),
            inactivity_timeout: Duration::from_secs(30),
        }
    }
}

/// A running supervisor task. `disconnect` is idempotent and returns once
/// the WebSocket and timers have been released (§4.4 `disconnect()`
/// contract).
pub struct SupervisorHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl SupervisorHandle {
    pub async fn disconnect(self) {
        self.cancel.cancel();
        if let Err(err) = self.join.await {
            if !err.is_cancelled() {
                error!(error = %err, "supervisor task panicked");
            }
        }
    }
}

/// Start the supervisor loop for `protocol` against `symbol`. Normalized
/// trades are pushed onto `trade_tx` (the aggregator's intake queue,
/// §4.6); connection status transitions publish to `hub` (§4.5 status
/// beacon).
pub fn start<P: VenueProtocol>(
    protocol: Arc<P>,
    symbol: Symbol,
    trade_tx: mpsc::Sender<NormalizedTrade>,
    hub: HubHandle,
    config: SupervisorConfig,
) -> SupervisorHandle {
    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();
    let join = tokio::spawn(async move {
        run(protocol, symbol, trade_tx, hub, config, task_cancel).await;
    });
    SupervisorHandle { cancel, join }
}

fn publish_status(hub: &HubHandle, venue: trade_agg_core::model::Venue, connected: bool, last_ingest_utc_ns: i64) {
    let latency_ms_estimate = ((now_ns() - last_ingest_utc_ns) / 1_000_000).max(0);
    hub.try_publish(HubEvent::Status(ConnectionStatus {
        venue,
        connected,
        last_ingest_utc_ns,
        latency_ms_estimate,
    }));
}

async fn run<P: VenueProtocol>(
    protocol: Arc<P>,
    symbol: Symbol,
    trade_tx: mpsc::Sender<NormalizedTrade>,
    hub: HubHandle,
    config: SupervisorConfig,
    cancel: CancellationToken,
) {
    let venue = protocol.venue();
    let mut backoff = Backoff::new();

    loop {
        if cancel.is_cancelled() {
            break;
        }

        // Connecting
        let url = match protocol.ws_url(symbol) {
            Ok(url) => url,
            Err(err) => {
                error!(%venue, %symbol, error = %err, "no websocket endpoint for symbol, stopping supervisor");
                return;
            }
        };

        let client = WsClient::new(url);
        info!(%venue, %symbol, "connecting");
        if let Err(err) = client.connect().await {
            warn!(%venue, error = %err, "handshake failed");
            publish_status(&hub, venue, false, 0);
            if wait_backoff(&mut backoff, &cancel).await {
                break;
            }
            continue;
        }

        // Subscribing
        let frames = match protocol.subscribe_frames(symbol) {
            Ok(frames) => frames,
            Err(err) => {
                error!(%venue, error = %err, "cannot build subscription, stopping supervisor");
                let _ = client.close().await;
                return;
            }
        };
        let mut subscribe_failed = false;
        for frame in frames {
            if let Err(err) = client.send_text(frame).await {
                warn!(%venue, error = %err, "subscribe frame failed");
                subscribe_failed = true;
                break;
            }
        }
        if subscribe_failed {
            let _ = client.close().await;
            publish_status(&hub, venue, false, 0);
            if wait_backoff(&mut backoff, &cancel).await {
                break;
            }
            continue;
        }

        // Streaming
        info!(%venue, %symbol, "streaming");
        let streamed_ok = stream(
            &client,
            protocol.as_ref(),
            symbol,
            &trade_tx,
            &hub,
            venue,
            &config,
            &cancel,
            &mut backoff,
        )
        .await;
        let _ = client.close().await;
        publish_status(&hub, venue, false, now_ns());

        if !streamed_ok || cancel.is_cancelled() {
            if cancel.is_cancelled() {
                break;
            }
        }

        if wait_backoff(&mut backoff, &cancel).await {
            break;
        }
    }

    debug!(%venue, "supervisor terminal");
}

/// Runs the Streaming state until disconnect, EOF, or a frame error.
/// Returns `true` if the stream ended "normally" (EOF/close), `false` on an
/// explicit read error — both outcomes transition to Backoff the same way,
/// the distinction is only for logging.
#[allow(clippy::too_many_arguments)]
async fn stream<P: VenueProtocol>(
    client: &WsClient,
    protocol: &P,
    symbol: Symbol,
    trade_tx: &mpsc::Sender<NormalizedTrade>,
    hub: &HubHandle,
    venue: trade_agg_core::model::Venue,
    config: &SupervisorConfig,
    cancel: &CancellationToken,
    backoff: &mut Backoff,
) -> bool {
    let last_ingest = Arc::new(AtomicI64::new(now_ns()));
    let mut first_frame_received = false;

    let mut ping_ticker = tokio::time::interval(config.ping_interval);
    let mut inactivity_ticker = tokio::time::interval(INACTIVITY_POLL_INTERVAL);
    let mut beacon_ticker = tokio::time::interval(STATUS_BEACON_INTERVAL);
    ping_ticker.tick().await;
    inactivity_ticker.tick().await;
    beacon_ticker.tick().await;

    publish_status(hub, venue, true, last_ingest.load(Ordering::SeqCst));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return true,
            message = client.next_message() => {
                match message {
                    Ok(Some(Message::Text(text))) => {
                        last_ingest.store(now_ns(), Ordering::SeqCst);
                        if !first_frame_received {
                            backoff.reset();
                            first_frame_received = true;
                        }
                        for trade in protocol.parse_frame(symbol, &text) {
                            if trade_tx.send(trade).await.is_err() {
                                return true;
                            }
                        }
                    }
                    Ok(Some(Message::Ping(_))) | Ok(Some(Message::Pong(_))) => {
                        last_ingest.store(now_ns(), Ordering::SeqCst);
                    }
                    Ok(Some(Message::Close(_))) | Ok(None) => return true,
                    Ok(Some(_)) => {}
                    Err(err) => {
                        warn!(%venue, error = %err, "websocket read error");
                        return false;
                    }
                }
            }
            _ = ping_ticker.tick() => {
                if client.ping().await.is_err() {
                    return false;
                }
            }
            _ = inactivity_ticker.tick() => {
                let elapsed_ns = now_ns() - last_ingest.load(Ordering::SeqCst);
                if elapsed_ns > config.inactivity_timeout.as_nanos() as i64 {
                    warn!(%venue, "inactivity timeout, forcing reconnect");
                    return false;
                }
            }
            _ = beacon_ticker.tick() => {
                publish_status(hub, venue, true, last_ingest.load(Ordering::SeqCst));
            }
        }
    }
}

/// Waits out the next backoff delay, returning early (with `true`) if
/// cancelled mid-wait so the caller can exit to Terminal immediately.
async fn wait_backoff(backoff: &mut Backoff, cancel: &CancellationToken) -> bool {
    let delay = backoff.next_delay();
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}
