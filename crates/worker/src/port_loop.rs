//! Drives one message-port session (§5, §6) over a generic framed
//! reader/writer pair. Three tasks cooperate:
//!
//! - the command loop (this function's main body) reads commands and drives
//!   `Controller::handle_command`;
//! - a hub-forwarder task translates background [`HubEvent`]s (aggregated
//!   points, status beacons) via [`EventTranslator`] independently of
//!   whatever command is being dispatched;
//! - a single writer task owns the `EventWriter` and is the only place that
//!   touches the wire, so events from both of the above stay strictly
//!   ordered on a first-come-first-served basis without a mutex around the
//!   writer (§5 "single consumer").
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{info, warn};
use trade_agg_controller::Controller;
use trade_agg_hub::HubEvent;
use trade_agg_port::{CommandReader, Envelope, EventWriter};

/// Bound on the outbound envelope queue feeding the single writer task.
const OUTBOUND_CAPACITY: usize = 1_000;

/// Runs the port loop to completion: until the host closes its end of
/// `reader`, or a `shutdown` command is handled and the reader then closes.
pub async fn run<R, W>(
    controller: Arc<tokio::sync::Mutex<Controller>>,
    mut hub_rx: mpsc::Receiver<HubEvent>,
    reader: R,
    writer: W,
) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Envelope>(OUTBOUND_CAPACITY);

    let writer_task = tokio::spawn(async move {
        let mut event_writer = EventWriter::new(writer);
        while let Some(envelope) = outbound_rx.recv().await {
            if let Err(err) = event_writer.send(&envelope).await {
                warn!(error = %err, "failed to write event frame, ending port loop");
                break;
            }
        }
    });

    let forwarder_tx = outbound_tx.clone();
    let forwarder_controller = Arc::clone(&controller);
    let forwarder_task = tokio::spawn(async move {
        let translator = forwarder_controller.lock().await.translator();
        while let Some(event) = hub_rx.recv().await {
            if let Some(envelope) = translator.translate(event) {
                if forwarder_tx.send(envelope).await.is_err() {
                    break;
                }
            }
        }
    });

    let mut command_reader = CommandReader::new(reader);
    loop {
        match command_reader.next_command().await {
            Ok(Some(Ok(command))) => {
                let is_shutdown = matches!(command, trade_agg_port::Command::Shutdown { .. });
                controller.lock().await.handle_command(command, &outbound_tx).await;
                if is_shutdown {
                    break;
                }
            }
            Ok(Some(Err(decode_err))) => {
                controller
                    .lock()
                    .await
                    .handle_decode_error(decode_err.req_id.clone(), decode_err.to_string(), &outbound_tx)
                    .await;
            }
            Ok(None) => {
                info!("message port closed by host");
                break;
            }
            Err(err) => {
                warn!(error = %err, "error reading from message port, ending port loop");
                break;
            }
        }
    }

    drop(outbound_tx);
    forwarder_task.abort();
    let _ = writer_task.await;
    Ok(())
}
