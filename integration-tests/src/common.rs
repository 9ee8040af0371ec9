//! Shared harness for black-box message-port scenarios (S1-S6, spec §8).
//! Spawns a real [`trade_agg_worker::port_loop::run`] over an in-memory
//! duplex pipe and exposes `send`/`recv` helpers speaking raw JSON frames,
//! mirroring the teacher's `integration-tests/src/common.rs` `create_test_app`
//! helper but for the message port instead of an `axum::Router`.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::io::duplex;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};
use trade_agg_controller::Controller;
use trade_agg_core::config::Config;
use trade_agg_hub::Hub;
use trade_agg_store::ConnectionStatusCache;

fn codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_type::<u32>()
        .new_codec()
}

pub struct TestPort {
    to_worker: FramedWrite<tokio::io::DuplexStream, LengthDelimitedCodec>,
    from_worker: FramedRead<tokio::io::DuplexStream, LengthDelimitedCodec>,
    worker_task: JoinHandle<anyhow::Result<()>>,
}

impl TestPort {
    /// Spawns a worker instance with a fresh `Hub`/`ConnectionStatusCache`
    /// over an in-memory duplex pair, using `config` (so tests can shrink
    /// timeouts/backoff where relevant).
    pub async fn spawn(config: Config) -> Self {
        let hub = Hub::new();
        let hub_handle = hub.handle();
        let hub_rx = hub_handle.take_receiver().await;
        let status_cache = ConnectionStatusCache::new();
        let controller = Arc::new(tokio::sync::Mutex::new(Controller::new(
            config,
            hub_handle,
            status_cache.handle(),
        )));

        let (client_write_half, worker_reader) = duplex(1 << 20);
        let (worker_writer, client_read_half) = duplex(1 << 20);

        let worker_task = tokio::spawn(trade_agg_worker::port_loop::run(
            controller,
            hub_rx,
            worker_reader,
            worker_writer,
        ));

        Self {
            to_worker: FramedWrite::new(client_write_half, codec()),
            from_worker: FramedRead::new(client_read_half, codec()),
            worker_task,
        }
    }

    /// Sends a raw JSON command frame, e.g. `r#"{"type":"init",...}"#`.
    pub async fn send(&mut self, json: &str) {
        self.to_worker
            .send(Bytes::copy_from_slice(json.as_bytes()))
            .await
            .expect("failed to write command frame");
    }

    /// Waits for and decodes the next outbound event frame.
    pub async fn recv(&mut self) -> serde_json::Value {
        let frame = self
            .from_worker
            .next()
            .await
            .expect("port closed before an event arrived")
            .expect("frame decode error");
        serde_json::from_slice(&frame).expect("event frame was not valid JSON")
    }

    /// Closes the inbound half (simulating the host hanging up) and waits
    /// for the worker's port loop to exit.
    pub async fn close(self) {
        drop(self.to_worker);
        drop(self.from_worker);
        let _ = self.worker_task.await;
    }
}
