use crate::event::HubEvent;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

/// Bound on the internal event queue. Producers (adapters, aggregator) back
/// off on `send` once this fills rather than unbounded-buffering events the
/// single consumer hasn't drained yet.
const CHANNEL_CAPACITY: usize = 1_000;

struct HubInner {
    sender: mpsc::Sender<HubEvent>,
    receiver: Mutex<Option<mpsc::Receiver<HubEvent>>>,
}

/// Handle to interact with the event hub. Cheap to clone; every adapter and
/// the aggregator hold one.
#[derive(Clone)]
pub struct HubHandle {
    inner: Arc<HubInner>,
}

impl HubHandle {
    /// Publish an event, waiting for queue space if the consumer has fallen
    /// behind.
    pub async fn publish(&self, event: HubEvent) {
        if self.inner.sender.send(event).await.is_err() {
            debug!("hub has no receiver, dropping event");
        }
    }

    /// Non-blocking publish; used on hot paths (e.g. the 250 ms aggregator
    /// tick) that must never stall behind a slow consumer. Drops the event
    /// on a full queue rather than apply backpressure to the producer.
    pub fn try_publish(&self, event: HubEvent) {
        if let Err(err) = self.inner.sender.try_send(event) {
            debug!(error = %err, "hub queue full or closed, dropping event");
        }
    }

    /// Take the single receiver. Panics if called more than once — there is
    /// exactly one consumer (the controller's event loop).
    pub async fn take_receiver(&self) -> mpsc::Receiver<HubEvent> {
        self.inner
            .receiver
            .lock()
            .await
            .take()
            .expect("hub receiver already taken")
    }
}

/// Owns the event channel; `handle()` hands out clonable publishers.
pub struct Hub {
    inner: Arc<HubInner>,
}

impl Hub {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(HubInner {
                sender,
                receiver: Mutex::new(Some(receiver)),
            }),
        }
    }

    pub fn handle(&self) -> HubHandle {
        HubHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Start the hub (currently just returns the handle; kept for symmetry
    /// with the other `Handle`-wrapping crates in the workspace).
    pub async fn start(self) -> anyhow::Result<HubHandle> {
        debug!("event hub started");
        Ok(self.handle())
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}
