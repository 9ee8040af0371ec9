//! The command controller (§4.9): owns the current symbol/timeframe, the
//! persisted-selection store, the live adapter set, and the rolling
//! aggregator. Parses and dispatches commands arriving over the message
//! port, mutating that owned state and replying with `ack`/`error`/`candle`
//! events (§6).

use crate::adapter_set::AdapterSet;
use crate::adapters::AnyAdapter;
use crate::backfill;
use crate::error::ControllerError;
use crate::log_control::{DebugToggle, NoopDebugToggle};
use crate::translator::{EventTranslator, SharedAggregator};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use trade_agg_core::config::Config;
use trade_agg_core::model::{NormalizedTrade, Symbol, Timeframe};
use trade_agg_exchanges_common::{HistoricalCandles, SupervisorConfig};
use trade_agg_hub::{HubEvent, HubHandle};
use trade_agg_port::{AckPayload, Command, Envelope, ErrorCode, ErrorPayload, Event};
use trade_agg_store::{ConnectionStatusCacheHandle, StateStore};

const DEFAULT_SYMBOL: Symbol = Symbol::BtcUsdt;
const DEFAULT_TIMEFRAME: Timeframe = Timeframe::M1;

pub struct Controller {
    config: Config,
    http: reqwest::Client,
    hub: HubHandle,
    debug_toggle: Arc<dyn DebugToggle>,
    state: Option<StateStore>,
    symbol: Symbol,
    timeframe: Timeframe,
    adapters: AdapterSet,
    aggregator_task: Option<trade_agg_aggregator::AggregatorTask>,
    aggregator_slot: SharedAggregator,
    trade_tx: mpsc::Sender<NormalizedTrade>,
    translator: EventTranslator,
}

impl Controller {
    pub fn new(config: Config, hub: HubHandle, status_cache: ConnectionStatusCacheHandle) -> Self {
        Self::with_debug_toggle(config, hub, status_cache, Arc::new(NoopDebugToggle))
    }

    pub fn with_debug_toggle(
        config: Config,
        hub: HubHandle,
        status_cache: ConnectionStatusCacheHandle,
        debug_toggle: Arc<dyn DebugToggle>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let (trade_tx, mut trade_rx) = mpsc::channel::<NormalizedTrade>(4096);
        let aggregator_slot: SharedAggregator = Arc::new(Mutex::new(None));
        let forwarder_slot = Arc::clone(&aggregator_slot);
        tokio::spawn(async move {
            while let Some(trade) = trade_rx.recv().await {
                let guard = forwarder_slot.lock().expect("aggregator slot poisoned");
                if let Some(handle) = guard.as_ref() {
                    handle.enqueue(trade);
                }
            }
        });

        let translator = EventTranslator::new(status_cache, Arc::clone(&aggregator_slot));

        Self {
            config,
            http,
            hub,
            debug_toggle,
            state: None,
            symbol: DEFAULT_SYMBOL,
            timeframe: DEFAULT_TIMEFRAME,
            adapters: AdapterSet::new(),
            aggregator_task: None,
            aggregator_slot,
            trade_tx,
            translator,
        }
    }

    /// A cheap clone of the event translator, handed to the worker's
    /// background hub-forwarding task so it can run independently of
    /// whatever owns `self` for command dispatch.
    pub fn translator(&self) -> EventTranslator {
        self.translator.clone()
    }

    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Translate a background hub event; see [`EventTranslator::translate`].
    /// Kept on `Controller` for convenience/tests — the worker's
    /// long-running hub-forwarder task uses [`Self::translator`] instead so
    /// it doesn't need to hold the whole controller.
    pub fn translate_event(&self, event: HubEvent) -> Option<Envelope> {
        self.translator.translate(event)
    }

    /// Dispatch one inbound command, writing every response envelope it
    /// produces (ack, error, and for `backfill`, a stream of `candle`
    /// events followed by `ack`) onto `outbound`, in order (§5 "Events on
    /// the outbound port are emitted in the order the controller produced
    /// them").
    pub async fn handle_command(&mut self, command: Command, outbound: &mpsc::Sender<Envelope>) {
        let req_id = command.req_id().map(str::to_string);
        let result = match command {
            Command::Init {
                state_dir_path,
                debug,
                ..
            } => self.handle_init(state_dir_path, debug, req_id.clone(), outbound).await,
            Command::SetSymbol { symbol, .. } => {
                self.handle_set_symbol(symbol, req_id.clone(), outbound).await
            }
            Command::SetTimeframe { timeframe, .. } => {
                self.handle_set_timeframe(timeframe, req_id.clone(), outbound).await
            }
            Command::Backfill {
                symbol,
                timeframe,
                start_iso,
                end_iso,
                ..
            } => {
                self.handle_backfill(symbol, timeframe, start_iso, end_iso, req_id.clone(), outbound)
                    .await
            }
            Command::Shutdown { .. } => self.handle_shutdown(req_id.clone(), outbound).await,
        };

        if let Err(err) = result {
            warn!(error = %err, "command failed");
            send(outbound, Envelope::new(error_event(&err), req_id)).await;
        }
    }

    /// For an undecodable payload (§7 "Protocol errors"), there is no
    /// parsed `Command` to dispatch — called directly by the worker's
    /// framing loop instead.
    pub async fn handle_decode_error(&self, req_id: Option<String>, message: String, outbound: &mpsc::Sender<Envelope>) {
        let err = ControllerError::BadPayload(message);
        send(outbound, Envelope::new(error_event(&err), req_id)).await;
    }

    async fn handle_init(
        &mut self,
        state_dir_path: String,
        debug: Option<bool>,
        req_id: Option<String>,
        outbound: &mpsc::Sender<Envelope>,
    ) -> Result<(), ControllerError> {
        if debug.unwrap_or(false) {
            self.debug_toggle.set_debug(true);
        }

        let store = StateStore::new(state_dir_path);
        let loaded = store.load().await;
        if let Some(symbol) = loaded.symbol {
            self.symbol = symbol;
        }
        if let Some(timeframe) = loaded.timeframe {
            self.timeframe = timeframe;
        }
        self.state = Some(store);

        self.restart_adapters().await;
        self.restart_aggregator();

        info!(symbol = %self.symbol, timeframe = %self.timeframe, "controller initialized");
        send(
            outbound,
            Envelope::new(
                Event::Ack(AckPayload::init(self.symbol, self.timeframe)),
                req_id,
            ),
        )
        .await;
        Ok(())
    }

    async fn handle_set_symbol(
        &mut self,
        symbol: String,
        req_id: Option<String>,
        outbound: &mpsc::Sender<Envelope>,
    ) -> Result<(), ControllerError> {
        let symbol = Symbol::from_str(&symbol)
            .map_err(|_| ControllerError::InvalidArg(format!("unsupported symbol {symbol:?}")))?;

        self.symbol = symbol;
        self.persist().await?;
        self.restart_adapters().await;
        self.restart_aggregator();

        send(
            outbound,
            Envelope::new(Event::Ack(AckPayload::ok("setSymbol")), req_id),
        )
        .await;
        Ok(())
    }

    async fn handle_set_timeframe(
        &mut self,
        timeframe: String,
        req_id: Option<String>,
        outbound: &mpsc::Sender<Envelope>,
    ) -> Result<(), ControllerError> {
        let timeframe = Timeframe::from_str(&timeframe)
            .map_err(|_| ControllerError::InvalidArg(format!("unsupported timeframe {timeframe:?}")))?;

        self.timeframe = timeframe;
        self.persist().await?;
        self.restart_aggregator();

        send(
            outbound,
            Envelope::new(Event::Ack(AckPayload::ok("setTimeframe")), req_id),
        )
        .await;
        Ok(())
    }

    async fn handle_backfill(
        &mut self,
        symbol: Option<String>,
        timeframe: Option<String>,
        start_iso: String,
        end_iso: String,
        req_id: Option<String>,
        outbound: &mpsc::Sender<Envelope>,
    ) -> Result<(), ControllerError> {
        let symbol = match symbol {
            Some(s) => Symbol::from_str(&s)
                .map_err(|_| ControllerError::InvalidArg(format!("unsupported symbol {s:?}")))?,
            None => self.symbol,
        };
        let timeframe = match timeframe {
            Some(tf) => Timeframe::from_str(&tf)
                .map_err(|_| ControllerError::InvalidArg(format!("unsupported timeframe {tf:?}")))?,
            None => self.timeframe,
        };

        let start = chrono::DateTime::parse_from_rfc3339(&start_iso)
            .map_err(|_| ControllerError::InvalidArg(format!("invalid startIso {start_iso:?}")))?
            .with_timezone(&chrono::Utc);
        let end = chrono::DateTime::parse_from_rfc3339(&end_iso)
            .map_err(|_| ControllerError::InvalidArg(format!("invalid endIso {end_iso:?}")))?
            .with_timezone(&chrono::Utc);
        if start >= end {
            return Err(ControllerError::InvalidArg(format!(
                "startIso {start_iso:?} must be before endIso {end_iso:?}"
            )));
        }

        let venue = backfill::preferred_venue(symbol);
        let adapter = match self.adapters.find(venue) {
            Some(adapter) => Arc::clone(adapter),
            None => Arc::new(AnyAdapter::for_venue(venue, self.http.clone())),
        };

        let result = backfill::run(&adapter, symbol, timeframe, start, end).await;
        for candle in result.candles {
            send(
                outbound,
                Envelope::new(Event::Candle(candle), req_id.clone()),
            )
            .await;
        }

        if result.partial {
            send(
                outbound,
                Envelope::new(
                    Event::Error(ErrorPayload {
                        code: ErrorCode::Unavailable,
                        message: format!("{venue} returned fewer candles than the requested window"),
                    }),
                    req_id.clone(),
                ),
            )
            .await;
        }

        send(
            outbound,
            Envelope::new(Event::Ack(AckPayload::ok("backfill")), req_id),
        )
        .await;
        Ok(())
    }

    async fn handle_shutdown(
        &mut self,
        req_id: Option<String>,
        outbound: &mpsc::Sender<Envelope>,
    ) -> Result<(), ControllerError> {
        self.stop_aggregator();
        self.adapters.stop_all().await;

        send(
            outbound,
            Envelope::new(Event::Ack(AckPayload::ok("shutdown")), req_id),
        )
        .await;
        Ok(())
    }

    async fn persist(&self) -> Result<(), ControllerError> {
        if let Some(store) = &self.state {
            store
                .save(self.symbol, self.timeframe)
                .await
                .map_err(ControllerError::Internal)?;
        }
        Ok(())
    }

    async fn restart_adapters(&mut self) {
        let supervisor_config = SupervisorConfig {
            ping_interval: Duration::from_secs(self.config.ws_ping_interval_secs),
            inactivity_timeout: Duration::from_secs(self.config.ws_inactivity_timeout_secs),
        };
        self.adapters
            .restart_for_symbol(
                self.symbol,
                self.http.clone(),
                self.trade_tx.clone(),
                self.hub.clone(),
                supervisor_config,
            )
            .await;
    }

    /// Destroys the current aggregator instance (if any) and starts a fresh
    /// one for `(self.symbol, self.timeframe)` — no bucket state ever
    /// carries across a selection change (§4.6 restart semantics).
    fn restart_aggregator(&mut self) {
        self.stop_aggregator();

        let (handle, task) = trade_agg_aggregator::start(
            self.symbol,
            self.timeframe,
            self.config.aggregator_queue_capacity,
            self.hub.clone(),
        );
        *self.aggregator_slot.lock().expect("aggregator slot poisoned") = Some(handle);
        self.aggregator_task = Some(task);
    }

    fn stop_aggregator(&mut self) {
        *self.aggregator_slot.lock().expect("aggregator slot poisoned") = None;
        if let Some(task) = self.aggregator_task.take() {
            tokio::spawn(task.stop());
        }
    }
}

fn error_event(err: &ControllerError) -> Event {
    Event::Error(ErrorPayload {
        code: err.code(),
        message: err.message(),
    })
}

async fn send(outbound: &mpsc::Sender<Envelope>, envelope: Envelope) {
    if outbound.send(envelope).await.is_err() {
        warn!("outbound channel closed, dropping event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trade_agg_hub::Hub;
    use trade_agg_store::ConnectionStatusCache;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.http_timeout_ms = 1_000;
        config
    }

    async fn new_controller() -> (Controller, mpsc::Receiver<Envelope>) {
        let hub = Hub::new();
        let hub_handle = hub.handle();
        let status_cache = ConnectionStatusCache::new();
        let controller = Controller::new(test_config(), hub_handle, status_cache.handle());
        let (_tx, rx) = mpsc::channel(16);
        (controller, rx)
    }

    #[tokio::test]
    async fn defaults_match_the_documented_s1_scenario() {
        let (controller, _rx) = new_controller().await;
        assert_eq!(controller.symbol(), Symbol::BtcUsdt);
        assert_eq!(controller.timeframe(), Timeframe::M1);
    }

    #[tokio::test]
    async fn set_timeframe_rejects_an_unsupported_value() {
        let (mut controller, _unused) = new_controller().await;
        let (outbound, mut rx) = mpsc::channel(16);

        controller
            .handle_set_timeframe("2m".to_string(), Some("b".to_string()), &outbound)
            .await
            .unwrap_err();
        let _ = rx.try_recv();
    }

    #[tokio::test]
    async fn init_with_no_saved_state_resolves_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, _unused) = new_controller().await;
        let (outbound, mut rx) = mpsc::channel(16);

        controller
            .handle_init(
                dir.path().to_string_lossy().to_string(),
                None,
                Some("a".to_string()),
                &outbound,
            )
            .await
            .unwrap();

        let envelope = rx.recv().await.unwrap();
        match envelope.event {
            Event::Ack(ack) => {
                assert_eq!(ack.symbol, Some(Symbol::BtcUsdt));
                assert_eq!(ack.timeframe, Some(Timeframe::M1));
            }
            other => panic!("unexpected event: {other:?}"),
        }

        controller.stop_aggregator();
        controller.adapters.stop_all().await;
    }

    #[tokio::test]
    async fn init_resolves_a_persisted_selection() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(
            dir.path().join("state.json"),
            br#"{"lastSymbol":"BTC/USD","lastTimeframe":"5m"}"#,
        )
        .await
        .unwrap();

        let (mut controller, _unused) = new_controller().await;
        let (outbound, mut rx) = mpsc::channel(16);

        controller
            .handle_init(
                dir.path().to_string_lossy().to_string(),
                None,
                Some("a".to_string()),
                &outbound,
            )
            .await
            .unwrap();

        let envelope = rx.recv().await.unwrap();
        match envelope.event {
            Event::Ack(ack) => {
                assert_eq!(ack.symbol, Some(Symbol::BtcUsd));
                assert_eq!(ack.timeframe, Some(Timeframe::M5));
            }
            other => panic!("unexpected event: {other:?}"),
        }

        controller.stop_aggregator();
        controller.adapters.stop_all().await;
    }

    #[tokio::test]
    async fn backfill_rejects_start_after_end() {
        let (mut controller, _unused) = new_controller().await;
        let (outbound, mut rx) = mpsc::channel(16);

        let err = controller
            .handle_backfill(
                None,
                None,
                "2024-01-02T00:00:00Z".to_string(),
                "2024-01-01T00:00:00Z".to_string(),
                Some("c".to_string()),
                &outbound,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::InvalidArg(_)));
        let _ = rx.try_recv();
    }
}
