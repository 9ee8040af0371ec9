//! Wires the controller's [`DebugToggle`] hook to a
//! `tracing_subscriber::reload::Handle` so `init { debug: true }` can flip
//! verbosity for the rest of the process (SPEC_FULL.md §3 "Debug flag
//! plumbing").

use tracing::warn;
use tracing_subscriber::{reload, EnvFilter};
use trade_agg_controller::DebugToggle;

pub struct ReloadDebugToggle {
    handle: reload::Handle<EnvFilter, tracing_subscriber::Registry>,
}

impl ReloadDebugToggle {
    pub fn new(handle: reload::Handle<EnvFilter, tracing_subscriber::Registry>) -> Self {
        Self { handle }
    }
}

impl DebugToggle for ReloadDebugToggle {
    fn set_debug(&self, enabled: bool) {
        let directive = if enabled { "debug" } else { "info" };
        if let Err(err) = self.handle.reload(EnvFilter::new(directive)) {
            warn!(error = %err, "failed to reload tracing filter");
        }
    }
}
