//! Hook for `init`'s `debug: bool?` field (§6; SPEC_FULL.md §3 "Debug flag
//! plumbing"). The controller crate only knows it must flip verbosity; the
//! actual `tracing_subscriber::reload::Handle` lives in the worker binary,
//! which is the one that built the subscriber.

pub trait DebugToggle: Send + Sync {
    fn set_debug(&self, enabled: bool);
}

/// No-op implementation used where no dynamic log control is wired up
/// (e.g. unit tests constructing a `Controller` directly).
pub struct NoopDebugToggle;

impl DebugToggle for NoopDebugToggle {
    fn set_debug(&self, _enabled: bool) {}
}
