pub mod adapter_set;
pub mod adapters;
pub mod backfill;
pub mod controller;
pub mod error;
pub mod log_control;
pub mod translator;

pub use adapters::AnyAdapter;
pub use controller::Controller;
pub use error::ControllerError;
pub use log_control::DebugToggle;
pub use translator::EventTranslator;
