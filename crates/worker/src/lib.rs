pub mod port_loop;
pub mod reload_toggle;

pub use port_loop::run;
pub use reload_toggle::ReloadDebugToggle;
