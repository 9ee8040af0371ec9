pub mod state;
pub mod status_cache;

pub use state::{LoadedSelection, StateStore};
pub use status_cache::{ConnectionStatusCache, ConnectionStatusCacheHandle};
