pub mod handle;
pub mod intake;
pub mod rolling;
pub mod up_aggregate;

pub use handle::{start, AggregatorHandle, AggregatorTask};
pub use rolling::RollingAggregator;
pub use up_aggregate::{relabel, up_aggregate};
