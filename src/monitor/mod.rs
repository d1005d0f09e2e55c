pub mod aggregator;
pub mod grouper;
pub mod rate_limit;
pub mod scheduler;

pub use aggregator::{aggregate, AggregateResult};
pub use scheduler::{MonitorSettings, PriceMonitor};
