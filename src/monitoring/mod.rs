//! The monitoring core: select devices due now, probe them concurrently,
//! decide who to notify and write back the outcome.

pub mod classifier;
pub mod cycle;
pub mod error;
pub mod ports;
pub mod prober;
pub mod resolver;
pub mod scheduler;
pub mod state;

pub use cycle::{CycleReport, MonitorCycle, time_of_day_utc};
pub use scheduler::start_periodic_monitoring;
