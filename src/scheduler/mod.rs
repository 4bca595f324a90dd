//! Polling Scheduler Module
//!
//! Drives the periodic publishing of metric snapshots from a tick source.

mod polling;
mod ticks;

pub use polling::PollingScheduler;
pub use ticks::IntervalTicks;
