//! Tick sources for the polling scheduler

use async_trait::async_trait;
use tokio::time::{interval, Duration, Interval, MissedTickBehavior};

/// Length of one scheduler step
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Produces scheduler ticks
#[async_trait]
pub trait TickSource: Send {
    /// Wait for the next tick; `false` once the source is exhausted
    async fn next_tick(&mut self) -> bool;
}

/// Wall-clock ticks from a tokio interval
///
/// The first tick completes immediately. Late ticks are delayed rather than
/// bursted, so slow work shifts the schedule instead of catching up.
pub struct IntervalTicks {
    ticker: Interval,
}

impl IntervalTicks {
    pub fn new(period: Duration) -> Self {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { ticker }
    }
}

impl Default for IntervalTicks {
    fn default() -> Self {
        Self::new(TICK_INTERVAL)
    }
}

#[async_trait]
impl TickSource for IntervalTicks {
    async fn next_tick(&mut self) -> bool {
        self.ticker.tick().await;
        true
    }
}
