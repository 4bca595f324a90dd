//! Polling Scheduler
//!
//! Publishes one snapshot every `period` ticks, starting with the very first
//! tick.

use super::ticks::TickSource;
use crate::cloud::Publisher;
use crate::metrics::MetricSampler;
use telemetry_shared::platform;
use tracing::{debug, warn};

/// Tick counter and fixed publishing period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleState {
    tick: u64,
    period: u64,
}

impl ScheduleState {
    /// Create a schedule; a zero period is raised to one tick
    pub fn new(period: u64) -> Self {
        Self {
            tick: 0,
            period: period.max(1),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    /// Whether the current tick publishes, then move to the next tick
    pub fn advance(&mut self) -> bool {
        let due = self.tick % self.period == 0;
        self.tick += 1;
        due
    }
}

impl Default for ScheduleState {
    fn default() -> Self {
        Self::new(platform::DEFAULT_READINGS_PERIOD_SECS)
    }
}

/// Drives sampling and publishing from a tick source
pub struct PollingScheduler {
    state: ScheduleState,
}

impl PollingScheduler {
    /// Create a scheduler publishing every `period` ticks
    pub fn new(period: u64) -> Self {
        Self {
            state: ScheduleState::new(period),
        }
    }

    pub fn state(&self) -> ScheduleState {
        self.state
    }

    /// Run until the tick source is exhausted, returning the publish count
    ///
    /// With a wall-clock tick source this never returns.
    pub async fn run<T, P>(
        &mut self,
        ticks: &mut T,
        sampler: &mut MetricSampler,
        publisher: &P,
    ) -> u64
    where
        T: TickSource,
        P: Publisher,
    {
        let mut published = 0;

        while ticks.next_tick().await {
            let tick = self.state.tick();
            if !self.state.advance() {
                continue;
            }

            let snapshot = sampler.snapshot();
            debug!(
                "Readings: cpu_load={:.1} free_memory={} random={:.4}",
                snapshot.cpu_load, snapshot.free_memory, snapshot.random
            );

            match publisher
                .publish_event(platform::EVENT_STATUS, &snapshot)
                .await
            {
                Ok(()) => published += 1,
                Err(e) => warn!("Failed to publish readings at tick {}: {:#}", tick, e),
            }
        }

        published
    }
}
