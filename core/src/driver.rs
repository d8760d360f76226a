//! The periodic driver: the only thing that delivers ticks.
//!
//! One tick per `1 / speed_factor` real seconds, each tick fully
//! processed before the next wait begins. Timer drift is accepted,
//! not compensated.

use crate::{
    engine::ShiftEngine,
    error::{ShiftError, ShiftResult},
    event::ShiftEvent,
};
use std::time::Duration;

/// Waits out the gap between two ticks.
pub trait Pacer {
    fn wait(&mut self, interval: Duration);
}

/// Real-time pacing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepPacer;

impl Pacer for SleepPacer {
    fn wait(&mut self, interval: Duration) {
        std::thread::sleep(interval);
    }
}

/// Back-to-back ticks, for tests and headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Pacer for NoDelay {
    fn wait(&mut self, _interval: Duration) {}
}

pub struct ShiftDriver<P: Pacer> {
    pacer:      P,
    tick_limit: Option<u64>,
}

impl<P: Pacer> ShiftDriver<P> {
    pub fn new(pacer: P) -> Self {
        Self { pacer, tick_limit: None }
    }

    /// Give up after `limit` deliveries, e.g. when a shift may stay paused.
    pub fn with_tick_limit(mut self, limit: u64) -> Self {
        self.tick_limit = Some(limit);
        self
    }

    /// Drive `engine` until its clock stops. `observer` runs after every
    /// delivered tick (paused ticks included) and may issue commands.
    /// Returns the number of ticks delivered.
    pub fn run(
        &mut self,
        engine: &mut ShiftEngine,
        mut observer: impl FnMut(&mut ShiftEngine, &[ShiftEvent]) -> ShiftResult<()>,
    ) -> ShiftResult<u64> {
        let interval = engine
            .config()
            .map(|c| c.tick_interval())
            .ok_or(ShiftError::ClockNotInitialized)?;

        let mut delivered = 0;
        while engine.is_running() {
            if self.tick_limit.is_some_and(|limit| delivered >= limit) {
                log::warn!("shift {} driver stopped at tick limit {delivered}", engine.shift_id);
                break;
            }
            self.pacer.wait(interval);
            let events = engine.tick()?;
            delivered += 1;
            observer(engine, &events)?;
        }
        Ok(delivered)
    }
}
