//! Checkpoint scheduler: quarter-hour marks that fire exactly once.
//!
//! Checkpoints are precomputed for the whole shift and consumed front to
//! back. Arrival compares unwrapped minutes (start + elapsed), so a tick
//! past midnight still counts as later than every checkpoint before it.

use crate::{
    error::ShiftResult,
    event::ShiftEvent,
    store::{Action, StateStore},
    subsystem::{ShiftSubsystem, TickContext},
    timecode::{quantize_down, GameTime},
    types::{TaskId, MINUTES_PER_DAY, QUARTER_HOUR},
};
use std::collections::VecDeque;

/// The checkpoint marks of a shift, in arrival order.
///
/// Starts at the quantized shift start and yields
/// `floor(duration / interval)` marks, dropping any that would cross 24:00.
/// Panics if `interval_minutes` is zero.
pub fn build_checkpoints(shift_start: GameTime, shift_duration_minutes: u32, interval_minutes: u32) -> Vec<GameTime> {
    assert!(interval_minutes > 0, "checkpoint interval must be > 0");
    let base = quantize_down(shift_start, interval_minutes).total_minutes();
    (0..shift_duration_minutes / interval_minutes)
        .map(|i| base + i * interval_minutes)
        .take_while(|&minutes| minutes < MINUTES_PER_DAY)
        .map(GameTime::from_total_minutes)
        .collect()
}

#[derive(Debug, Clone)]
pub struct CheckpointScheduler {
    shift_start: GameTime,
    interval:    u32,
    pending:     VecDeque<GameTime>,
}

impl Default for CheckpointScheduler {
    fn default() -> Self {
        Self {
            shift_start: GameTime::MIDNIGHT,
            interval:    QUARTER_HOUR,
            pending:     VecDeque::new(),
        }
    }
}

impl CheckpointScheduler {
    pub fn new(shift_start: GameTime, shift_duration_minutes: u32, interval_minutes: u32) -> Self {
        Self {
            shift_start,
            interval: interval_minutes,
            pending:  build_checkpoints(shift_start, shift_duration_minutes, interval_minutes).into(),
        }
    }

    /// Consume the earliest checkpoint if the shift has reached it.
    /// At most one per call.
    pub fn check_arrival(&mut self, elapsed_game_minutes: u32) -> Option<GameTime> {
        let reached = self.shift_start.total_minutes() + elapsed_game_minutes;
        let mark = reached - reached % self.interval;
        match self.pending.front() {
            Some(next) if next.total_minutes() <= mark => self.pending.pop_front(),
            _ => None,
        }
    }

    pub fn remaining(&self) -> impl Iterator<Item = GameTime> + '_ {
        self.pending.iter().copied()
    }

    pub fn is_exhausted(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }
}

impl ShiftSubsystem for CheckpointScheduler {
    fn name(&self) -> &'static str { "checkpoint" }

    fn update(
        &mut self,
        ctx: &TickContext,
        _events_in: &[ShiftEvent],
        store: &mut StateStore,
    ) -> ShiftResult<Vec<ShiftEvent>> {
        let Some(time) = self.check_arrival(ctx.elapsed_minutes) else {
            return Ok(vec![]);
        };

        let scheduled: Vec<TaskId> = store
            .tasks()
            .values()
            .filter(|task| quantize_down(task.scheduled_time, self.interval) == time)
            .map(|task| task.id.clone())
            .collect();
        log::debug!("tick={} checkpoint {time} reached ({} tasks scheduled)", ctx.tick, scheduled.len());

        store.dispatch(Action::ReachCheckpoint { time });
        Ok(vec![ShiftEvent::CheckpointReached { tick: ctx.tick, time, scheduled }])
    }

    fn as_any(&self) -> &dyn std::any::Any { self }
}
