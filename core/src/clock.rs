//! Shift clock: owns the countdown, pause state and the one-shot end of shift.
//!
//! One tick advances the shift by exactly one game second. The driver
//! delivers `speed_factor` ticks per real second, so a shift lasts
//! `duration_minutes * 60 / speed_factor` real seconds.

use crate::{
    config::ShiftConfig,
    error::{ShiftError, ShiftResult},
    snapshot::ClockSnapshot,
    timecode::GameTime,
    types::SECONDS_PER_MINUTE,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClockState {
    pub seconds_remaining: u32,
    pub is_paused:         bool,
    pub is_terminated:     bool,
}

/// Where the shift stands after a tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeReading {
    pub time:            GameTime,
    /// Seconds within the current game minute.
    pub seconds:         u8,
    pub elapsed_seconds: u32,
}

impl TimeReading {
    pub fn elapsed_minutes(&self) -> u32 {
        self.elapsed_seconds / SECONDS_PER_MINUTE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockTick {
    /// Paused, stopped or already terminated. Nothing changed.
    Idle,
    Advanced(TimeReading),
    /// The final second of the shift. Returned exactly once per initialization.
    Ended(TimeReading),
}

#[derive(Debug, Clone, Default)]
pub struct ShiftClock {
    config:  Option<ShiftConfig>,
    state:   ClockState,
    running: bool,
}

impl ShiftClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the countdown and arm ticking. Stops a running shift first.
    /// An invalid config is rejected and leaves the clock untouched.
    pub fn initialize(&mut self, config: ShiftConfig) -> ShiftResult<()> {
        config.validate()?;
        if self.running {
            log::debug!("clock re-initialized while running; stopping previous shift");
            self.stop();
        }
        self.state = ClockState {
            seconds_remaining: config.total_seconds(),
            is_paused:         false,
            is_terminated:     false,
        };
        self.config = Some(config);
        self.running = true;
        Ok(())
    }

    /// Advance one game second.
    pub fn tick(&mut self) -> ShiftResult<ClockTick> {
        let config = self.config.as_ref().ok_or(ShiftError::ClockNotInitialized)?;
        if !self.running || self.state.is_paused || self.state.is_terminated {
            return Ok(ClockTick::Idle);
        }

        let Some(remaining) = self.state.seconds_remaining.checked_sub(1) else {
            self.state.is_terminated = true;
            self.running = false;
            return Ok(ClockTick::Idle);
        };
        self.state.seconds_remaining = remaining;
        let elapsed = config.total_seconds() - self.state.seconds_remaining;
        let reading = TimeReading {
            time:            time_after(config.shift_start, elapsed),
            seconds:         (elapsed % SECONDS_PER_MINUTE) as u8,
            elapsed_seconds: elapsed,
        };

        if self.state.seconds_remaining == 0 {
            self.state.is_terminated = true;
            self.running = false;
            return Ok(ClockTick::Ended(reading));
        }
        Ok(ClockTick::Advanced(reading))
    }

    /// Returns true if the clock was running and is now paused.
    pub fn pause(&mut self) -> bool {
        if self.state.is_paused || self.state.is_terminated || self.config.is_none() {
            return false;
        }
        self.state.is_paused = true;
        true
    }

    /// Returns true if the clock was paused and is now running.
    pub fn resume(&mut self) -> bool {
        if !self.state.is_paused || self.state.is_terminated {
            return false;
        }
        self.state.is_paused = false;
        true
    }

    /// Cancel future ticks. Safe to call any number of times.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn config(&self) -> Option<&ShiftConfig> {
        self.config.as_ref()
    }

    pub fn elapsed_seconds(&self) -> Option<u32> {
        self.config
            .as_ref()
            .map(|c| c.total_seconds() - self.state.seconds_remaining)
    }

    /// Derived from the countdown; never stored.
    pub fn current_game_time(&self) -> ShiftResult<GameTime> {
        let config = self.config.as_ref().ok_or(ShiftError::ClockNotInitialized)?;
        Ok(time_after(
            config.shift_start,
            config.total_seconds() - self.state.seconds_remaining,
        ))
    }

    pub fn snapshot(&self) -> ShiftResult<ClockSnapshot> {
        let config = self.config.as_ref().ok_or(ShiftError::ClockNotInitialized)?;
        let total = config.total_seconds();
        let elapsed = total - self.state.seconds_remaining;
        Ok(ClockSnapshot {
            current_time:     time_after(config.shift_start, elapsed),
            seconds_left:     self.state.seconds_remaining,
            is_paused:        self.state.is_paused,
            is_terminated:    self.state.is_terminated,
            progress_percent: elapsed as f64 / total as f64 * 100.0,
        })
    }
}

fn time_after(start: GameTime, elapsed_seconds: u32) -> GameTime {
    GameTime::from_total_minutes(start.total_minutes() + elapsed_seconds / SECONDS_PER_MINUTE)
}
