//! Read-only views handed to hosts and renderers.

use crate::{
    store::ShiftStatus,
    task::Task,
    timecode::GameTime,
    types::{ShiftId, Tick},
};
use serde::{Deserialize, Serialize};

/// The poll view of the clock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClockSnapshot {
    pub current_time:     GameTime,
    pub seconds_left:     u32,
    pub is_paused:        bool,
    pub is_terminated:    bool,
    pub progress_percent: f64,
}

/// Everything a renderer needs to redraw the shift from scratch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShiftSnapshot {
    pub shift_id:     ShiftId,
    pub tick:         Tick,
    pub shift_status: ShiftStatus,
    pub clock:        ClockSnapshot,
    pub tasks:        Vec<Task>,
}

/// Handed to the game-over callback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameOverReport {
    pub shift_id:        ShiftId,
    pub ended_at:        GameTime,
    pub ticks:           Tick,
    pub tasks_completed: usize,
    pub tasks_overdue:   usize,
    /// Tasks still `not-yet` or `active` when the shift ended.
    pub tasks_open:      usize,
}
