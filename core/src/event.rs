//! Events emitted during a shift.
//!
//! RULE: subsystems report what they did ONLY through events.
//! The engine collects them per tick and appends them to the event log.

use crate::{
    error::ShiftResult,
    timecode::GameTime,
    types::{ShiftId, TaskId, Tick},
};
use serde::{Deserialize, Serialize};

/// Every event emitted during simulation.
/// Variants are added per feature; never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShiftEvent {
    // ── Engine events ──────────────────────────────
    ShiftInitialized {
        shift_id:         ShiftId,
        start:            GameTime,
        duration_minutes: u32,
        speed_factor:     f64,
    },
    TickStarted {
        tick: Tick,
    },
    TimeUpdated {
        tick:    Tick,
        time:    GameTime,
        seconds: u8,
    },
    TickCompleted {
        tick: Tick,
    },
    ShiftPaused {
        tick: Tick,
    },
    ShiftResumed {
        tick: Tick,
    },
    ShiftEnded {
        tick: Tick,
        at:   GameTime,
    },

    // ── Scheduling events ──────────────────────────
    CheckpointReached {
        tick:      Tick,
        time:      GameTime,
        /// Tasks whose scheduled time falls on this checkpoint.
        scheduled: Vec<TaskId>,
    },

    // ── Task events ────────────────────────────────
    TaskActivated {
        tick:    Tick,
        task_id: TaskId,
        at:      GameTime,
    },
    TaskOverdue {
        tick:    Tick,
        task_id: TaskId,
        at:      GameTime,
    },
    TaskCompleted {
        tick:    Tick,
        task_id: TaskId,
        at:      Option<GameTime>,
    },
}

impl ShiftEvent {
    /// Stable string name, used for the `event_type` field of the log.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ShiftInitialized { .. }  => "shift_initialized",
            Self::TickStarted { .. }       => "tick_started",
            Self::TimeUpdated { .. }       => "time_updated",
            Self::TickCompleted { .. }     => "tick_completed",
            Self::ShiftPaused { .. }       => "shift_paused",
            Self::ShiftResumed { .. }      => "shift_resumed",
            Self::ShiftEnded { .. }        => "shift_ended",
            Self::CheckpointReached { .. } => "checkpoint_reached",
            Self::TaskActivated { .. }     => "task_activated",
            Self::TaskOverdue { .. }       => "task_overdue",
            Self::TaskCompleted { .. }     => "task_completed",
        }
    }
}

/// One entry of the in-memory event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub seq:        u64,
    pub shift_id:   ShiftId,
    pub tick:       Tick,
    pub source:     String,
    pub event_type: String,
    pub payload:    String, // JSON-serialized ShiftEvent
}

/// Append-only record of everything a shift emitted.
/// Used by the determinism test and replay tooling.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    shift_id: ShiftId,
    entries:  Vec<EventLogEntry>,
}

impl EventLog {
    pub fn new(shift_id: ShiftId) -> Self {
        Self { shift_id, entries: Vec::new() }
    }

    pub fn append(&mut self, tick: Tick, source: &str, events: &[ShiftEvent]) -> ShiftResult<()> {
        for event in events {
            let entry = EventLogEntry {
                seq:        self.entries.len() as u64,
                shift_id:   self.shift_id.clone(),
                tick,
                source:     source.to_string(),
                event_type: event.type_name().to_string(),
                payload:    serde_json::to_string(event)?,
            };
            self.entries.push(entry);
        }
        Ok(())
    }

    pub fn entries(&self) -> &[EventLogEntry] {
        &self.entries
    }

    pub fn for_tick(&self, tick: Tick) -> impl Iterator<Item = &EventLogEntry> + '_ {
        self.entries.iter().filter(move |e| e.tick == tick)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
