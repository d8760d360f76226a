//! Shared primitive types used across the entire simulation.

/// A clock tick. One tick = one in-game second.
pub type Tick = u64;

/// Stable identifier of a task.
pub type TaskId = String;

/// Stable identifier of a patient. Tasks reference patients by id only.
pub type PatientId = String;

/// The canonical shift identifier.
pub type ShiftId = String;

pub const MINUTES_PER_HOUR: u32 = 60;
pub const SECONDS_PER_MINUTE: u32 = 60;
pub const MINUTES_PER_DAY: u32 = 24 * MINUTES_PER_HOUR;

/// Default scheduling grid. Task content is authored in quarter-hour blocks.
pub const QUARTER_HOUR: u32 = 15;
