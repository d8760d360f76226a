use crate::types::TaskId;
use serde::{Deserialize, Serialize};

/// All player-issued commands.
/// Variants added per feature; never removed or reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PlayerCommand {
    // ── Clock control ─────────────────────────────
    Pause,
    Resume,
    /// Pause if running, resume if paused.
    TogglePause,

    // ── Tasks ─────────────────────────────────────
    CompleteTask { task_id: TaskId },
}
