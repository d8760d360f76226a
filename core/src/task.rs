//! Task model and the per-task lifecycle rules.
//!
//! LIFECYCLE (forward only, never reverts):
//!   NotYet → Active     first time now ≥ scheduled
//!   Active → Overdue    first time now > expiry (if any)
//!   Active → Completed  explicit completion only
//! Completed and Overdue are terminal.

use crate::{
    timecode::{GameTime, ShiftWindow, TimeSpec},
    types::{PatientId, TaskId},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, fmt};

/// Free-form content data carried through untouched (dose, route, notes...).
pub type TaskMetadata = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskKind {
    Medication,
    Assessment,
    Procedure,
    #[default]
    Default,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Medication => "medication",
            Self::Assessment => "assessment",
            Self::Procedure  => "procedure",
            Self::Default    => "default",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Medication => "Medication",
            Self::Assessment => "Assessment",
            Self::Procedure  => "Procedure",
            Self::Default    => "Task",
        }
    }
}

impl From<&str> for TaskKind {
    /// Unknown tags fall back to `Default`.
    fn from(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "med" | "medication" => Self::Medication,
            "assessment"         => Self::Assessment,
            "procedure"          => Self::Procedure,
            _                    => Self::Default,
        }
    }
}

impl From<String> for TaskKind {
    fn from(tag: String) -> Self {
        TaskKind::from(tag.as_str())
    }
}

impl From<TaskKind> for String {
    fn from(kind: TaskKind) -> String {
        kind.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    NotYet,
    Active,
    Completed,
    Overdue,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Overdue)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotYet    => "not-yet",
            Self::Active    => "active",
            Self::Completed => "completed",
            Self::Overdue   => "overdue",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id:               TaskId,
    #[serde(rename = "type")]
    pub kind:             TaskKind,
    pub name:             String,
    pub scheduled_time:   GameTime,
    pub expire_time:      Option<GameTime>,
    pub duration_minutes: u32,
    pub status:           TaskStatus,
    pub patient_id:       PatientId,
    #[serde(default)]
    pub metadata:         TaskMetadata,
}

impl Task {
    pub fn with_status(&self, status: TaskStatus) -> Self {
        Self { status, ..self.clone() }
    }
}

/// The status `task` should move to at `now`, if any.
/// Pure: depends only on the task, the time and the shift window.
pub fn evaluate(task: &Task, now: GameTime, window: &ShiftWindow) -> Option<TaskStatus> {
    match task.status {
        TaskStatus::NotYet if window.reached(now, task.scheduled_time) => Some(TaskStatus::Active),
        TaskStatus::Active => task
            .expire_time
            .filter(|&expiry| window.passed(now, expiry))
            .map(|_| TaskStatus::Overdue),
        _ => None,
    }
}

/// A task as supplied by the content layer, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    #[serde(default)]
    pub id:               Option<TaskId>,
    #[serde(default, rename = "type")]
    pub kind:             TaskKind,
    #[serde(default)]
    pub name:             Option<String>,
    #[serde(default, alias = "scheduled")]
    pub scheduled_time:   Option<TimeSpec>,
    #[serde(default, alias = "expire")]
    pub expire_time:      Option<TimeSpec>,
    #[serde(default, alias = "durationMins")]
    pub duration_minutes: u32,
    #[serde(default)]
    pub patient_id:       Option<PatientId>,
    #[serde(default)]
    pub metadata:         TaskMetadata,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, scheduled: GameTime, patient_id: impl Into<PatientId>) -> Self {
        Self {
            name: Some(name.into()),
            scheduled_time: Some(TimeSpec::At(scheduled)),
            patient_id: Some(patient_id.into()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<TaskId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_kind(mut self, kind: TaskKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn expiring(mut self, expire: TimeSpec) -> Self {
        self.expire_time = Some(expire);
        self
    }

    pub fn lasting(mut self, minutes: u32) -> Self {
        self.duration_minutes = minutes;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
