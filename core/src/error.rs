use crate::types::TaskId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShiftError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid game time {value}: expected HHMM in 0000..=2359")]
    InvalidGameTime { value: i64 },

    #[error("Invalid time expression '{input}'")]
    InvalidTimeExpression { input: String },

    #[error("Relative time '+{minutes}' requires a base time")]
    RelativeTimeWithoutBase { minutes: u32 },

    #[error("Invalid shift configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Task is missing required field '{field}'")]
    MissingTaskField { field: &'static str },

    #[error("Task '{id}' is already registered")]
    DuplicateTask { id: TaskId },

    #[error("Task '{id}' not found")]
    UnknownTask { id: TaskId },

    #[error("Task '{id}' cannot be completed while {status}")]
    TaskNotActive { id: TaskId, status: String },

    #[error("Patient is missing an id")]
    MissingPatientId,

    #[error("Action '{name}' not recognized")]
    UnknownAction { name: String },

    #[error("Clock not initialized")]
    ClockNotInitialized,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ShiftResult<T> = Result<T, ShiftError>;
