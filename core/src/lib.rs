//! Night shift simulator core: an accelerated shift clock, quarter-hour
//! checkpoints, the task lifecycle and the store that publishes it all.

pub mod checkpoint;
pub mod clock;
pub mod command;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod event;
pub mod patient;
pub mod rng;
pub mod snapshot;
pub mod store;
pub mod subsystem;
pub mod task;
pub mod task_system;
pub mod timecode;
pub mod types;
