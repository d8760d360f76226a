//! Subsystem trait.
//!
//! RULE: every per-tick reaction implements ShiftSubsystem.
//! The engine calls update() on each subsystem in a fixed order
//! (documented in engine.rs), once per advancing tick, after the
//! clock has published the new time.

use crate::{
    error::ShiftResult,
    event::ShiftEvent,
    store::StateStore,
    timecode::{GameTime, ShiftWindow},
    types::Tick,
};
use std::any::Any;

/// The time snapshot every subsystem sees for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickContext {
    pub tick:            Tick,
    pub now:             GameTime,
    pub seconds:         u8,
    pub elapsed_minutes: u32,
    pub window:          ShiftWindow,
}

/// The contract every subsystem must fulfill.
pub trait ShiftSubsystem: Send {
    /// Unique stable name for this subsystem.
    fn name(&self) -> &'static str;

    /// Called once per advancing tick by the engine.
    ///
    /// - `ctx`:       the tick's time snapshot
    /// - `events_in`: events emitted earlier this tick
    /// - `store`:     the shift's state store; mutate only via dispatch
    ///
    /// Returns new events to add to the tick's event log.
    fn update(
        &mut self,
        ctx: &TickContext,
        events_in: &[ShiftEvent],
        store: &mut StateStore,
    ) -> ShiftResult<Vec<ShiftEvent>>;

    /// For downcasting in tests and tooling only.
    fn as_any(&self) -> &dyn Any;
}
