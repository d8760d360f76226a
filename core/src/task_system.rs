//! Task registry: creation, per-tick evaluation and completion.
//!
//! Tasks live in the state store. This module validates what goes in
//! and decides which transitions to dispatch; it keeps no task state of
//! its own.

use crate::{
    error::{ShiftError, ShiftResult},
    event::ShiftEvent,
    rng::TaskIdGenerator,
    store::{Action, StateStore},
    subsystem::{ShiftSubsystem, TickContext},
    task::{evaluate, Task, TaskSpec, TaskStatus},
    timecode::{resolve_expiry, GameTime, ShiftWindow},
    types::{TaskId, Tick},
};
use std::sync::Arc;

pub struct TaskSystem {
    ids: TaskIdGenerator,
}

impl TaskSystem {
    pub fn new(seed: u64) -> Self {
        Self { ids: TaskIdGenerator::new(seed) }
    }

    /// Validate a spec and register it as a `not-yet` task.
    pub fn create_task(&mut self, spec: TaskSpec, store: &mut StateStore) -> ShiftResult<Task> {
        let name = spec
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or(ShiftError::MissingTaskField { field: "name" })?;
        let scheduled = spec
            .scheduled_time
            .ok_or(ShiftError::MissingTaskField { field: "scheduledTime" })?
            .resolve(None)?;
        let patient_id = spec
            .patient_id
            .filter(|p| !p.trim().is_empty())
            .ok_or(ShiftError::MissingTaskField { field: "patientId" })?;

        let id = match spec.id.filter(|id| !id.trim().is_empty()) {
            Some(id) => id,
            None => self.ids.next_id(),
        };
        if store.task(&id).is_some() {
            return Err(ShiftError::DuplicateTask { id });
        }

        let task = Task {
            id,
            kind: spec.kind,
            name,
            scheduled_time: scheduled,
            expire_time: spec.expire_time.map(|e| resolve_expiry(scheduled, e)),
            duration_minutes: spec.duration_minutes,
            status: TaskStatus::NotYet,
            patient_id,
            metadata: spec.metadata,
        };
        log::debug!(
            "registered task {} '{}' at {} (expires {:?})",
            task.id, task.name, task.scheduled_time, task.expire_time.map(|t| t.to_string())
        );
        store.dispatch(Action::RegisterTask { task: task.clone() });
        Ok(task)
    }

    /// Evaluate every task against one time snapshot and dispatch the
    /// resulting transitions. Tasks are independent, so order is irrelevant.
    pub fn process_tasks(
        &self,
        now: GameTime,
        window: &ShiftWindow,
        tick: Tick,
        store: &mut StateStore,
    ) -> Vec<ShiftEvent> {
        let tasks = Arc::clone(&store.state().tasks);
        let mut events = Vec::new();

        for task in tasks.values() {
            let Some(next) = evaluate(task, now, window) else { continue };
            let task_id = task.id.clone();
            match next {
                TaskStatus::Active => {
                    log::debug!("tick={tick} task {task_id} active at {now}");
                    store.dispatch(Action::ActivateTask { task_id: task_id.clone() });
                    events.push(ShiftEvent::TaskActivated { tick, task_id, at: now });
                }
                TaskStatus::Overdue => {
                    log::debug!("tick={tick} task {task_id} overdue at {now}");
                    store.dispatch(Action::ExpireTask { task_id: task_id.clone() });
                    events.push(ShiftEvent::TaskOverdue { tick, task_id, at: now });
                }
                TaskStatus::NotYet | TaskStatus::Completed => {}
            }
        }
        events
    }

    /// Complete an active task. Anything else is rejected and changes nothing.
    pub fn complete_task(&self, task_id: &str, store: &mut StateStore) -> ShiftResult<Task> {
        let Some(task) = store.task(task_id) else {
            log::warn!("cannot complete task {task_id}: not registered");
            return Err(ShiftError::UnknownTask { id: TaskId::from(task_id) });
        };
        if task.status != TaskStatus::Active {
            log::warn!("cannot complete task {task_id}: status is {}", task.status);
            return Err(ShiftError::TaskNotActive {
                id:     task.id.clone(),
                status: task.status.to_string(),
            });
        }
        store.dispatch(Action::CompleteTask { task_id: TaskId::from(task_id) });
        store
            .task(task_id)
            .cloned()
            .ok_or_else(|| ShiftError::UnknownTask { id: TaskId::from(task_id) })
    }
}

impl ShiftSubsystem for TaskSystem {
    fn name(&self) -> &'static str { "tasks" }

    fn update(
        &mut self,
        ctx: &TickContext,
        _events_in: &[ShiftEvent],
        store: &mut StateStore,
    ) -> ShiftResult<Vec<ShiftEvent>> {
        Ok(self.process_tasks(ctx.now, &ctx.window, ctx.tick, store))
    }

    fn as_any(&self) -> &dyn std::any::Any { self }
}
