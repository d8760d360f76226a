//! The state store: the single owner of shift state.
//!
//! RULES:
//!   - State changes only through `dispatch(Action)`.
//!   - Reducers are pure: old state + action → new state.
//!   - Reducers allocate a new container only when they change it, so
//!     subscribers are notified only for keys that actually changed.

use crate::{
    error::{ShiftError, ShiftResult},
    patient::Patient,
    task::{Task, TaskStatus},
    timecode::GameTime,
    types::{PatientId, TaskId},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::Arc,
};

pub type TaskMap = BTreeMap<TaskId, Task>;
pub type PatientMap = BTreeMap<PatientId, Patient>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    #[default]
    Initializing,
    Running,
    Paused,
    GameOver,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreState {
    pub shift_status:    ShiftStatus,
    pub current_time:    Option<GameTime>,
    /// Seconds within the current game minute.
    pub clock_seconds:   u8,
    pub is_paused:       bool,
    pub last_checkpoint: Option<GameTime>,
    pub tasks:           Arc<TaskMap>,
    pub patients:        Arc<PatientMap>,
    pub active_task_ids: Arc<BTreeSet<TaskId>>,
}

/// Every mutation the store accepts.
/// Variants are added as features need them; never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum Action {
    InitializeGame {
        start_time: GameTime,
    },
    UpdateTime {
        time:    GameTime,
        #[serde(default)]
        seconds: u8,
    },
    TogglePause,
    ActivateTask {
        task_id: TaskId,
    },
    CompleteTask {
        task_id: TaskId,
    },
    ExpireTask {
        task_id: TaskId,
    },
    RegisterTask {
        task: Task,
    },
    RegisterPatient {
        patient: Patient,
    },
    ReachCheckpoint {
        time: GameTime,
    },
    GameOver,
}

impl Action {
    /// Wire names accepted by [`StateStore::dispatch_named`].
    pub const NAMES: [&'static str; 10] = [
        "INITIALIZE_GAME",
        "UPDATE_TIME",
        "TOGGLE_PAUSE",
        "ACTIVATE_TASK",
        "COMPLETE_TASK",
        "EXPIRE_TASK",
        "REGISTER_TASK",
        "REGISTER_PATIENT",
        "REACH_CHECKPOINT",
        "GAME_OVER",
    ];

    pub fn name(&self) -> &'static str {
        let index = match self {
            Self::InitializeGame { .. }  => 0,
            Self::UpdateTime { .. }      => 1,
            Self::TogglePause            => 2,
            Self::ActivateTask { .. }    => 3,
            Self::CompleteTask { .. }    => 4,
            Self::ExpireTask { .. }      => 5,
            Self::RegisterTask { .. }    => 6,
            Self::RegisterPatient { .. } => 7,
            Self::ReachCheckpoint { .. } => 8,
            Self::GameOver               => 9,
        };
        Self::NAMES[index]
    }
}

/// Compute the next state. Never mutates `state`.
pub fn reduce(state: &StoreState, action: &Action) -> StoreState {
    let mut next = state.clone();
    match action {
        Action::InitializeGame { start_time } => {
            next.shift_status = ShiftStatus::Running;
            next.current_time = Some(*start_time);
            next.clock_seconds = 0;
            next.is_paused = false;
            next.last_checkpoint = None;
        }
        Action::UpdateTime { time, seconds } => {
            next.current_time = Some(*time);
            next.clock_seconds = *seconds;
        }
        Action::TogglePause => {
            if state.shift_status != ShiftStatus::GameOver {
                next.is_paused = !state.is_paused;
                next.shift_status = if next.is_paused {
                    ShiftStatus::Paused
                } else {
                    ShiftStatus::Running
                };
            }
        }
        Action::ActivateTask { task_id } => {
            transition(&mut next, task_id, TaskStatus::NotYet, TaskStatus::Active);
        }
        Action::CompleteTask { task_id } => {
            transition(&mut next, task_id, TaskStatus::Active, TaskStatus::Completed);
        }
        Action::ExpireTask { task_id } => {
            transition(&mut next, task_id, TaskStatus::Active, TaskStatus::Overdue);
        }
        Action::RegisterTask { task } => match next.tasks.get(&task.id) {
            // Registered entries only move through the lifecycle actions.
            Some(existing) => {
                if existing != task {
                    log::warn!("task {} already registered ({}); ignoring re-registration", task.id, existing.status);
                }
            }
            None => {
                Arc::make_mut(&mut next.tasks).insert(task.id.clone(), task.clone());
                track_active(&mut next, &task.id, task.status == TaskStatus::Active);
            }
        },
        Action::RegisterPatient { patient } => {
            if next.patients.get(&patient.id) != Some(patient) {
                Arc::make_mut(&mut next.patients).insert(patient.id.clone(), patient.clone());
            }
        }
        Action::ReachCheckpoint { time } => {
            next.last_checkpoint = Some(*time);
        }
        Action::GameOver => {
            next.shift_status = ShiftStatus::GameOver;
        }
    }
    next
}

/// Move a task `from → to`. Any other current status leaves state untouched.
fn transition(next: &mut StoreState, task_id: &TaskId, from: TaskStatus, to: TaskStatus) {
    let updated = match next.tasks.get(task_id) {
        Some(task) if task.status == from => task.with_status(to),
        _ => return,
    };
    Arc::make_mut(&mut next.tasks).insert(task_id.clone(), updated);
    track_active(next, task_id, to == TaskStatus::Active);
}

fn track_active(next: &mut StoreState, task_id: &TaskId, active: bool) {
    if next.active_task_ids.contains(task_id) != active {
        let ids = Arc::make_mut(&mut next.active_task_ids);
        if active {
            ids.insert(task_id.clone());
        } else {
            ids.remove(task_id);
        }
    }
}

// ── Subscriptions ──────────────────────────────────────────────────

/// What a listener is interested in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StateKey {
    ShiftStatus,
    CurrentTime,
    ClockSeconds,
    IsPaused,
    LastCheckpoint,
    Tasks,
    Patients,
    ActiveTaskIds,
    /// One task entry, by id.
    Task(TaskId),
    /// Any change at all. Receives whole states.
    All,
}

/// A view of one key's value, handed to listeners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateSlice<'a> {
    ShiftStatus(ShiftStatus),
    Time(Option<GameTime>),
    Seconds(u8),
    Flag(bool),
    Tasks(&'a TaskMap),
    Patients(&'a PatientMap),
    TaskIds(&'a BTreeSet<TaskId>),
    Task(Option<&'a Task>),
    State(&'a StoreState),
}

impl StateKey {
    fn changed(&self, old: &StoreState, new: &StoreState) -> bool {
        match self {
            Self::ShiftStatus    => old.shift_status != new.shift_status,
            Self::CurrentTime    => old.current_time != new.current_time,
            Self::ClockSeconds   => old.clock_seconds != new.clock_seconds,
            Self::IsPaused       => old.is_paused != new.is_paused,
            Self::LastCheckpoint => old.last_checkpoint != new.last_checkpoint,
            Self::Tasks          => !Arc::ptr_eq(&old.tasks, &new.tasks),
            Self::Patients       => !Arc::ptr_eq(&old.patients, &new.patients),
            Self::ActiveTaskIds  => !Arc::ptr_eq(&old.active_task_ids, &new.active_task_ids),
            Self::Task(id) => {
                !Arc::ptr_eq(&old.tasks, &new.tasks) && old.tasks.get(id) != new.tasks.get(id)
            }
            Self::All => [
                Self::ShiftStatus,
                Self::CurrentTime,
                Self::ClockSeconds,
                Self::IsPaused,
                Self::LastCheckpoint,
                Self::Tasks,
                Self::Patients,
                Self::ActiveTaskIds,
            ]
            .iter()
            .any(|key| key.changed(old, new)),
        }
    }

    fn slice<'a>(&self, state: &'a StoreState) -> StateSlice<'a> {
        match self {
            Self::ShiftStatus    => StateSlice::ShiftStatus(state.shift_status),
            Self::CurrentTime    => StateSlice::Time(state.current_time),
            Self::ClockSeconds   => StateSlice::Seconds(state.clock_seconds),
            Self::IsPaused       => StateSlice::Flag(state.is_paused),
            Self::LastCheckpoint => StateSlice::Time(state.last_checkpoint),
            Self::Tasks          => StateSlice::Tasks(&state.tasks),
            Self::Patients       => StateSlice::Patients(&state.patients),
            Self::ActiveTaskIds  => StateSlice::TaskIds(&state.active_task_ids),
            Self::Task(id)       => StateSlice::Task(state.tasks.get(id)),
            Self::All            => StateSlice::State(state),
        }
    }
}

/// Called with `(new, old)` after a dispatch changed the subscribed key.
pub type Listener = Box<dyn FnMut(StateSlice<'_>, StateSlice<'_>) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id:       SubscriptionId,
    key:      StateKey,
    listener: Listener,
}

#[derive(Default)]
pub struct StateStore {
    state:       StoreState,
    subscribers: Vec<Subscription>,
    next_id:     u64,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an action. Returns true if any part of the state changed.
    pub fn dispatch(&mut self, action: Action) -> bool {
        let next = reduce(&self.state, &action);
        let old = std::mem::replace(&mut self.state, next);
        let changed = StateKey::All.changed(&old, &self.state);
        log::trace!("dispatch {} (changed={changed})", action.name());
        if changed {
            self.notify(&old);
        }
        changed
    }

    /// String-tagged entry point for hosts that speak JSON.
    /// Unknown action types are rejected with a warning and change nothing.
    pub fn dispatch_named(&mut self, action_type: &str, payload: Value) -> ShiftResult<bool> {
        if !Action::NAMES.contains(&action_type) {
            log::warn!("Action {action_type} not found");
            return Err(ShiftError::UnknownAction { name: action_type.to_string() });
        }
        let tagged = match payload {
            Value::Object(mut fields) => {
                fields.insert("type".to_string(), Value::String(action_type.to_string()));
                Value::Object(fields)
            }
            Value::Null => serde_json::json!({ "type": action_type }),
            other => other,
        };
        let action: Action = serde_json::from_value(tagged)?;
        Ok(self.dispatch(action))
    }

    pub fn subscribe(
        &mut self,
        key: StateKey,
        listener: impl FnMut(StateSlice<'_>, StateSlice<'_>) + Send + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscription { id, key, listener: Box::new(listener) });
        id
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn notify(&mut self, old: &StoreState) {
        let new = &self.state;
        for sub in &mut self.subscribers {
            if sub.key.changed(old, new) {
                (sub.listener)(sub.key.slice(new), sub.key.slice(old));
            }
        }
    }

    // ── Accessors ──────────────────────────────────────────────

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn shift_status(&self) -> ShiftStatus {
        self.state.shift_status
    }

    pub fn current_time(&self) -> Option<GameTime> {
        self.state.current_time
    }

    pub fn tasks(&self) -> &TaskMap {
        &self.state.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.state.tasks.get(id)
    }

    pub fn patients(&self) -> &PatientMap {
        &self.state.patients
    }

    pub fn active_task_ids(&self) -> &BTreeSet<TaskId> {
        &self.state.active_task_ids
    }
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("state", &self.state)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
