//! The shift engine: owns one simulation and runs its tick cascade.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Clock advances one game second
//!   2. UPDATE_TIME is dispatched to the store
//!   3. Checkpoint subsystem
//!   4. Task subsystem
//!   5. Extension subsystems, in registration order
//!   6. On the final second: GAME_OVER, then the game-over callback
//!
//! RULES:
//!   - A tick runs to completion before the next one starts.
//!   - Subsystems see the tick's time only through TickContext.
//!   - All state changes go through the store's dispatch.
//!   - Every event is recorded in the event log.

use crate::{
    checkpoint::CheckpointScheduler,
    clock::{ClockTick, ShiftClock},
    command::PlayerCommand,
    config::{Scenario, ShiftConfig},
    error::{ShiftError, ShiftResult},
    event::{EventLog, ShiftEvent},
    patient::Patient,
    snapshot::{ClockSnapshot, GameOverReport, ShiftSnapshot},
    store::{Action, StateStore},
    subsystem::{ShiftSubsystem, TickContext},
    task::{Task, TaskSpec, TaskStatus},
    task_system::TaskSystem,
    timecode::GameTime,
    types::{ShiftId, Tick},
};
use std::slice;

pub type GameOverCallback = Box<dyn FnOnce(&GameOverReport) + Send>;

pub struct ShiftEngine {
    pub shift_id: ShiftId,
    clock:        ShiftClock,
    store:        StateStore,
    checkpoints:  CheckpointScheduler,
    tasks:        TaskSystem,
    extensions:   Vec<Box<dyn ShiftSubsystem>>,
    on_game_over: Option<GameOverCallback>,
    log:          EventLog,
    tick:         Tick,
}

impl ShiftEngine {
    pub fn new(shift_id: ShiftId, seed: u64) -> Self {
        Self {
            clock:        ShiftClock::new(),
            store:        StateStore::new(),
            checkpoints:  CheckpointScheduler::default(),
            tasks:        TaskSystem::new(seed),
            extensions:   Vec::new(),
            on_game_over: None,
            log:          EventLog::new(shift_id.clone()),
            tick:         0,
            shift_id,
        }
    }

    /// Build an engine and start the shift in one call.
    pub fn build(shift_id: ShiftId, seed: u64, config: ShiftConfig) -> ShiftResult<Self> {
        let mut engine = Self::new(shift_id, seed);
        engine.initialize(config)?;
        Ok(engine)
    }

    /// Build an engine from a scenario: patients and tasks registered,
    /// shift initialized and ready to tick.
    pub fn from_scenario(shift_id: ShiftId, seed: u64, scenario: &Scenario) -> ShiftResult<Self> {
        let mut engine = Self::new(shift_id, seed);
        for entry in &scenario.patients {
            engine.register_patient(entry.patient.clone())?;
        }
        for spec in scenario.task_specs() {
            engine.create_task(spec)?;
        }
        engine.initialize(scenario.shift.resolve()?)?;
        Ok(engine)
    }

    /// Start (or restart) the shift. Registered tasks and patients are kept.
    pub fn initialize(&mut self, config: ShiftConfig) -> ShiftResult<()> {
        self.clock.initialize(config)?;
        self.checkpoints = CheckpointScheduler::new(
            config.shift_start,
            config.shift_duration_minutes,
            config.checkpoint_interval_minutes,
        );
        self.tick = 0;
        self.store.dispatch(Action::InitializeGame { start_time: config.shift_start });

        log::info!(
            "shift {} initialized: start={} duration={}min speed={}x ({:.1}s real)",
            self.shift_id,
            config.shift_start,
            config.shift_duration_minutes,
            config.speed_factor,
            config.real_duration().as_secs_f64()
        );
        let event = ShiftEvent::ShiftInitialized {
            shift_id:         self.shift_id.clone(),
            start:            config.shift_start,
            duration_minutes: config.shift_duration_minutes,
            speed_factor:     config.speed_factor,
        };
        self.log.append(0, "engine", slice::from_ref(&event))
    }

    /// Invoked exactly once, on the tick the shift ends.
    pub fn set_game_over_callback(&mut self, callback: impl FnOnce(&GameOverReport) + Send + 'static) {
        self.on_game_over = Some(Box::new(callback));
    }

    /// Register an extension subsystem. Runs after the built-in ones.
    pub fn register(&mut self, subsystem: Box<dyn ShiftSubsystem>) {
        self.extensions.push(subsystem);
    }

    /// Advance one tick. Paused, stopped or finished shifts return no events.
    pub fn tick(&mut self) -> ShiftResult<Vec<ShiftEvent>> {
        let (reading, ended) = match self.clock.tick()? {
            ClockTick::Idle => return Ok(vec![]),
            ClockTick::Advanced(reading) => (reading, false),
            ClockTick::Ended(reading) => (reading, true),
        };
        let window = self
            .clock
            .config()
            .map(ShiftConfig::window)
            .ok_or(ShiftError::ClockNotInitialized)?;

        self.tick += 1;
        let tick = self.tick;
        let mut tick_events = vec![
            ShiftEvent::TickStarted { tick },
            ShiftEvent::TimeUpdated { tick, time: reading.time, seconds: reading.seconds },
        ];
        self.store.dispatch(Action::UpdateTime { time: reading.time, seconds: reading.seconds });
        self.log.append(tick, "engine", &tick_events)?;

        let ctx = TickContext {
            tick,
            now:             reading.time,
            seconds:         reading.seconds,
            elapsed_minutes: reading.elapsed_minutes(),
            window,
        };

        let new_events = self.checkpoints.update(&ctx, &tick_events, &mut self.store)?;
        self.log.append(tick, self.checkpoints.name(), &new_events)?;
        tick_events.extend(new_events);

        let new_events = self.tasks.update(&ctx, &tick_events, &mut self.store)?;
        self.log.append(tick, self.tasks.name(), &new_events)?;
        tick_events.extend(new_events);

        for subsystem in &mut self.extensions {
            let new_events = subsystem.update(&ctx, &tick_events, &mut self.store)?;
            self.log.append(tick, subsystem.name(), &new_events)?;
            tick_events.extend(new_events);
        }

        if ended {
            self.store.dispatch(Action::GameOver);
            let event = ShiftEvent::ShiftEnded { tick, at: reading.time };
            self.log.append(tick, "engine", slice::from_ref(&event))?;
            tick_events.push(event);

            let report = self.game_over_report(reading.time);
            log::info!(
                "shift {} over at {} after {tick} ticks: {} completed, {} overdue, {} open",
                self.shift_id, reading.time, report.tasks_completed, report.tasks_overdue, report.tasks_open
            );
            if let Some(callback) = self.on_game_over.take() {
                callback(&report);
            }
        }

        let event = ShiftEvent::TickCompleted { tick };
        self.log.append(tick, "engine", slice::from_ref(&event))?;
        tick_events.push(event);
        Ok(tick_events)
    }

    /// Deliver up to `n` ticks back to back. Stops early when the shift ends.
    /// Returns the number of ticks delivered.
    pub fn run_ticks(&mut self, n: u64) -> ShiftResult<u64> {
        let mut delivered = 0;
        while delivered < n && self.clock.is_running() {
            self.tick()?;
            delivered += 1;
        }
        Ok(delivered)
    }

    // ── Clock control ──────────────────────────────────────────

    /// Returns true if the shift was running and is now paused.
    pub fn pause(&mut self) -> ShiftResult<bool> {
        if !self.clock.pause() {
            return Ok(false);
        }
        self.store.dispatch(Action::TogglePause);
        log::info!("shift {} paused at tick {}", self.shift_id, self.tick);
        self.log.append(self.tick, "engine", &[ShiftEvent::ShiftPaused { tick: self.tick }])?;
        Ok(true)
    }

    /// Returns true if the shift was paused and is now running.
    pub fn resume(&mut self) -> ShiftResult<bool> {
        if !self.clock.resume() {
            return Ok(false);
        }
        self.store.dispatch(Action::TogglePause);
        log::info!("shift {} resumed at tick {}", self.shift_id, self.tick);
        self.log.append(self.tick, "engine", &[ShiftEvent::ShiftResumed { tick: self.tick }])?;
        Ok(true)
    }

    /// Cancel future ticks. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.clock.stop();
    }

    pub fn apply_command(&mut self, command: PlayerCommand) -> ShiftResult<Vec<ShiftEvent>> {
        let tick = self.tick;
        let events = match command {
            PlayerCommand::Pause => {
                if self.pause()? { vec![ShiftEvent::ShiftPaused { tick }] } else { vec![] }
            }
            PlayerCommand::Resume => {
                if self.resume()? { vec![ShiftEvent::ShiftResumed { tick }] } else { vec![] }
            }
            PlayerCommand::TogglePause => {
                if self.clock.state().is_paused {
                    return self.apply_command(PlayerCommand::Resume);
                }
                return self.apply_command(PlayerCommand::Pause);
            }
            PlayerCommand::CompleteTask { task_id } => {
                self.complete_task(&task_id)?;
                vec![ShiftEvent::TaskCompleted { tick, task_id, at: self.store.current_time() }]
            }
        };
        Ok(events)
    }

    // ── Tasks and patients ─────────────────────────────────────

    pub fn create_task(&mut self, spec: TaskSpec) -> ShiftResult<Task> {
        self.tasks.create_task(spec, &mut self.store)
    }

    pub fn complete_task(&mut self, task_id: &str) -> ShiftResult<Task> {
        let task = self.tasks.complete_task(task_id, &mut self.store)?;
        let event = ShiftEvent::TaskCompleted {
            tick:    self.tick,
            task_id: task.id.clone(),
            at:      self.store.current_time(),
        };
        self.log.append(self.tick, self.tasks.name(), slice::from_ref(&event))?;
        Ok(task)
    }

    pub fn register_patient(&mut self, patient: Patient) -> ShiftResult<()> {
        if patient.id.trim().is_empty() {
            return Err(ShiftError::MissingPatientId);
        }
        log::debug!("registered patient {} ({})", patient.id, patient.name);
        self.store.dispatch(Action::RegisterPatient { patient });
        Ok(())
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.store.task(task_id)
    }

    // ── Views ──────────────────────────────────────────────────

    pub fn poll(&self) -> ShiftResult<ClockSnapshot> {
        self.clock.snapshot()
    }

    pub fn snapshot(&self) -> ShiftResult<ShiftSnapshot> {
        Ok(ShiftSnapshot {
            shift_id:     self.shift_id.clone(),
            tick:         self.tick,
            shift_status: self.store.shift_status(),
            clock:        self.clock.snapshot()?,
            tasks:        self.store.tasks().values().cloned().collect(),
        })
    }

    pub fn current_time(&self) -> ShiftResult<GameTime> {
        self.clock.current_game_time()
    }

    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    pub fn config(&self) -> Option<&ShiftConfig> {
        self.clock.config()
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn is_paused(&self) -> bool {
        self.clock.state().is_paused
    }

    pub fn is_terminated(&self) -> bool {
        self.clock.state().is_terminated
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// For subscribing. Mutate shift state through the engine's methods.
    pub fn store_mut(&mut self) -> &mut StateStore {
        &mut self.store
    }

    pub fn checkpoints(&self) -> &CheckpointScheduler {
        &self.checkpoints
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    /// Find a registered extension subsystem by type.
    pub fn extension<T: 'static>(&self) -> Option<&T> {
        self.extensions
            .iter()
            .find_map(|sub| sub.as_any().downcast_ref::<T>())
    }

    fn game_over_report(&self, ended_at: GameTime) -> GameOverReport {
        let count = |status: TaskStatus| self.store.tasks().values().filter(|t| t.status == status).count();
        let completed = count(TaskStatus::Completed);
        let overdue = count(TaskStatus::Overdue);
        GameOverReport {
            shift_id:        self.shift_id.clone(),
            ended_at,
            ticks:           self.tick,
            tasks_completed: completed,
            tasks_overdue:   overdue,
            tasks_open:      self.store.tasks().len() - completed - overdue,
        }
    }
}
