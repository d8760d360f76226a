//! Shift engine tests.
//!
//! Tests cover: a full accelerated shift through the driver, the
//! game-over callback, the event cascade per tick, player commands,
//! pausing, scenarios and extension subsystems.

use nightshift_core::{
    command::PlayerCommand,
    config::{Scenario, ShiftConfig},
    driver::{NoDelay, ShiftDriver},
    engine::ShiftEngine,
    error::{ShiftError, ShiftResult},
    event::ShiftEvent,
    patient::Patient,
    store::{ShiftStatus, StateKey, StateStore},
    subsystem::{ShiftSubsystem, TickContext},
    task::{TaskSpec, TaskStatus},
    timecode::{GameTime, TimeSpec},
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

fn t(hhmm: u16) -> GameTime {
    GameTime::new(hhmm).unwrap()
}

fn ten_minute_shift() -> ShiftConfig {
    ShiftConfig::from_query("speed-factor=60&shift-starts=19:00&shift-duration=10").unwrap()
}

fn engine_with_tasks(config: ShiftConfig) -> ShiftEngine {
    // RUST_LOG=debug cargo test shows the cascade.
    let _ = env_logger::builder().is_test(true).try_init();
    let mut engine = ShiftEngine::new("engine-test".to_string(), 42);
    engine.register_patient(Patient::new("joe", "Joe Johnson")).unwrap();
    engine
        .create_task(TaskSpec::new("Assessment", t(1900), "joe").with_id("assess").expiring(TimeSpec::At(t(1905))))
        .unwrap();
    engine
        .create_task(TaskSpec::new("Oxycodone", t(1905), "joe").with_id("med"))
        .unwrap();
    engine.initialize(config).unwrap();
    engine
}

#[test]
fn ten_minute_shift_runs_six_hundred_ticks() {
    let mut engine = engine_with_tasks(ten_minute_shift());
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    engine.set_game_over_callback(move |report| {
        assert_eq!(report.ended_at, GameTime::new(1910).unwrap());
        assert_eq!(report.ticks, 600);
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let delivered = ShiftDriver::new(NoDelay).run(&mut engine, |_, _| Ok(())).unwrap();

    assert_eq!(delivered, 600);
    assert!(engine.is_terminated());
    assert!(!engine.is_running());
    assert_eq!(engine.current_time().unwrap(), t(1910));
    assert_eq!(engine.store().current_time(), Some(t(1910)));
    assert_eq!(engine.store().shift_status(), ShiftStatus::GameOver);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert_eq!(engine.run_ticks(100).unwrap(), 0, "a finished shift delivers nothing");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn tasks_activate_and_expire_during_the_shift() {
    let mut engine = engine_with_tasks(ten_minute_shift());
    engine.run_ticks(600).unwrap();

    assert_eq!(engine.task("assess").unwrap().status, TaskStatus::Overdue);
    assert_eq!(engine.task("med").unwrap().status, TaskStatus::Active);

    let report_types: Vec<&str> = engine
        .event_log()
        .entries()
        .iter()
        .map(|e| e.event_type.as_str())
        .filter(|ty| ty.starts_with("task_") || *ty == "shift_ended")
        .collect();
    assert_eq!(report_types, vec!["task_activated", "task_activated", "task_overdue", "shift_ended"]);
}

#[test]
fn first_tick_emits_checkpoint_and_activation_in_order() {
    let mut engine = engine_with_tasks(ShiftConfig::new(t(1900), 60, 60.0).unwrap());
    let events = engine.tick().unwrap();
    let types: Vec<&str> = events.iter().map(ShiftEvent::type_name).collect();
    assert_eq!(
        types,
        vec!["tick_started", "time_updated", "checkpoint_reached", "task_activated", "tick_completed"]
    );

    match &events[2] {
        ShiftEvent::CheckpointReached { time, scheduled, .. } => {
            assert_eq!(*time, t(1900));
            // 19:05 falls in the 19:00 quarter hour.
            assert_eq!(scheduled, &vec!["assess".to_string(), "med".to_string()]);
        }
        other => panic!("expected checkpoint, got {other:?}"),
    }
    assert_eq!(engine.store().state().last_checkpoint, Some(t(1900)));
}

#[test]
fn completing_an_active_task() {
    let mut engine = engine_with_tasks(ten_minute_shift());
    assert!(matches!(
        engine.complete_task("med"),
        Err(ShiftError::TaskNotActive { .. })
    ));

    engine.run_ticks(1).unwrap();
    let events = engine
        .apply_command(PlayerCommand::CompleteTask { task_id: "assess".into() })
        .unwrap();
    assert!(matches!(events.as_slice(), [ShiftEvent::TaskCompleted { .. }]));

    engine.run_ticks(599).unwrap();
    assert_eq!(engine.task("assess").unwrap().status, TaskStatus::Completed);
    assert_eq!(engine.event_log().entries().iter().filter(|e| e.event_type == "task_overdue").count(), 0);
}

#[test]
fn pause_freezes_the_shift() {
    let mut engine = engine_with_tasks(ten_minute_shift());
    engine.run_ticks(30).unwrap();

    assert!(engine.pause().unwrap());
    assert!(!engine.pause().unwrap());
    assert_eq!(engine.store().shift_status(), ShiftStatus::Paused);

    let before = engine.poll().unwrap();
    assert!(engine.tick().unwrap().is_empty());
    assert_eq!(engine.poll().unwrap(), before);

    let events = engine.apply_command(PlayerCommand::TogglePause).unwrap();
    assert!(matches!(events.as_slice(), [ShiftEvent::ShiftResumed { .. }]));
    assert!(!engine.is_paused());
    assert_eq!(engine.store().shift_status(), ShiftStatus::Running);
}

#[test]
fn driver_tick_limit_stops_a_paused_shift() {
    let mut engine = engine_with_tasks(ten_minute_shift());
    engine.pause().unwrap();
    let delivered = ShiftDriver::new(NoDelay)
        .with_tick_limit(25)
        .run(&mut engine, |_, _| Ok(()))
        .unwrap();
    assert_eq!(delivered, 25);
    assert_eq!(engine.poll().unwrap().seconds_left, 600);
}

#[test]
fn observer_can_issue_commands() {
    let mut engine = engine_with_tasks(ten_minute_shift());
    ShiftDriver::new(NoDelay)
        .run(&mut engine, |engine, events| {
            for event in events {
                if let ShiftEvent::TaskActivated { task_id, .. } = event {
                    engine.complete_task(task_id)?;
                }
            }
            Ok(())
        })
        .unwrap();
    assert!(engine.store().tasks().values().all(|task| task.status == TaskStatus::Completed));
}

#[test]
fn stop_cancels_the_shift_without_game_over() {
    let mut engine = engine_with_tasks(ten_minute_shift());
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    engine.set_game_over_callback(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    engine.run_ticks(10).unwrap();
    engine.stop();
    engine.stop();
    assert_eq!(engine.run_ticks(10).unwrap(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(engine.store().shift_status(), ShiftStatus::Running);
}

#[test]
fn reinitialize_keeps_tasks_and_restarts_clock() {
    let mut engine = engine_with_tasks(ten_minute_shift());
    engine.run_ticks(120).unwrap();
    engine.initialize(ShiftConfig::new(t(2300), 60, 60.0).unwrap()).unwrap();

    assert_eq!(engine.current_tick(), 0);
    assert_eq!(engine.current_time().unwrap(), t(2300));
    assert_eq!(engine.store().tasks().len(), 2);
    assert_eq!(engine.checkpoints().remaining().count(), 4);
}

#[test]
fn tick_before_initialize_fails() {
    let mut engine = ShiftEngine::new("uninit".to_string(), 1);
    assert!(matches!(engine.tick(), Err(ShiftError::ClockNotInitialized)));
    assert!(engine.snapshot().is_err());
}

#[test]
fn store_listeners_see_engine_changes() {
    let mut engine = ShiftEngine::new("listen".to_string(), 1);
    let minutes = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&minutes);
    engine.store_mut().subscribe(StateKey::CurrentTime, move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    engine.initialize(ten_minute_shift()).unwrap();
    engine.run_ticks(600).unwrap();

    // One for initialization, one per game minute.
    assert_eq!(minutes.load(Ordering::SeqCst), 11);
}

#[test]
fn scenario_builds_a_ready_engine() {
    let scenario = Scenario::from_json(
        r#"{
            "shift": { "shiftStart": 1900, "shiftDurationMinutes": 30, "speedFactor": 60 },
            "patients": [
                { "id": "joe", "name": "Joe Johnson", "room": "Room 201-A",
                  "tasks": [ { "id": "m1", "type": "med", "name": "Oxycodone", "scheduledTime": "1915", "expireTime": "+15" } ] }
            ],
            "tasks": [ { "name": "Chart review", "scheduledTime": 1920, "patientId": "joe" } ]
        }"#,
    )
    .unwrap();

    let mut engine = ShiftEngine::from_scenario("scenario".to_string(), 7, &scenario).unwrap();
    assert_eq!(engine.store().patients().len(), 1);
    assert_eq!(engine.store().tasks().len(), 2);
    assert_eq!(engine.task("m1").unwrap().expire_time, Some(t(1930)));

    engine.run_ticks(30 * 60).unwrap();
    assert!(engine.is_terminated());
    assert_eq!(engine.task("m1").unwrap().status, TaskStatus::Active);
}

#[test]
fn snapshot_serializes_for_hosts() {
    let mut engine = engine_with_tasks(ten_minute_shift());
    engine.run_ticks(60).unwrap();
    let snapshot = engine.snapshot().unwrap();
    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["shiftStatus"], "running");
    assert_eq!(json["clock"]["currentTime"], 1901);
    assert_eq!(json["tasks"].as_array().unwrap().len(), 2);
}

// ── Extension subsystems ───────────────────────────────────────────

#[derive(Default)]
struct MinuteCounter {
    minutes_seen: u32,
}

impl ShiftSubsystem for MinuteCounter {
    fn name(&self) -> &'static str { "minute_counter" }

    fn update(
        &mut self,
        ctx: &TickContext,
        events_in: &[ShiftEvent],
        _store: &mut StateStore,
    ) -> ShiftResult<Vec<ShiftEvent>> {
        assert!(matches!(events_in.first(), Some(ShiftEvent::TickStarted { tick }) if *tick == ctx.tick));
        if ctx.seconds == 0 {
            self.minutes_seen += 1;
        }
        Ok(vec![])
    }

    fn as_any(&self) -> &dyn std::any::Any { self }
}

#[test]
fn extension_subsystems_run_every_tick() {
    let mut engine = engine_with_tasks(ten_minute_shift());
    engine.register(Box::new(MinuteCounter::default()));
    engine.run_ticks(600).unwrap();

    let counter = engine.extension::<MinuteCounter>().expect("registered extension");
    assert_eq!(counter.minutes_seen, 10);
}
