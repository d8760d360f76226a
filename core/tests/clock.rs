//! Shift clock tests.
//!
//! Tests cover: ticking before initialization, the one-second countdown,
//! pause and resume, the single end-of-shift tick and stopping.

use nightshift_core::{
    clock::{ClockTick, ShiftClock},
    config::ShiftConfig,
    error::ShiftError,
    timecode::GameTime,
};

fn config(start: u16, minutes: u32) -> ShiftConfig {
    ShiftConfig::new(GameTime::new(start).unwrap(), minutes, 60.0).expect("valid config")
}

#[test]
fn tick_before_initialize_is_an_error() {
    let mut clock = ShiftClock::new();
    assert!(matches!(clock.tick(), Err(ShiftError::ClockNotInitialized)));
    assert!(clock.current_game_time().is_err());
    assert!(!clock.is_running());
}

#[test]
fn invalid_config_is_rejected_at_initialize() {
    let mut clock = ShiftClock::new();
    let zero_length = ShiftConfig { shift_duration_minutes: 0, ..ShiftConfig::default() };
    assert!(matches!(clock.initialize(zero_length), Err(ShiftError::InvalidConfig { .. })));

    let stalled = ShiftConfig { speed_factor: 0.0, ..ShiftConfig::default() };
    assert!(clock.initialize(stalled).is_err());

    assert!(!clock.is_running());
    assert!(matches!(clock.tick(), Err(ShiftError::ClockNotInitialized)));
}

#[test]
fn rejected_reinitialize_keeps_the_running_shift() {
    let mut clock = ShiftClock::new();
    clock.initialize(config(1900, 10)).unwrap();
    clock.tick().unwrap();

    let zero_length = ShiftConfig { shift_duration_minutes: 0, ..ShiftConfig::default() };
    assert!(clock.initialize(zero_length).is_err());
    assert!(clock.is_running());
    assert_eq!(clock.state().seconds_remaining, 599);
    assert!(matches!(clock.tick().unwrap(), ClockTick::Advanced(_)));
}

#[test]
fn countdown_advances_one_second_per_tick() {
    let mut clock = ShiftClock::new();
    clock.initialize(config(1900, 10)).unwrap();
    assert_eq!(clock.state().seconds_remaining, 600);

    for _ in 0..59 {
        clock.tick().unwrap();
    }
    assert_eq!(clock.current_game_time().unwrap(), GameTime::new(1900).unwrap());

    match clock.tick().unwrap() {
        ClockTick::Advanced(reading) => {
            assert_eq!(reading.time, GameTime::new(1901).unwrap());
            assert_eq!(reading.seconds, 0);
            assert_eq!(reading.elapsed_seconds, 60);
            assert_eq!(reading.elapsed_minutes(), 1);
        }
        other => panic!("expected an advancing tick, got {other:?}"),
    }
    assert_eq!(clock.state().seconds_remaining, 540);
}

#[test]
fn paused_clock_does_not_advance() {
    let mut clock = ShiftClock::new();
    clock.initialize(config(1900, 10)).unwrap();
    clock.tick().unwrap();

    assert!(clock.pause());
    assert!(!clock.pause(), "pausing twice is a no-op");
    assert_eq!(clock.tick().unwrap(), ClockTick::Idle);
    assert_eq!(clock.state().seconds_remaining, 599);

    assert!(clock.resume());
    assert!(!clock.resume(), "resuming a running clock is a no-op");
    clock.tick().unwrap();
    assert_eq!(clock.state().seconds_remaining, 598);
}

#[test]
fn final_tick_ends_exactly_once() {
    let mut clock = ShiftClock::new();
    clock.initialize(config(1900, 1)).unwrap();

    let mut ended = 0;
    for _ in 0..120 {
        if let ClockTick::Ended(reading) = clock.tick().unwrap() {
            ended += 1;
            assert_eq!(reading.time, GameTime::new(1901).unwrap());
        }
    }
    assert_eq!(ended, 1);
    let state = clock.state();
    assert!(state.is_terminated);
    assert_eq!(state.seconds_remaining, 0);
    assert!(!clock.is_running());
    assert!(!clock.pause(), "a finished shift cannot be paused");
}

#[test]
fn stop_cancels_future_ticks() {
    let mut clock = ShiftClock::new();
    clock.initialize(config(1900, 10)).unwrap();
    clock.tick().unwrap();
    clock.stop();
    clock.stop();
    assert_eq!(clock.tick().unwrap(), ClockTick::Idle);
    assert_eq!(clock.state().seconds_remaining, 599);
}

#[test]
fn reinitialize_resets_countdown() {
    let mut clock = ShiftClock::new();
    clock.initialize(config(1900, 10)).unwrap();
    for _ in 0..30 {
        clock.tick().unwrap();
    }
    clock.initialize(config(2300, 120)).unwrap();
    assert_eq!(clock.state().seconds_remaining, 7200);
    assert!(clock.is_running());
    assert_eq!(clock.current_game_time().unwrap(), GameTime::new(2300).unwrap());
}

#[test]
fn game_time_wraps_past_midnight() {
    let mut clock = ShiftClock::new();
    clock.initialize(config(2359, 10)).unwrap();
    for _ in 0..60 {
        clock.tick().unwrap();
    }
    assert_eq!(clock.current_game_time().unwrap(), GameTime::MIDNIGHT);
}

#[test]
fn snapshot_reports_progress() {
    let mut clock = ShiftClock::new();
    clock.initialize(config(1900, 10)).unwrap();
    for _ in 0..150 {
        clock.tick().unwrap();
    }
    let snap = clock.snapshot().unwrap();
    assert_eq!(snap.seconds_left, 450);
    assert!((snap.progress_percent - 25.0).abs() < 1e-9);
    assert!(!snap.is_paused);
    assert!(!snap.is_terminated);
}
