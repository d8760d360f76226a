//! shift-runner: headless shift runner for the night shift simulator.
//!
//! Usage:
//!   shift-runner --scenario scenarios/joe_johnson.json --preset demo
//!   shift-runner --query "speed-factor=60&shift-starts=19:00&shift-duration=10" --realtime
//!   shift-runner --scenario scenarios/joe_johnson.json --ipc
//!
//! IPC lines: {"type":"tick","count":60}, {"type":"get_state"},
//!   {"type":"command","command":{"cmd":"complete_task","task_id":"joe-med-1"}}, {"type":"quit"}

use anyhow::Result;
use nightshift_core::{
    command::PlayerCommand,
    config::{Scenario, ShiftConfig, ShiftPreset},
    driver::{NoDelay, Pacer, ShiftDriver, SleepPacer},
    engine::ShiftEngine,
    event::ShiftEvent,
    snapshot::ShiftSnapshot,
    store::{StateKey, StateSlice},
    task::TaskStatus,
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Tick {
        count: u64,
    },
    Command {
        command: PlayerCommand,
    },
    Quit,
}

#[derive(serde::Serialize)]
struct IpcReply<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    state: &'a ShiftSnapshot,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed: u64 = parse_arg(&args, "--seed", default_seed());
    let max_ticks: u64 = parse_arg(&args, "--max-ticks", 0);
    let realtime = args.iter().any(|a| a == "--realtime");
    let ipc = args.iter().any(|a| a == "--ipc");
    let complete_on_activate = args.iter().any(|a| a == "--complete-on-activate");

    let shift_id = string_arg(&args, "--shift-id")
        .unwrap_or_else(|| format!("shift-{}", chrono::Local::now().format("%Y%m%d-%H%M%S")));

    let scenario = match string_arg(&args, "--scenario") {
        Some(path) => Scenario::load(&path)?,
        None => Scenario::default(),
    };
    let config = resolve_config(&args, &scenario)?;

    let mut engine = ShiftEngine::new(shift_id.clone(), seed);
    for entry in &scenario.patients {
        engine.register_patient(entry.patient.clone())?;
    }
    for spec in scenario.task_specs() {
        engine.create_task(spec)?;
    }
    attach_listeners(&mut engine);
    engine.set_game_over_callback(|report| {
        println!(
            "Game over at {}: {} completed, {} overdue, {} open",
            report.ended_at, report.tasks_completed, report.tasks_overdue, report.tasks_open
        );
    });
    engine.initialize(config)?;

    log::info!("Starting shift {shift_id} with seed {seed} ({} tasks)", engine.store().tasks().len());

    if ipc {
        return run_ipc(&mut engine);
    }

    let delivered = if realtime {
        drive(&mut engine, SleepPacer, max_ticks, complete_on_activate)?
    } else {
        drive(&mut engine, NoDelay, max_ticks, complete_on_activate)?
    };

    print_summary(&engine, delivered)
}

fn resolve_config(args: &[String], scenario: &Scenario) -> Result<ShiftConfig> {
    if let Some(query) = string_arg(args, "--query") {
        return Ok(ShiftConfig::from_query(&query)?);
    }
    if let Some(name) = string_arg(args, "--preset") {
        return ShiftPreset::parse(&name)
            .map(ShiftPreset::config)
            .ok_or_else(|| anyhow::anyhow!("Unknown preset '{name}'"));
    }
    Ok(scenario.shift.resolve()?)
}

fn attach_listeners(engine: &mut ShiftEngine) {
    let store = engine.store_mut();
    store.subscribe(StateKey::ShiftStatus, |new, old| {
        if let (StateSlice::ShiftStatus(new), StateSlice::ShiftStatus(old)) = (new, old) {
            log::info!("Shift status changed: {old:?} -> {new:?}");
        }
    });
    store.subscribe(StateKey::CurrentTime, |new, _| {
        if let StateSlice::Time(Some(time)) = new {
            log::debug!("clock {time}");
        }
    });
}

fn drive<P: Pacer>(
    engine: &mut ShiftEngine,
    pacer: P,
    max_ticks: u64,
    complete_on_activate: bool,
) -> Result<u64> {
    let mut driver = ShiftDriver::new(pacer);
    if max_ticks > 0 {
        driver = driver.with_tick_limit(max_ticks);
    }
    let delivered = driver.run(engine, |engine, events| {
        for event in events {
            match event {
                ShiftEvent::CheckpointReached { time, scheduled, .. } if !scheduled.is_empty() => {
                    println!("[{time}] {} task(s) due", scheduled.len());
                }
                ShiftEvent::TaskActivated { task_id, at, .. } => {
                    println!("[{at}] active:    {task_id}");
                    if complete_on_activate {
                        engine.complete_task(task_id)?;
                        println!("[{at}] completed: {task_id}");
                    }
                }
                ShiftEvent::TaskOverdue { task_id, at, .. } => {
                    println!("[{at}] overdue:   {task_id}");
                }
                _ => {}
            }
        }
        Ok(())
    })?;
    Ok(delivered)
}

fn run_ipc(engine: &mut ShiftEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let cmd: IpcCommand = match serde_json::from_str(&line) {
            Ok(cmd) => cmd,
            Err(e) => {
                log::warn!("Unknown IPC command: {e}");
                continue;
            }
        };

        let error = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => None,
            IpcCommand::Tick { count } => engine.run_ticks(count).err().map(|e| e.to_string()),
            IpcCommand::Command { command } => engine.apply_command(command).err().map(|e| e.to_string()),
        };
        let state = engine.snapshot()?;
        writeln!(stdout, "{}", serde_json::to_string(&IpcReply { error, state: &state })?)?;
        stdout.flush()?;
    }
    Ok(())
}

fn print_summary(engine: &ShiftEngine, delivered: u64) -> Result<()> {
    let clock = engine.poll()?;
    let tasks = engine.store().tasks();
    let count = |status: TaskStatus| tasks.values().filter(|t| t.status == status).count();

    println!("=== SHIFT SUMMARY ===");
    println!("  shift_id:       {}", engine.shift_id);
    println!("  ticks:          {delivered}");
    println!("  clock:          {}", clock.current_time);
    println!("  progress:       {:.1}%", clock.progress_percent);
    println!("  status:         {:?}", engine.store().shift_status());
    println!("  tasks:          {}", tasks.len());
    println!("  completed:      {}", count(TaskStatus::Completed));
    println!("  overdue:        {}", count(TaskStatus::Overdue));
    println!("  still active:   {}", count(TaskStatus::Active));
    println!("  not yet due:    {}", count(TaskStatus::NotYet));

    println!();
    println!("=== TASKS ===");
    for task in tasks.values() {
        let expiry = task.expire_time.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<24} {:<10} {} (expires {expiry}) {:<9} {}",
            task.id, task.kind.label(), task.scheduled_time, task.status, task.name
        );
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg(args: &[String], flag: &str) -> Option<String> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].clone())
}

fn default_seed() -> u64 {
    chrono::Local::now().timestamp() as u64
}
