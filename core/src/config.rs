use crate::{
    error::{ShiftError, ShiftResult},
    patient::Patient,
    task::TaskSpec,
    timecode::{GameTime, ShiftWindow},
    types::{QUARTER_HOUR, SECONDS_PER_MINUTE},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_SPEED_FACTOR: f64 = 1440.0;
pub const DEFAULT_SHIFT_START: u16 = 1900;
pub const DEFAULT_SHIFT_DURATION_MINUTES: u32 = 12 * 60;

/// Query-string keys accepted by [`ShiftConfig::from_query`].
pub const PARAM_SPEED_FACTOR: &str = "speed-factor";
pub const PARAM_SHIFT_STARTS: &str = "shift-starts";
pub const PARAM_SHIFT_DURATION: &str = "shift-duration";
pub const PARAM_CHECKPOINT_INTERVAL: &str = "checkpoint-interval";

/// Immutable once a shift starts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ShiftConfig {
    pub shift_start:                 GameTime,
    pub shift_duration_minutes:      u32,
    /// Ticks delivered per real second. Each tick is one game second.
    pub speed_factor:                f64,
    #[serde(default = "default_interval")]
    pub checkpoint_interval_minutes: u32,
}

fn default_interval() -> u32 {
    QUARTER_HOUR
}

impl Default for ShiftConfig {
    fn default() -> Self {
        Self {
            shift_start:                 GameTime::new(DEFAULT_SHIFT_START).unwrap_or(GameTime::MIDNIGHT),
            shift_duration_minutes:      DEFAULT_SHIFT_DURATION_MINUTES,
            speed_factor:                DEFAULT_SPEED_FACTOR,
            checkpoint_interval_minutes: QUARTER_HOUR,
        }
    }
}

impl ShiftConfig {
    pub fn new(shift_start: GameTime, shift_duration_minutes: u32, speed_factor: f64) -> ShiftResult<Self> {
        let config = Self {
            shift_start,
            shift_duration_minutes,
            speed_factor,
            checkpoint_interval_minutes: QUARTER_HOUR,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_checkpoint_interval(mut self, minutes: u32) -> ShiftResult<Self> {
        self.checkpoint_interval_minutes = minutes;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> ShiftResult<()> {
        if !self.speed_factor.is_finite() || self.speed_factor <= 0.0 {
            return Err(invalid(format!("speed factor must be > 0, got {}", self.speed_factor)));
        }
        if self.shift_duration_minutes == 0 {
            return Err(invalid("shift duration must be > 0 minutes".to_string()));
        }
        if self.checkpoint_interval_minutes == 0 {
            return Err(invalid("checkpoint interval must be > 0 minutes".to_string()));
        }
        Ok(())
    }

    /// Parse `speed-factor=60&shift-starts=19:00&shift-duration=10`.
    /// Missing keys keep their defaults; unknown keys are ignored.
    pub fn from_query(query: &str) -> ShiftResult<Self> {
        let mut config = Self::default();
        let query = query.trim().trim_start_matches('?');

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = value.trim();
            match key {
                PARAM_SPEED_FACTOR => {
                    config.speed_factor = value
                        .parse()
                        .map_err(|_| invalid(format!("{PARAM_SPEED_FACTOR}: '{value}' is not a number")))?;
                }
                PARAM_SHIFT_STARTS => {
                    config.shift_start = value.parse()?;
                }
                PARAM_SHIFT_DURATION => {
                    config.shift_duration_minutes = value
                        .parse()
                        .map_err(|_| invalid(format!("{PARAM_SHIFT_DURATION}: '{value}' is not a minute count")))?;
                }
                PARAM_CHECKPOINT_INTERVAL => {
                    config.checkpoint_interval_minutes = value
                        .parse()
                        .map_err(|_| invalid(format!("{PARAM_CHECKPOINT_INTERVAL}: '{value}' is not a minute count")))?;
                }
                other => log::debug!("ignoring unknown shift parameter '{other}'"),
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn total_seconds(&self) -> u32 {
        self.shift_duration_minutes * SECONDS_PER_MINUTE
    }

    /// Real time between two ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.speed_factor)
    }

    /// Real time the whole shift takes to play.
    pub fn real_duration(&self) -> Duration {
        Duration::from_secs_f64(self.total_seconds() as f64 / self.speed_factor)
    }

    pub fn window(&self) -> ShiftWindow {
        ShiftWindow::new(self.shift_start, self.shift_duration_minutes)
    }
}

fn invalid(reason: String) -> ShiftError {
    ShiftError::InvalidConfig { reason }
}

// ── Presets ────────────────────────────────────────────────────────

/// Canned shift lengths. Speed is chosen so the shift plays in a fixed
/// number of real minutes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ShiftPreset {
    Demo,          //  1 game hour   in  2 real minutes
    QuickPractice, //  4 game hours  in  5 real minutes
    FullShift,     // 12 game hours  in 30 real minutes
    ExtendedShift, // 16 game hours  in 45 real minutes, afternoon start
}

impl ShiftPreset {
    pub fn config(self) -> ShiftConfig {
        let (start, game_minutes, real_minutes) = match self {
            Self::Demo          => (1900, 60, 2),
            Self::QuickPractice => (1900, 4 * 60, 5),
            Self::FullShift     => (1900, 12 * 60, 30),
            Self::ExtendedShift => (1500, 16 * 60, 45),
        };
        ShiftConfig {
            shift_start:                 GameTime::new(start).unwrap_or(GameTime::MIDNIGHT),
            shift_duration_minutes:      game_minutes,
            speed_factor:                (game_minutes as f64 / real_minutes as f64).round(),
            checkpoint_interval_minutes: QUARTER_HOUR,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "demo"           => Some(Self::Demo),
            "quick-practice" => Some(Self::QuickPractice),
            "full-shift"     => Some(Self::FullShift),
            "extended-shift" => Some(Self::ExtendedShift),
            _ => None,
        }
    }
}

// ── Scenario files ─────────────────────────────────────────────────

/// Optional overrides layered onto [`ShiftConfig::default`] or a preset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftSettings {
    pub preset:                      Option<ShiftPreset>,
    pub speed_factor:                Option<f64>,
    pub shift_start:                 Option<GameTime>,
    pub shift_duration_minutes:      Option<u32>,
    pub checkpoint_interval_minutes: Option<u32>,
}

impl ShiftSettings {
    pub fn resolve(&self) -> ShiftResult<ShiftConfig> {
        let mut config = self.preset.map(ShiftPreset::config).unwrap_or_default();
        if let Some(speed) = self.speed_factor {
            config.speed_factor = speed;
        }
        if let Some(start) = self.shift_start {
            config.shift_start = start;
        }
        if let Some(duration) = self.shift_duration_minutes {
            config.shift_duration_minutes = duration;
        }
        if let Some(interval) = self.checkpoint_interval_minutes {
            config.checkpoint_interval_minutes = interval;
        }
        config.validate()?;
        Ok(config)
    }
}

/// A patient together with the tasks authored for them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientScenario {
    #[serde(flatten)]
    pub patient: Patient,
    #[serde(default)]
    pub tasks:   Vec<TaskSpec>,
}

/// Everything a host needs to set up one shift.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub shift:    ShiftSettings,
    #[serde(default)]
    pub patients: Vec<PatientScenario>,
    /// Tasks not nested under a patient. They must carry `patientId`.
    #[serde(default)]
    pub tasks:    Vec<TaskSpec>,
}

impl Scenario {
    /// Load a scenario from a JSON file.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Self::from_json(&text).map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// All task specs in load order, nested ones stamped with their patient id.
    pub fn task_specs(&self) -> Vec<TaskSpec> {
        let nested = self.patients.iter().flat_map(|p| {
            p.tasks.iter().cloned().map(move |mut spec| {
                spec.patient_id.get_or_insert_with(|| p.patient.id.clone());
                spec
            })
        });
        nested.chain(self.tasks.iter().cloned()).collect()
    }
}
