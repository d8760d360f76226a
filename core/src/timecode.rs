//! Time codec: the compact HHMM game-time representation.
//!
//! RULE: every value of `GameTime` is a valid time of day.
//! Validation happens once, at construction. Everything downstream
//! (quantizing, adding, comparing) operates on validated values and
//! cannot fail.

use crate::{
    error::{ShiftError, ShiftResult},
    types::{MINUTES_PER_DAY, MINUTES_PER_HOUR, QUARTER_HOUR},
};
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A time of day encoded as `hours * 100 + minutes` (1930 = 19:30).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct GameTime(u16);

impl GameTime {
    pub const MIDNIGHT: GameTime = GameTime(0);

    /// Validate an HHMM value. Hours must be < 24 and minutes < 60.
    pub fn new(hhmm: u16) -> ShiftResult<Self> {
        if hhmm / 100 < 24 && hhmm % 100 < 60 {
            Ok(Self(hhmm))
        } else {
            Err(ShiftError::InvalidGameTime { value: hhmm as i64 })
        }
    }

    pub fn from_hm(hours: u32, minutes: u32) -> ShiftResult<Self> {
        if hours < 24 && minutes < MINUTES_PER_HOUR {
            Ok(Self((hours * 100 + minutes) as u16))
        } else {
            Err(ShiftError::InvalidGameTime {
                value: hours as i64 * 100 + minutes as i64,
            })
        }
    }

    /// Build from an absolute minute offset since midnight, wrapping at 24:00.
    pub fn from_total_minutes(minutes: u32) -> Self {
        let minutes = minutes % MINUTES_PER_DAY;
        Self(((minutes / MINUTES_PER_HOUR) * 100 + minutes % MINUTES_PER_HOUR) as u16)
    }

    /// Absolute minutes since midnight, in `0..1440`.
    pub fn total_minutes(self) -> u32 {
        self.hour() * MINUTES_PER_HOUR + self.minute()
    }

    pub fn hour(self) -> u32 {
        (self.0 / 100) as u32
    }

    pub fn minute(self) -> u32 {
        (self.0 % 100) as u32
    }

    /// The raw HHMM integer.
    pub fn hhmm(self) -> u16 {
        self.0
    }

    /// `HH:MM:SS`, the format the clock display uses.
    pub fn format_with_seconds(self, seconds: u8) -> String {
        format!("{:02}:{:02}:{:02}", self.hour(), self.minute(), seconds)
    }
}

impl TryFrom<u16> for GameTime {
    type Error = ShiftError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        GameTime::new(value)
    }
}

impl TryFrom<i64> for GameTime {
    type Error = ShiftError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u16::try_from(value)
            .map_err(|_| ShiftError::InvalidGameTime { value })
            .and_then(GameTime::new)
    }
}

impl From<GameTime> for u16 {
    fn from(t: GameTime) -> u16 {
        t.0
    }
}

impl From<GameTime> for NaiveTime {
    fn from(t: GameTime) -> NaiveTime {
        NaiveTime::from_hms_opt(t.hour(), t.minute(), 0).unwrap_or(NaiveTime::MIN)
    }
}

impl From<NaiveTime> for GameTime {
    /// Seconds are truncated.
    fn from(t: NaiveTime) -> GameTime {
        GameTime::from_total_minutes(t.hour() * MINUTES_PER_HOUR + t.minute())
    }
}

impl fmt::Display for GameTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for GameTime {
    type Err = ShiftError;

    /// Accepts `1930`, `"0715"` and `"19:30"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ShiftError::InvalidTimeExpression { input: s.to_string() };
        if let Some((h, m)) = s.split_once(':') {
            if m.len() != 2 {
                return Err(invalid());
            }
            let hours: u32 = h.parse().map_err(|_| invalid())?;
            let minutes: u32 = m.parse().map_err(|_| invalid())?;
            return GameTime::from_hm(hours, minutes);
        }
        let raw: i64 = s.parse().map_err(|_| invalid())?;
        GameTime::try_from(raw)
    }
}

// ── Arithmetic ─────────────────────────────────────────────────────

/// Round down to the nearest multiple of `interval_minutes` (on absolute minutes).
/// Panics if `interval_minutes` is zero.
pub fn quantize_down(t: GameTime, interval_minutes: u32) -> GameTime {
    assert!(interval_minutes > 0, "quantize interval must be > 0");
    let minutes = t.total_minutes();
    GameTime::from_total_minutes(minutes - minutes % interval_minutes)
}

/// Add a (possibly negative) minute delta, wrapping around midnight.
pub fn add_minutes(t: GameTime, delta_minutes: i32) -> GameTime {
    let total = (t.total_minutes() as i64 + delta_minutes as i64).rem_euclid(MINUTES_PER_DAY as i64);
    GameTime::from_total_minutes(total as u32)
}

/// Add minutes, then snap down to the quarter-hour grid.
/// 1900 + 37 → 1930, 2330 + 45 → 0015, 1007 + 120 → 1200.
pub fn timemark_plus_minutes(t: GameTime, minutes: u32) -> GameTime {
    let total = (t.total_minutes() as u64 + minutes as u64) % MINUTES_PER_DAY as u64;
    quantize_down(GameTime::from_total_minutes(total as u32), QUARTER_HOUR)
}

/// Resolve an expiry expression against the task's scheduled time.
/// Relative expiries land on the quarter-hour grid; absolute ones pass through.
pub fn resolve_expiry(scheduled: GameTime, expire: TimeSpec) -> GameTime {
    match expire {
        TimeSpec::At(t) => t,
        TimeSpec::After(minutes) => timemark_plus_minutes(scheduled, minutes),
    }
}

// ── Time expressions ───────────────────────────────────────────────

/// A time as written in task content: an absolute HHMM or `+N` minutes
/// relative to some base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTimeSpec", into = "RawTimeSpec")]
pub enum TimeSpec {
    At(GameTime),
    After(u32),
}

impl TimeSpec {
    pub fn parse(input: &str) -> ShiftResult<Self> {
        let input = input.trim();
        match input.strip_prefix('+') {
            Some(rest) => rest
                .parse::<u32>()
                .map(TimeSpec::After)
                .map_err(|_| ShiftError::InvalidTimeExpression { input: input.to_string() }),
            None => input.parse::<GameTime>().map(TimeSpec::At),
        }
    }

    /// Resolve to an absolute time. Relative specs need `base`.
    pub fn resolve(self, base: Option<GameTime>) -> ShiftResult<GameTime> {
        match (self, base) {
            (TimeSpec::At(t), _) => Ok(t),
            (TimeSpec::After(minutes), Some(base)) => Ok(resolve_expiry(base, TimeSpec::After(minutes))),
            (TimeSpec::After(minutes), None) => Err(ShiftError::RelativeTimeWithoutBase { minutes }),
        }
    }
}

impl From<GameTime> for TimeSpec {
    fn from(t: GameTime) -> Self {
        TimeSpec::At(t)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawTimeSpec {
    Number(i64),
    Text(String),
}

impl TryFrom<RawTimeSpec> for TimeSpec {
    type Error = ShiftError;

    fn try_from(raw: RawTimeSpec) -> Result<Self, Self::Error> {
        match raw {
            RawTimeSpec::Number(n) => GameTime::try_from(n).map(TimeSpec::At),
            RawTimeSpec::Text(s) => TimeSpec::parse(&s),
        }
    }
}

impl From<TimeSpec> for RawTimeSpec {
    fn from(spec: TimeSpec) -> Self {
        match spec {
            TimeSpec::At(t) => RawTimeSpec::Number(t.hhmm() as i64),
            TimeSpec::After(minutes) => RawTimeSpec::Text(format!("+{minutes}")),
        }
    }
}

// ── Shift-relative ordering ────────────────────────────────────────

/// The span of the day a shift covers. Orders times of day by their
/// position in the shift, so a 1900-0700 shift sees 0100 as later than 2300.
///
/// The part of the day the shift never covers is split at its midpoint:
/// the first half counts as after the shift, the second half as before it.
/// A one-hour shift from 1900 puts 2100 after the end and 1800 before the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftWindow {
    pub start: GameTime,
    pub duration_minutes: u32,
}

impl ShiftWindow {
    pub fn new(start: GameTime, duration_minutes: u32) -> Self {
        Self { start, duration_minutes }
    }

    /// Signed minutes from the shift start. Negative means before the shift.
    pub fn offset_of(&self, t: GameTime) -> i64 {
        let day = MINUTES_PER_DAY as i64;
        let covered = (self.duration_minutes as i64).min(day);
        let forward = (t.total_minutes() as i64 - self.start.total_minutes() as i64).rem_euclid(day);
        if forward > covered + (day - covered) / 2 {
            forward - day
        } else {
            forward
        }
    }

    /// `now` is at or after `target` in shift order.
    pub fn reached(&self, now: GameTime, target: GameTime) -> bool {
        self.offset_of(now) >= self.offset_of(target)
    }

    /// `now` is strictly past `target` in shift order.
    pub fn passed(&self, now: GameTime, target: GameTime) -> bool {
        self.offset_of(now) > self.offset_of(target)
    }
}
