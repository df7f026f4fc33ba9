use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Clock settings for a remote game, written `minutes+increment` (`5+0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeControl {
    pub time: Duration,
    pub increment: Duration,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid time control: {0}")]
pub struct InvalidTimeControl(pub String);

impl TimeControl {
    pub fn limit_secs(&self) -> u64 {
        self.time.as_secs()
    }

    pub fn increment_secs(&self) -> u64 {
        self.increment.as_secs()
    }
}

impl Default for TimeControl {
    fn default() -> Self {
        Self {
            time: Duration::from_secs(5 * 60),
            increment: Duration::ZERO,
        }
    }
}

impl FromStr for TimeControl {
    type Err = InvalidTimeControl;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidTimeControl(s.to_string());
        let (time, increment) = s.trim().split_once('+').ok_or_else(invalid)?;
        // Bare numbers: minutes for the base time, seconds for the increment.
        let time = parse_duration(time, 60).ok_or_else(invalid)?;
        let increment = parse_duration(increment, 1).ok_or_else(invalid)?;
        Ok(TimeControl { time, increment })
    }
}

impl std::fmt::Display for TimeControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}+{}", self.time.as_secs() / 60, self.increment.as_secs())
    }
}

fn parse_duration(s: &str, bare_unit_secs: u64) -> Option<Duration> {
    let (value, unit_secs) = if let Some(v) = s.strip_suffix("ms") {
        (v, 0.001)
    } else if let Some(v) = s.strip_suffix('s') {
        (v, 1.0)
    } else if let Some(v) = s.strip_suffix('m') {
        (v, 60.0)
    } else if let Some(v) = s.strip_suffix('h') {
        (v, 3600.0)
    } else {
        (s, bare_unit_secs as f64)
    };

    let value: f64 = value.parse().ok()?;
    if value.is_sign_negative() {
        return None;
    }
    // Out-of-range and non-finite values are rejected rather than overflowing
    Duration::try_from_secs_f64(value * unit_secs).ok()
}
