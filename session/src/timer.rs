use chess::Side;
use std::time::{Duration, Instant};

/// Two chess clocks, one per side, owned by the session.
#[derive(Debug, Clone)]
pub struct ChessClock {
    white_remaining: Duration,
    black_remaining: Duration,
    active_side: Option<Side>,
    last_tick: Instant,
}

/// Clock readings for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSnapshot {
    pub white_remaining_ms: u64,
    pub black_remaining_ms: u64,
    pub active_side: Option<Side>,
}

impl ChessClock {
    /// Both sides start with `initial_time`; no clock runs yet.
    pub fn new(initial_time: Duration) -> Self {
        Self {
            white_remaining: initial_time,
            black_remaining: initial_time,
            active_side: None,
            last_tick: Instant::now(),
        }
    }

    /// Deduct wall time since the last tick from the running clock.
    /// Returns the side whose flag fell on this tick, if any.
    pub fn tick(&mut self) -> Option<Side> {
        let now = Instant::now();
        let elapsed = now - self.last_tick;
        self.last_tick = now;
        self.tick_with_elapsed(elapsed)
    }

    /// Tick with a specific elapsed duration (useful for testing).
    pub fn tick_with_elapsed(&mut self, elapsed: Duration) -> Option<Side> {
        let side = self.active_side?;
        let remaining = match side {
            Side::White => &mut self.white_remaining,
            Side::Black => &mut self.black_remaining,
        };
        if remaining.is_zero() {
            return None;
        }
        *remaining = remaining.saturating_sub(elapsed);
        remaining.is_zero().then_some(side)
    }

    /// Start or switch the clock to the given side.
    pub fn switch_to(&mut self, side: Side) {
        if self.active_side.is_some() {
            self.tick();
        }
        self.last_tick = Instant::now();
        self.active_side = Some(side);
    }

    /// Stop both clocks, keeping the time already used.
    pub fn pause(&mut self) {
        if self.active_side.is_some() {
            self.tick();
        }
        self.active_side = None;
    }

    /// Overwrite both readings and the running side with server-reported
    /// values.
    pub fn sync(&mut self, white: Duration, black: Duration, active_side: Option<Side>) {
        self.white_remaining = white;
        self.black_remaining = black;
        self.active_side = active_side;
        self.last_tick = Instant::now();
    }

    pub fn remaining(&self, side: Side) -> Duration {
        match side {
            Side::White => self.white_remaining,
            Side::Black => self.black_remaining,
        }
    }

    pub fn is_flag_fallen(&self, side: Side) -> bool {
        self.remaining(side).is_zero()
    }

    pub fn active_side(&self) -> Option<Side> {
        self.active_side
    }

    pub fn is_running(&self) -> bool {
        self.active_side.is_some()
    }

    pub fn snapshot(&self) -> ClockSnapshot {
        ClockSnapshot {
            white_remaining_ms: self.white_remaining.as_millis() as u64,
            black_remaining_ms: self.black_remaining.as_millis() as u64,
            active_side: self.active_side,
        }
    }
}

/// Format a duration for display. MM:SS or M:SS.s when under 10 seconds.
pub fn format_time(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;

    if total_secs < 10 {
        let tenths = duration.subsec_millis() / 100;
        format!("{}:{:02}.{}", minutes, seconds, tenths)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clock_is_stopped() {
        let mut clock = ChessClock::new(Duration::from_secs(300));
        assert!(!clock.is_running());
        assert_eq!(clock.tick_with_elapsed(Duration::from_secs(10)), None);
        assert_eq!(clock.remaining(Side::White), Duration::from_secs(300));
    }

    #[test]
    fn test_only_active_side_runs() {
        let mut clock = ChessClock::new(Duration::from_secs(60));
        clock.switch_to(Side::Black);
        clock.tick_with_elapsed(Duration::from_secs(5));
        assert_eq!(clock.remaining(Side::Black), Duration::from_secs(55));
        assert_eq!(clock.remaining(Side::White), Duration::from_secs(60));
    }

    #[test]
    fn test_flag_reported_once() {
        let mut clock = ChessClock::new(Duration::from_secs(3));
        clock.switch_to(Side::White);
        assert_eq!(
            clock.tick_with_elapsed(Duration::from_secs(10)),
            Some(Side::White)
        );
        assert!(clock.is_flag_fallen(Side::White));
        assert_eq!(clock.tick_with_elapsed(Duration::from_secs(1)), None);
    }

    #[test]
    fn test_sync_overrides_readings() {
        let mut clock = ChessClock::new(Duration::from_secs(300));
        clock.switch_to(Side::White);
        clock.sync(Duration::from_millis(120_500), Duration::from_secs(90), None);
        let snap = clock.snapshot();
        assert_eq!(snap.white_remaining_ms, 120_500);
        assert_eq!(snap.black_remaining_ms, 90_000);
        assert_eq!(snap.active_side, None);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(Duration::from_secs(300)), "5:00");
        assert_eq!(format_time(Duration::from_millis(9_400)), "0:09.4");
    }
}
