//! Free-running millisecond tick.
//!
//! Ticks are `u32` and wrap around, so elapsed time must always be computed
//! with [`elapsed_ms`] rather than plain subtraction.

use std::cell::Cell;
use std::fmt::Debug;
use std::time::{Duration, Instant};

/// Source of a monotonically increasing millisecond counter.
pub trait Clock: Debug {
    fn now_ms(&self) -> u32;
}

/// Milliseconds from `start` to `now`, correct across one counter wrap.
pub fn elapsed_ms(now: u32, start: u32) -> u32 {
    now.wrapping_sub(start)
}

/// Converts a duration into whole ticks, saturating at the counter width.
pub fn duration_to_ms(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

/// Clock backed by [`Instant`], counting from its creation.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u32 {
        // Truncation is the wrap.
        self.origin.elapsed().as_millis() as u32
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u32>,
}

impl ManualClock {
    pub fn new(start: u32) -> Self {
        ManualClock { now: Cell::new(start) }
    }

    pub fn set(&self, now: u32) {
        self.now.set(now);
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_survives_wraparound() {
        assert_eq!(elapsed_ms(5, u32::MAX - 4), 10);
        assert_eq!(elapsed_ms(300, 100), 200);
    }

    #[test]
    fn manual_clock_wraps() {
        let clock = ManualClock::new(u32::MAX);
        clock.advance(2);
        assert_eq!(clock.now_ms(), 1);
    }

    #[test]
    fn saturates_long_durations() {
        assert_eq!(duration_to_ms(Duration::from_millis(4000)), 4000);
        assert_eq!(duration_to_ms(Duration::from_secs(u64::MAX)), u32::MAX);
    }
}
