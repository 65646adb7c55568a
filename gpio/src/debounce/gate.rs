use std::time::Duration;
use crate::tick::{duration_to_ms, elapsed_ms};

/// Rejects events that follow the last accepted one too closely.
///
/// Used on whole keystrokes, after the scanner, to swallow the repeats a single
/// bouncing press can produce.
#[derive(Debug, Clone)]
pub struct KeyGate {
    last_accept: Option<u32>,
    pub interval: Duration,
}

impl KeyGate {
    pub fn new(interval: Duration) -> Self {
        KeyGate {
            last_accept: None,
            interval,
        }
    }

    /// Decides whether an event at tick `now` passes. Accepted events restart the interval.
    ///
    /// The first event always passes.
    pub fn accept(&mut self, now: u32) -> bool {
        if let Some(last) = self.last_accept {
            if elapsed_ms(now, last) < duration_to_ms(self.interval) {
                return false;
            }
        }
        self.last_accept = Some(now);
        true
    }

    /// Gets the tick of the last accepted event.
    pub fn last_accept(&self) -> Option<u32> {
        self.last_accept
    }
}

impl Default for KeyGate {
    fn default() -> Self {
        Self::new(Duration::from_millis(200))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_event_passes() {
        let mut gate = KeyGate::default();
        assert!(gate.accept(0));
        assert_eq!(gate.last_accept(), Some(0));
    }

    #[test]
    fn rejects_below_interval_accepts_at_it() {
        let mut gate = KeyGate::new(Duration::from_millis(200));
        assert!(gate.accept(1000));
        assert!(!gate.accept(1199));
        assert_eq!(gate.last_accept(), Some(1000), "rejections don't move the window");
        assert!(gate.accept(1200));
        assert!(gate.accept(1500));
    }

    #[test]
    fn survives_tick_wraparound() {
        let mut gate = KeyGate::new(Duration::from_millis(200));
        assert!(gate.accept(u32::MAX - 50));
        assert!(!gate.accept(100));
        assert!(gate.accept(150));
    }
}
