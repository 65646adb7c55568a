//! Software edge detection for input lines.
//!
//! Stands in for an edge-triggered interrupt controller: each call to
//! [`EdgeDetector::poll`] samples every watched line and reports the ones that
//! went from inactive to active since the previous call.

use std::fmt::{Debug, Formatter};
use crate::{GpioInput, GpioResult};

pub struct EdgeDetector<'a, const N: usize> {
    lines: [(usize, &'a dyn GpioInput); N],
    previous: [bool; N],
}

impl<'a, const N: usize> EdgeDetector<'a, N> {
    /// Creates a detector over `lines`, tagged with the identifiers they are reported under.
    ///
    /// Lines that are already active count as seen, so a key held during start-up
    /// is not reported until it has been released and pressed again.
    pub fn new(lines: [(usize, &'a dyn GpioInput); N]) -> GpioResult<Self> {
        let mut detector = EdgeDetector {
            lines,
            previous: [false; N],
        };
        detector.previous = detector.sample()?;
        Ok(detector)
    }

    fn sample(&self) -> GpioResult<[bool; N]> {
        let mut levels = [false; N];
        for (level, (_, input)) in levels.iter_mut().zip(&self.lines) {
            *level = input.read()?;
        }
        Ok(levels)
    }

    /// Samples every line and calls `on_transition` with the identifier of each
    /// line that became active. Returns how many transitions were reported.
    pub fn poll(&mut self, mut on_transition: impl FnMut(usize)) -> GpioResult<usize> {
        let current = self.sample()?;
        let mut reported = 0;

        for ((&(line, _), was), now) in self.lines.iter().zip(self.previous).zip(current) {
            if now && !was {
                on_transition(line);
                reported += 1;
            }
        }

        self.previous = current;
        Ok(reported)
    }
}

impl<const N: usize> Debug for EdgeDetector<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "EdgeDetector({:?})", self.lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, Default)]
    struct Level(Cell<bool>);

    impl GpioInput for Level {
        fn read(&self) -> GpioResult<bool> {
            Ok(self.0.get())
        }
    }

    fn collect<const N: usize>(detector: &mut EdgeDetector<'_, N>) -> Vec<usize> {
        let mut lines = Vec::new();
        detector.poll(|line| lines.push(line)).unwrap();
        lines
    }

    #[test]
    fn reports_each_activation_once() {
        let (a, b) = (Level::default(), Level::default());
        let mut detector = EdgeDetector::new([(5, &a), (9, &b)]).unwrap();
        assert!(collect(&mut detector).is_empty());

        b.0.set(true);
        assert_eq!(collect(&mut detector), [9]);
        assert!(collect(&mut detector).is_empty(), "held line is not reported again");

        b.0.set(false);
        assert!(collect(&mut detector).is_empty(), "release is not a transition");

        a.0.set(true);
        b.0.set(true);
        assert_eq!(collect(&mut detector), [5, 9]);
    }

    #[test]
    fn held_at_start_is_ignored() {
        let a = Level(Cell::new(true));
        let mut detector = EdgeDetector::new([(1, &a)]).unwrap();
        assert!(collect(&mut detector).is_empty());

        a.0.set(false);
        collect(&mut detector);
        a.0.set(true);
        assert_eq!(collect(&mut detector), [1]);
    }
}
