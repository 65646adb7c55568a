//! Non-blocking "on for a while" control of an indicator.
//!
//! [`TimedOutput::request`] switches the LED on and arms a deadline;
//! [`TimedOutput::poll`], called once per main loop iteration, switches it off
//! once the deadline has passed. Nothing here sleeps, so the off time can lag
//! by up to one loop iteration.

use std::fmt::{Debug, Formatter};
use std::time::Duration;
use crate::GpioResult;
use crate::led::Led;
use crate::tick::{duration_to_ms, elapsed_ms, Clock};

pub struct TimedOutput<'a> {
    led: Led<'a>,
    clock: &'a dyn Clock,
    started: Option<u32>,
    duration: Duration,
}

impl<'a> TimedOutput<'a> {
    pub fn new(led: Led<'a>, clock: &'a dyn Clock) -> Self {
        TimedOutput {
            led,
            clock,
            started: None,
            duration: Duration::ZERO,
        }
    }

    /// Turns the output on for `duration`, replacing any deadline still pending.
    pub fn request(&mut self, duration: Duration) -> GpioResult<()> {
        self.led.on()?;
        self.started = Some(self.clock.now_ms());
        self.duration = duration;
        Ok(())
    }

    /// Turns the output off once more than the requested duration has elapsed.
    ///
    /// Returns `true` on the call that switched it off.
    pub fn poll(&mut self) -> GpioResult<bool> {
        let Some(started) = self.started else {
            return Ok(false);
        };

        if elapsed_ms(self.clock.now_ms(), started) > duration_to_ms(self.duration) {
            self.led.off()?;
            self.started = None;
            return Ok(true);
        }

        Ok(false)
    }

    /// Turns the output off now and drops any pending deadline.
    pub fn force_off(&mut self) -> GpioResult<()> {
        self.led.off()?;
        self.started = None;
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.started.is_some()
    }

    pub fn is_on(&self) -> bool {
        self.led.is_on()
    }

    /// Gives direct access to the LED. Changing it does not touch the deadline.
    pub fn led(&mut self) -> &mut Led<'a> {
        &mut self.led
    }
}

impl Debug for TimedOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.started {
            Some(started) => write!(f, "TimedOutput({:?}, {:?} from {})", self.led, self.duration, started),
            None => write!(f, "TimedOutput({:?})", self.led),
        }
    }
}
