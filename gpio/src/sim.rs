//! In-memory GPIO backend.
//!
//! Every line remembers its function, bias and the level it drives. Pairs of
//! lines can be shorted with [`SimGpioDriver::press`], which is how a closed
//! keypad switch looks to the controller: an input tied to a driving output
//! follows that output, otherwise it falls back to its bias.

use crate::{GpioActiveLevel, GpioBias, GpioDriveMode, GpioDriver, GpioError, GpioInput, GpioOutput, GpioPin, GpioResult};
use std::fmt::{Debug, Formatter};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
enum SimFunction {
    #[default]
    Unconfigured,
    Input,
    Output,
}

#[derive(Copy, Clone, Debug, Default)]
struct SimLine {
    used: bool,
    function: SimFunction,
    bias: GpioBias,
    /// Physical level the line drives, `None` while floating.
    driven: Option<bool>,
}

#[derive(Debug, Default)]
struct SimState {
    lines: Vec<SimLine>,
    contacts: Vec<(usize, usize)>,
}

impl SimState {
    /// Physical level seen on a line. Several drivers on one node resolve as wired-AND.
    fn level(&self, index: usize) -> bool {
        if let Some(level) = self.lines[index].driven {
            return level;
        }

        let mut drivers = self.contacts.iter().filter_map(|&(a, b)| {
            let other = if a == index { b } else if b == index { a } else { return None };
            self.lines[other].driven
        });

        match drivers.next() {
            Some(first) => drivers.fold(first, |level, next| level && next),
            None => self.lines[index].bias == GpioBias::PullUp,
        }
    }
}

pub struct SimGpioDriver {
    state: Mutex<SimState>,
}

impl SimGpioDriver {
    pub fn new(pin_count: usize) -> Self {
        SimGpioDriver {
            state: Mutex::new(SimState {
                lines: vec![SimLine::default(); pin_count],
                contacts: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_index(&self, index: usize) -> GpioResult<()> {
        if index >= self.state().lines.len() {
            return Err(GpioError::InvalidArgument);
        }
        Ok(())
    }

    /// Closes a contact between two lines.
    pub fn press(&self, a: usize, b: usize) -> GpioResult<()> {
        self.check_index(a)?;
        self.check_index(b)?;

        let mut state = self.state();
        if !state.contacts.iter().any(|&c| c == (a, b) || c == (b, a)) {
            state.contacts.push((a, b));
        }
        Ok(())
    }

    /// Opens a contact closed by [`SimGpioDriver::press`].
    pub fn release(&self, a: usize, b: usize) -> GpioResult<()> {
        self.check_index(a)?;
        self.check_index(b)?;

        self.state().contacts.retain(|&c| c != (a, b) && c != (b, a));
        Ok(())
    }

    /// Opens every contact.
    pub fn release_all(&self) {
        self.state().contacts.clear();
    }

    /// Physical level a line is driving, or `None` if it is floating or not an output.
    pub fn driven_level(&self, index: usize) -> Option<bool> {
        self.state().lines.get(index).and_then(|line| line.driven)
    }

    /// Physical level currently seen on a line.
    pub fn level(&self, index: usize) -> GpioResult<bool> {
        self.check_index(index)?;
        Ok(self.state().level(index))
    }

    fn configure(&self, index: usize, function: SimFunction) {
        let mut state = self.state();
        let line = &mut state.lines[index];
        line.function = function;
        line.driven = None;
    }

    fn drive(&self, index: usize, level: Option<bool>) -> GpioResult<()> {
        let mut state = self.state();
        let line = &mut state.lines[index];
        if line.function != SimFunction::Output {
            return Err(GpioError::WrongMode(index));
        }
        line.driven = level;
        Ok(())
    }

    fn sample(&self, index: usize) -> GpioResult<bool> {
        let state = self.state();
        if state.lines[index].function != SimFunction::Input {
            return Err(GpioError::WrongMode(index));
        }
        Ok(state.level(index))
    }
}

impl Debug for SimGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimGpioDriver({})", self.state().lines.len())
    }
}

impl GpioDriver for SimGpioDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.state().lines.len())
    }

    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>> {
        self.check_index(index)?;

        {
            let mut state = self.state();
            let line = &mut state.lines[index];
            if line.used {
                return Err(GpioError::AlreadyInUse);
            }
            *line = SimLine { used: true, ..SimLine::default() };
        }

        Ok(Box::new(SimGpioPin {
            driver: self,
            pin_index: index,
            active_level: GpioActiveLevel::High,
            drive_mode: GpioDriveMode::PushPull,
        }))
    }
}

struct SimGpioPin<'a> {
    driver: &'a SimGpioDriver,
    pin_index: usize,
    active_level: GpioActiveLevel,
    drive_mode: GpioDriveMode,
}

impl Debug for SimGpioPin<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}]", self.driver, self.pin_index)
    }
}

impl GpioPin for SimGpioPin<'_> {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioInput + '_>> {
        self.driver.configure(self.pin_index, SimFunction::Input);
        Ok(Box::new(SimGpioInput { pin: self }))
    }

    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>> {
        self.driver.configure(self.pin_index, SimFunction::Output);
        let output = SimGpioOutput { pin: self };
        output.write(false)?;
        Ok(Box::new(output))
    }

    fn active_level(&self) -> GpioActiveLevel {
        self.active_level
    }

    fn set_active_level(&mut self, level: GpioActiveLevel) -> GpioResult<()> {
        self.active_level = level;
        Ok(())
    }

    fn bias(&self) -> GpioBias {
        self.driver.state().lines[self.pin_index].bias
    }

    fn set_bias(&mut self, bias: GpioBias) -> GpioResult<()> {
        self.driver.state().lines[self.pin_index].bias = bias;
        Ok(())
    }

    fn drive_mode(&self) -> GpioDriveMode {
        self.drive_mode
    }

    fn set_drive_mode(&mut self, mode: GpioDriveMode) -> GpioResult<()> {
        self.drive_mode = mode;
        Ok(())
    }
}

impl Drop for SimGpioPin<'_> {
    fn drop(&mut self) {
        self.driver.state().lines[self.pin_index] = SimLine::default();
    }
}

struct SimGpioInput<'a> {
    pin: &'a SimGpioPin<'a>,
}

impl Debug for SimGpioInput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[input]", self.pin)
    }
}

impl GpioInput for SimGpioInput<'_> {
    fn read(&self) -> GpioResult<bool> {
        let level = self.pin.driver.sample(self.pin.pin_index)?;
        Ok(self.pin.active_level.get_state(level))
    }
}

struct SimGpioOutput<'a> {
    pin: &'a SimGpioPin<'a>,
}

impl Debug for SimGpioOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[output]", self.pin)
    }
}

impl GpioOutput for SimGpioOutput<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        let level = self.pin.drive_mode.get_state(self.pin.active_level.get_state(value));
        self.pin.driver.drive(self.pin.pin_index, level)
    }
}
