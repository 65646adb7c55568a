use std::fmt::{Debug, Formatter};
use crate::{GpioOutput, GpioResult};

/// A single indicator LED on a digital output.
///
/// Outputs are write-only, so the LED remembers the last level it wrote;
/// that is what [`Led::toggle`] flips.
pub struct Led<'a> {
    output: &'a dyn GpioOutput,
    lit: bool,
}

impl<'a> Led<'a> {
    pub fn new(output: &'a dyn GpioOutput) -> Self {
        Led { output, lit: false }
    }

    /// Drives the LED off, putting the output in a known state.
    pub fn init(&mut self) -> GpioResult<()> {
        self.off()
    }

    pub fn on(&mut self) -> GpioResult<()> {
        self.set(true)
    }

    pub fn off(&mut self) -> GpioResult<()> {
        self.set(false)
    }

    pub fn toggle(&mut self) -> GpioResult<()> {
        self.set(!self.lit)
    }

    pub fn set(&mut self, lit: bool) -> GpioResult<()> {
        self.output.write(lit)?;
        self.lit = lit;
        Ok(())
    }

    pub fn is_on(&self) -> bool {
        self.lit
    }
}

impl Debug for Led<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Led({:?}, {})", self.output, if self.lit { "on" } else { "off" })
    }
}
