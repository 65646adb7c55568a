mod key;
mod matrix;

use std::fmt::Debug;
use crate::GpioResult;
pub use key::*;
pub use matrix::*;

/// The `Keypad` trait defines the interface for interrupt-driven keypad input devices.
pub trait Keypad: Debug {
    type Key;

    /// Resolves the key behind a transition on the input line `line`.
    ///
    /// Returns `Ok(None)` if the line does not belong to the keypad or no closed
    /// switch could be found.
    fn scan(&self, line: usize) -> GpioResult<Option<Self::Key>>;
}
