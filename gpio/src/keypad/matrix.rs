use std::fmt::{Debug, Formatter};
use std::thread::sleep;
use std::time::Duration;
use log::trace;
use crate::{GpioInput, GpioOutput, GpioResult};
use crate::keypad::{Keypad, KeypadKey};

/// An input line together with the identifier its transitions are reported under.
pub type ColumnLine<'a> = (usize, &'a dyn GpioInput);

/// A matrix keypad scanned in response to column transitions.
///
/// Between scans every row is asserted, so closing any switch pulls its column
/// active and raises a transition. A scan then asserts one row at a time to
/// find which switch on that column is closed.
pub struct MatrixKeypad<'a, const ROWS: usize, const COLS: usize> {
    rows: [&'a dyn GpioOutput; ROWS],
    cols: [ColumnLine<'a>; COLS],
    keymap: [[KeypadKey; COLS]; ROWS],
    /// How long the lines get to settle after a transition before the rows are walked.
    pub settle_time: Duration,
}

impl<'a, const ROWS: usize, const COLS: usize> MatrixKeypad<'a, ROWS, COLS> {
    /// Creates a new `MatrixKeypad` from its row outputs, its column inputs
    /// (with their line identifiers) and the key at each (row, column).
    pub fn new(
        rows: [&'a dyn GpioOutput; ROWS],
        cols: [ColumnLine<'a>; COLS],
        keymap: [[KeypadKey; COLS]; ROWS],
    ) -> Self {
        MatrixKeypad {
            rows,
            cols,
            keymap,
            settle_time: Duration::from_millis(2),
        }
    }

    pub fn with_settle_time(mut self, settle_time: Duration) -> Self {
        self.settle_time = settle_time;
        self
    }

    /// Puts the matrix in its idle state, ready to report the next press.
    pub fn init(&self) -> GpioResult<()> {
        self.arm()
    }

    /// Gets the column index for an input line identifier.
    pub fn column_index(&self, line: usize) -> Option<usize> {
        self.cols.iter().position(|&(id, _)| id == line)
    }

    /// Gets the identifiers of the column lines, in column order.
    pub fn column_lines(&self) -> [usize; COLS] {
        self.cols.map(|(id, _)| id)
    }

    fn arm(&self) -> GpioResult<()> {
        for row in &self.rows {
            row.write(true)?;
        }
        Ok(())
    }

    fn release(&self) -> GpioResult<()> {
        for row in &self.rows {
            row.write(false)?;
        }
        Ok(())
    }

    fn find_row(&self, col: usize) -> GpioResult<Option<usize>> {
        let (_, input) = self.cols[col];
        for (index, row) in self.rows.iter().enumerate() {
            self.release()?;
            row.write(true)?;
            if input.read()? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }
}

impl<const ROWS: usize, const COLS: usize> Keypad for MatrixKeypad<'_, ROWS, COLS> {
    type Key = KeypadKey;

    fn scan(&self, line: usize) -> GpioResult<Option<Self::Key>> {
        let Some(col) = self.column_index(line) else {
            trace!("Ignoring transition on foreign line {}", line);
            return Ok(None);
        };

        if !self.settle_time.is_zero() {
            sleep(self.settle_time);
        }

        let found = self.find_row(col);
        // The rows go back to idle even if the walk failed half way.
        let rearmed = self.arm();
        let found = found?;
        rearmed?;

        match found {
            Some(row) => {
                let key = self.keymap[row][col];
                trace!("Line {} resolved to ({}, {}): {}", line, row, col, key);
                Ok(Some(key))
            }
            None => {
                trace!("No closed switch on line {}", line);
                Ok(None)
            }
        }
    }
}

impl<const ROWS: usize, const COLS: usize> Debug for MatrixKeypad<'_, ROWS, COLS> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MatrixKeypad({:?}, {:?})", self.rows, self.cols)
    }
}
