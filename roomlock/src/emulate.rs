//! Console stand-in for the physical keypad when running on the simulated backend.

use std::io::BufRead;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use log::{info, warn};
use roomlock_gpio::GpioResult;
use roomlock_gpio::keypad::{KeypadKey, KeypadLayout};
use roomlock_gpio::sim::SimGpioDriver;
use crate::config::PinConfig;

/// How long each emulated key is held down.
const HOLD_TIME: Duration = Duration::from_millis(30);
/// Pause between two emulated keys, longer than the default debounce interval.
const GAP_TIME: Duration = Duration::from_millis(250);

/// Presses `key` on the simulated matrix and lets it go after `hold`.
pub fn tap(driver: &SimGpioDriver, pins: &PinConfig, layout: KeypadLayout, key: KeypadKey, hold: Duration) -> GpioResult<()> {
    let Some((row, col)) = layout.position(key) else {
        return Ok(());
    };
    driver.press(pins.rows[row], pins.cols[col])?;
    thread::sleep(hold);
    driver.release(pins.rows[row], pins.cols[col])
}

/// Types every keypad symbol found in `input`, skipping everything else.
pub fn type_line(driver: &SimGpioDriver, pins: &PinConfig, layout: KeypadLayout, input: &str, gap: Duration) -> GpioResult<usize> {
    let mut typed = 0;
    for c in input.chars().filter(|c| !c.is_whitespace()) {
        let Some(key) = KeypadKey::from_char(c) else {
            warn!("'{}' is not on the keypad.", c);
            continue;
        };
        tap(driver, pins, layout, key, HOLD_TIME)?;
        thread::sleep(gap);
        typed += 1;
    }
    Ok(typed)
}

/// Feeds stdin lines to the simulated keypad on a detached thread.
///
/// The thread ends at end of input; it is not joined, so a blocked read never
/// holds up shutdown.
pub fn spawn_console(driver: Arc<SimGpioDriver>, pins: PinConfig, layout: KeypadLayout) -> std::io::Result<()> {
    thread::Builder::new()
        .name("console".to_string())
        .spawn(move || {
            info!("Simulated keypad: type keys (0-9, A-D, *, #) and press Enter.");
            for line in std::io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("Failed to read stdin: {}", e);
                        break;
                    }
                };
                if let Err(e) = type_line(&driver, &pins, layout, &line, GAP_TIME) {
                    warn!("Failed to emulate keys: {}", e);
                    break;
                }
            }
            info!("Console input closed.");
        })?;
    Ok(())
}
