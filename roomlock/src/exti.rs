//! The keypad side of the lock: watches the column lines, scans the matrix and
//! queues the keys for the main loop.
//!
//! On the Pi this runs on its own thread, standing in for the pin-change
//! interrupt. It is the only code that drives the row lines.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::sleep;
use std::time::Duration;
use log::{debug, trace, warn};
use roomlock_gpio::edge::EdgeDetector;
use roomlock_gpio::keypad::{Keypad, KeypadKey, KeypadLayout, MatrixKeypad};
use roomlock_gpio::{GpioDriver, GpioInput, GpioOutput, GpioResult};
use crate::app::KeyProducer;
use crate::config::{Config, PinConfig};
use crate::utils::{claim_column_pins, claim_row_pins};

/// How often the column lines are sampled.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Handles a column that just became active: finds the key and queues it.
///
/// A full queue drops the key.
pub fn on_input_transition<K: Keypad<Key = KeypadKey>>(
    keypad: &K,
    producer: &mut KeyProducer<'_>,
    line: usize,
) -> GpioResult<Option<KeypadKey>> {
    let Some(key) = keypad.scan(line)? else {
        trace!("Transition on line {} but no key found.", line);
        return Ok(None);
    };

    if !producer.write(key) {
        warn!("Key queue full, dropping {}.", key);
    }
    Ok(Some(key))
}

/// Polls the edge detector until `running` is cleared or a GPIO error occurs.
pub fn watch<const N: usize, K: Keypad<Key = KeypadKey>>(
    keypad: &K,
    edges: &mut EdgeDetector<'_, N>,
    producer: &mut KeyProducer<'_>,
    running: &AtomicBool,
    poll_interval: Duration,
) -> GpioResult<()> {
    while running.load(Ordering::Relaxed) {
        let mut result = Ok(());
        edges.poll(|line| {
            if result.is_ok() {
                result = on_input_transition(keypad, producer, line).map(|_| ());
            }
        })?;
        result?;

        sleep(poll_interval);
    }
    Ok(())
}

/// Claims the keypad pins and runs [watch] on them.
///
/// `on_armed` is called once the rows are asserted and the column levels are
/// sampled. A key already held at that point is only reported after it has been
/// released and pressed again.
pub fn run<D: GpioDriver + ?Sized>(
    driver: &D,
    pins: &PinConfig,
    config: &Config,
    mut producer: KeyProducer<'_>,
    running: &AtomicBool,
    on_armed: impl FnOnce(),
) -> GpioResult<()> {
    debug!("Initializing keypad driver...");
    let mut row_pins = claim_row_pins(driver, &pins.rows)?;
    let mut col_pins = claim_column_pins(driver, &pins.cols)?;
    let row_outs = row_pins
        .iter_mut()
        .map(|pin| pin.as_output())
        .collect::<GpioResult<Vec<_>>>()?;
    let col_ins = col_pins
        .iter_mut()
        .map(|pin| pin.as_input())
        .collect::<GpioResult<Vec<_>>>()?;

    let rows: [&dyn GpioOutput; 4] = std::array::from_fn(|i| &*row_outs[i]);
    let cols: [(usize, &dyn GpioInput); 4] = std::array::from_fn(|i| (pins.cols[i], &*col_ins[i]));

    let layout = KeypadLayout::from(config.layout);
    let keypad = MatrixKeypad::new(rows, cols, layout.keymap()).with_settle_time(config.settle_time());
    keypad.init()?;
    let mut edges = EdgeDetector::new(cols)?;
    debug!("{:?} initialized, watching lines {:?}.", keypad, keypad.column_lines());
    on_armed();

    watch(&keypad, &mut edges, &mut producer, running, POLL_INTERVAL)
}
