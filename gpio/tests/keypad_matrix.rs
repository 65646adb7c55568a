//! Drives the scanner and edge detector against a simulated 4x4 membrane keypad.

use roomlock_gpio::edge::EdgeDetector;
use roomlock_gpio::keypad::{Keypad, KeypadKey, KeypadLayout, MatrixKeypad};
use roomlock_gpio::queue::RingBuffer;
use roomlock_gpio::sim::SimGpioDriver;
use roomlock_gpio::{GpioActiveLevel, GpioBias, GpioDriver, GpioInput, GpioOutput, GpioResult};
use std::time::Duration;

const ROW_PINS: [usize; 4] = [5, 6, 13, 19];
const COL_PINS: [usize; 4] = [12, 16, 20, 21];

fn with_keypad(
    driver: &SimGpioDriver,
    layout: KeypadLayout,
    test: impl FnOnce(&MatrixKeypad<'_, 4, 4>, &mut EdgeDetector<'_, 4>),
) {
    let mut row_pins = ROW_PINS
        .iter()
        .map(|&pin| driver.get_pin(pin))
        .collect::<GpioResult<Vec<_>>>()
        .unwrap();
    for pin in &mut row_pins {
        pin.set_active_level(GpioActiveLevel::Low).unwrap();
    }
    let row_outs = row_pins
        .iter_mut()
        .map(|pin| pin.as_output())
        .collect::<GpioResult<Vec<_>>>()
        .unwrap();

    let mut col_pins = COL_PINS
        .iter()
        .map(|&pin| driver.get_pin(pin))
        .collect::<GpioResult<Vec<_>>>()
        .unwrap();
    for pin in &mut col_pins {
        pin.set_bias(GpioBias::PullUp).unwrap();
        pin.set_active_level(GpioActiveLevel::Low).unwrap();
    }
    let col_ins = col_pins
        .iter_mut()
        .map(|pin| pin.as_input())
        .collect::<GpioResult<Vec<_>>>()
        .unwrap();

    let rows: [&dyn GpioOutput; 4] = std::array::from_fn(|i| &*row_outs[i]);
    let cols: [(usize, &dyn GpioInput); 4] = std::array::from_fn(|i| (COL_PINS[i], &*col_ins[i]));

    let keypad = MatrixKeypad::new(rows, cols, layout.keymap()).with_settle_time(Duration::ZERO);
    keypad.init().unwrap();
    let mut edges = EdgeDetector::new(cols).unwrap();

    test(&keypad, &mut edges);
}

fn press_and_scan(
    driver: &SimGpioDriver,
    keypad: &MatrixKeypad<'_, 4, 4>,
    edges: &mut EdgeDetector<'_, 4>,
    row: usize,
    col: usize,
) -> Vec<Option<KeypadKey>> {
    driver.press(ROW_PINS[row], COL_PINS[col]).unwrap();
    let mut lines = Vec::new();
    edges.poll(|line| lines.push(line)).unwrap();
    let keys = lines.into_iter().map(|line| keypad.scan(line).unwrap()).collect();
    driver.release(ROW_PINS[row], COL_PINS[col]).unwrap();
    edges.poll(|_| {}).unwrap();
    keys
}

#[test]
fn every_position_resolves_to_its_symbol() {
    for layout in [KeypadLayout::Standard, KeypadLayout::Mirrored] {
        let driver = SimGpioDriver::new(28);
        with_keypad(&driver, layout, |keypad, edges| {
            for (row, keys) in layout.keymap().iter().enumerate() {
                for (col, &key) in keys.iter().enumerate() {
                    assert_eq!(
                        press_and_scan(&driver, keypad, edges, row, col),
                        [Some(key)],
                        "{:?} at ({}, {})", layout, row, col,
                    );
                }
            }
        });
    }
}

#[test]
fn rows_idle_asserted_between_scans() {
    let driver = SimGpioDriver::new(28);
    with_keypad(&driver, KeypadLayout::Standard, |keypad, edges| {
        for pin in ROW_PINS {
            assert_eq!(driver.driven_level(pin), Some(false), "active-low row is asserted");
        }

        press_and_scan(&driver, keypad, edges, 2, 1);
        for pin in ROW_PINS {
            assert_eq!(driver.driven_level(pin), Some(false));
        }
    });
}

#[test]
fn unknown_line_yields_nothing() {
    let driver = SimGpioDriver::new(28);
    with_keypad(&driver, KeypadLayout::Standard, |keypad, _| {
        driver.press(ROW_PINS[0], COL_PINS[0]).unwrap();
        assert_eq!(keypad.scan(27).unwrap(), None);
        assert_eq!(keypad.scan(ROW_PINS[0]).unwrap(), None);
    });
}

#[test]
fn held_key_is_reported_once() {
    let driver = SimGpioDriver::new(28);
    with_keypad(&driver, KeypadLayout::Standard, |keypad, edges| {
        driver.press(ROW_PINS[1], COL_PINS[3]).unwrap();

        let mut lines = Vec::new();
        edges.poll(|line| lines.push(line)).unwrap();
        assert_eq!(lines, [COL_PINS[3]]);
        assert_eq!(keypad.scan(COL_PINS[3]).unwrap(), Some(KeypadKey::KeyB));

        for _ in 0..5 {
            assert_eq!(edges.poll(|_| {}).unwrap(), 0, "column stays active while held");
        }
    });
}

#[test]
fn scanned_keys_flow_through_the_queue() {
    let driver = SimGpioDriver::new(28);
    let mut queue: RingBuffer<KeypadKey, 16> = RingBuffer::new();
    let (mut producer, mut consumer) = queue.split();

    with_keypad(&driver, KeypadLayout::Mirrored, |keypad, edges| {
        for c in "123A".chars() {
            let key = KeypadKey::from_char(c).unwrap();
            let (row, col) = KeypadLayout::Mirrored.position(key).unwrap();
            for scanned in press_and_scan(&driver, keypad, edges, row, col).into_iter().flatten() {
                assert!(producer.write(scanned));
            }
        }
    });

    let typed: String = std::iter::from_fn(|| consumer.read()).map(KeypadKey::to_char).collect();
    assert_eq!(typed, "123A");
}
