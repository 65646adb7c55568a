use roomlock_gpio::{GpioActiveLevel, GpioBias, GpioDriver, GpioPin, GpioResult};

/// Parses a list of exactly `N` pin numbers separated by commas, spaces or semicolons.
pub fn parse_pin_list<const N: usize>(pin_str: &str) -> Result<[usize; N], String> {
    pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().map_err(|e| format!("'{}': {}", s, e)))
        .collect::<Result<Vec<usize>, _>>()?
        .try_into()
        .map_err(|pins: Vec<usize>| format!("expected {} pins, got {}", N, pins.len()))
}

/// Claims keypad row pins: asserted means driven low.
pub fn claim_row_pins<'d, D: GpioDriver + ?Sized>(driver: &'d D, pins: &[usize]) -> GpioResult<Vec<Box<dyn GpioPin + 'd>>> {
    pins.iter()
        .map(|&index| -> GpioResult<Box<dyn GpioPin + 'd>> {
            let mut pin = driver.get_pin(index)?;
            pin.set_active_level(GpioActiveLevel::Low)?;
            Ok(pin)
        })
        .collect()
}

/// Claims keypad column pins: pulled up, active when a switch pulls them low.
pub fn claim_column_pins<'d, D: GpioDriver + ?Sized>(driver: &'d D, pins: &[usize]) -> GpioResult<Vec<Box<dyn GpioPin + 'd>>> {
    pins.iter()
        .map(|&index| -> GpioResult<Box<dyn GpioPin + 'd>> {
            let mut pin = driver.get_pin(index)?;
            pin.set_bias(GpioBias::PullUp)?;
            pin.set_active_level(GpioActiveLevel::Low)?;
            Ok(pin)
        })
        .collect()
}
