//! Memory-mapped GPIO driver for the BCM283x/BCM2711 GPIO block.
//!
//! Talks to the registers directly through `/dev/gpiomem` (or `/dev/mem` as root),
//! which keeps reads and writes cheap enough to scan a keypad matrix row by row.
use crate::{GpioActiveLevel, GpioBias, GpioDriveMode, GpioDriver, GpioError, GpioInput, GpioOutput, GpioPin, GpioResult};
use bitvec::vec::BitVec;
use log::debug;
use memmap2::{MmapOptions, MmapRaw};
use std::fmt::{Debug, Formatter};
use std::fs::OpenOptions;
use std::sync::atomic::AtomicU8;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Register word offsets inside the GPIO block.
const GPSET0: usize = 0x1c / 4;
const GPCLR0: usize = 0x28 / 4;
const GPLEV0: usize = 0x34 / 4;
const GPIO_PUP_PDN_CNTRL_REG0: usize = 0xe4 / 4;

const FUNCTION_INPUT: u8 = 0b000;
const FUNCTION_OUTPUT: u8 = 0b001;

pub struct RawGpioDriver {
    mmap: MmapRaw,
    used_pins: BitVec<AtomicU8>,
    /// Held across every read-modify-write of the function select and pull
    /// registers, which neighbouring pins share.
    registers: Mutex<()>,
}

impl RawGpioDriver {
    /// Physical base of the GPIO block, used when mapping through `/dev/mem`.
    const GPIO_BASE: u64 = 0x3F200000;

    const PIN_COUNT: usize = 58;

    fn create(path: &str, offset: u64) -> GpioResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)?;

        let mmap = MmapOptions::new()
            .offset(offset)
            .len(4096)
            .map_raw(&file)?;

        debug!("Mapped GPIO registers from {} at offset {:#x}", path, offset);

        Ok(Self::from_mmap(mmap))
    }

    fn from_mmap(mmap: MmapRaw) -> Self {
        RawGpioDriver {
            mmap,
            used_pins: BitVec::repeat(false, Self::PIN_COUNT),
            registers: Mutex::new(()),
        }
    }

    /// Backs the register block with plain memory instead of the peripheral.
    #[cfg(test)]
    fn new_anon() -> GpioResult<Self> {
        let mmap = MmapOptions::new().len(4096).map_anon()?;
        Ok(Self::from_mmap(MmapRaw::from(mmap)))
    }

    fn lock_registers(&self) -> MutexGuard<'_, ()> {
        self.registers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `/dev/gpiomem` exposes only the GPIO block, starting at offset zero.
    pub fn new_gpiomem() -> GpioResult<Self> {
        Self::create("/dev/gpiomem", 0)
    }

    pub fn new_mem() -> GpioResult<Self> {
        Self::create("/dev/mem", Self::GPIO_BASE)
    }

    fn check_index(pin_index: usize) -> GpioResult<()> {
        if pin_index >= Self::PIN_COUNT {
            return Err(GpioError::InvalidArgument);
        }
        Ok(())
    }

    fn register(&self, word: usize) -> *mut u32 {
        let base = self.mmap.as_mut_ptr() as *mut u32;
        // SAFETY: every caller passes a word offset inside the 4 KiB mapping.
        unsafe { base.add(word) }
    }

    pub fn raw_set_pin_function(&self, pin_index: usize, function: u8) -> GpioResult<()> {
        if function > 0b111 {
            return Err(GpioError::InvalidArgument);
        }
        Self::check_index(pin_index)?;

        // GPFSELn register
        let register_ptr = self.register(pin_index / 10);
        let shift = (pin_index % 10) * 3;

        let _guard = self.lock_registers();
        let mut register_value = unsafe { register_ptr.read_volatile() };
        register_value &= !(0b111 << shift);
        register_value |= (function as u32) << shift;
        unsafe { register_ptr.write_volatile(register_value) };

        Ok(())
    }

    fn raw_set_pin_output(&self, pin_index: usize, high: bool) -> GpioResult<()> {
        Self::check_index(pin_index)?;

        let bank = if high { GPSET0 } else { GPCLR0 };
        let register_ptr = self.register(bank + pin_index / 32);
        unsafe { register_ptr.write_volatile(1 << (pin_index % 32)) };

        Ok(())
    }

    fn raw_get_pin_level(&self, pin_index: usize) -> GpioResult<bool> {
        Self::check_index(pin_index)?;

        let register_ptr = self.register(GPLEV0 + pin_index / 32);
        let register_value = unsafe { register_ptr.read_volatile() };
        Ok((register_value >> (pin_index % 32)) & 1 != 0)
    }

    fn drive_pin(&self, pin_index: usize, high: bool, mode: GpioDriveMode) -> GpioResult<()> {
        match mode.get_state(high) {
            Some(output) => {
                // Latch the level before switching to output so the line never glitches.
                self.raw_set_pin_output(pin_index, output)?;
                self.raw_set_pin_function(pin_index, FUNCTION_OUTPUT)?;
            }
            None => {
                self.raw_set_pin_function(pin_index, FUNCTION_INPUT)?;
            }
        }

        Ok(())
    }

    fn raw_set_bias(&self, pin_index: usize, bias: GpioBias) -> GpioResult<()> {
        Self::check_index(pin_index)?;

        let bias_value = match bias {
            GpioBias::None => 0b00,
            GpioBias::PullUp => 0b01,
            GpioBias::PullDown => 0b10,
        };

        let register_ptr = self.register(GPIO_PUP_PDN_CNTRL_REG0 + pin_index / 16);
        let shift = (pin_index % 16) * 2;
        let _guard = self.lock_registers();
        let mut register_value = unsafe { register_ptr.read_volatile() };
        register_value &= !(0b11 << shift);
        register_value |= bias_value << shift;
        unsafe { register_ptr.write_volatile(register_value) };

        Ok(())
    }

    fn raw_get_bias(&self, pin_index: usize) -> GpioResult<GpioBias> {
        Self::check_index(pin_index)?;

        let register_ptr = self.register(GPIO_PUP_PDN_CNTRL_REG0 + pin_index / 16);
        let register_value = unsafe { register_ptr.read_volatile() };

        match (register_value >> ((pin_index % 16) * 2)) & 0b11 {
            0b00 => Ok(GpioBias::None),
            0b01 => Ok(GpioBias::PullUp),
            0b10 => Ok(GpioBias::PullDown),
            _ => Err(GpioError::NotSupported),
        }
    }

    fn raw_reset(&self, pin_index: usize) -> GpioResult<()> {
        self.raw_set_pin_function(pin_index, FUNCTION_INPUT)?;
        self.raw_set_bias(pin_index, GpioBias::None)?;
        Ok(())
    }
}

impl Debug for RawGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawGpioDriver({:?})", self.mmap.as_ptr().addr())
    }
}

impl GpioDriver for RawGpioDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(Self::PIN_COUNT)
    }

    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>> {
        Self::check_index(index)?;

        if self.used_pins[index] {
            return Err(GpioError::AlreadyInUse);
        }

        self.used_pins.set_aliased(index, true);
        self.raw_reset(index)?;

        Ok(Box::new(RawGpioPin {
            driver: self,
            pin_index: index,
            active_level: GpioActiveLevel::High,
            drive_mode: GpioDriveMode::PushPull,
        }))
    }
}

struct RawGpioPin<'a> {
    driver: &'a RawGpioDriver,
    pin_index: usize,
    active_level: GpioActiveLevel,
    drive_mode: GpioDriveMode,
}

impl Debug for RawGpioPin<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}]", self.driver, self.pin_index)
    }
}

impl GpioPin for RawGpioPin<'_> {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioInput + '_>> {
        self.driver.raw_set_pin_function(self.pin_index, FUNCTION_INPUT)?;
        Ok(Box::new(RawGpioInput { pin: self }))
    }

    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>> {
        // Start inactive so nothing is asserted before the owner decides otherwise.
        self.driver.drive_pin(self.pin_index, self.active_level.get_state(false), self.drive_mode)?;
        Ok(Box::new(RawGpioOutput { pin: self }))
    }

    fn active_level(&self) -> GpioActiveLevel {
        self.active_level
    }

    fn set_active_level(&mut self, level: GpioActiveLevel) -> GpioResult<()> {
        self.active_level = level;
        Ok(())
    }

    fn bias(&self) -> GpioBias {
        self.driver.raw_get_bias(self.pin_index).unwrap_or(GpioBias::None)
    }

    fn set_bias(&mut self, bias: GpioBias) -> GpioResult<()> {
        self.driver.raw_set_bias(self.pin_index, bias)
    }

    fn drive_mode(&self) -> GpioDriveMode {
        self.drive_mode
    }

    fn set_drive_mode(&mut self, mode: GpioDriveMode) -> GpioResult<()> {
        self.drive_mode = mode;
        Ok(())
    }
}

impl Drop for RawGpioPin<'_> {
    fn drop(&mut self) {
        _ = self.driver.raw_set_pin_function(self.pin_index, FUNCTION_INPUT);
        self.driver.used_pins.set_aliased(self.pin_index, false);
    }
}

struct RawGpioInput<'a> {
    pin: &'a RawGpioPin<'a>,
}

impl Debug for RawGpioInput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[input]", self.pin)
    }
}

impl GpioInput for RawGpioInput<'_> {
    fn read(&self) -> GpioResult<bool> {
        Ok(self.pin.active_level.get_state(self.pin.driver.raw_get_pin_level(self.pin.pin_index)?))
    }
}

struct RawGpioOutput<'a> {
    pin: &'a RawGpioPin<'a>,
}

impl Debug for RawGpioOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[output]", self.pin)
    }
}

impl GpioOutput for RawGpioOutput<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.pin.driver.drive_pin(self.pin.pin_index, self.pin.active_level.get_state(value), self.pin.drive_mode)
    }
}
