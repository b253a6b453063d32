//! GPIO pin control over the mapped register file.
//!
//! Mode changes rewrite one 3-bit field inside a shared function-select
//! word, so they are read-modify-write. Output set/clear go through the
//! dedicated GPSET0/GPCLR0 registers, which the hardware makes atomic with
//! respect to other pins; no read-modify-write there.
//!
//! Only pins 0-31 are supported. Higher pins live in the SET1/CLR1/LEV1
//! bank this driver never touches, and are rejected at the boundary instead
//! of silently wrapping.

use crate::error::DriverError;
use crate::hal::mmio::RegisterBlock;

/// GPIO register offsets.
pub mod reg {
    /// Function Select 0 (pins 0-9); FSEL1..3 follow at 4-byte strides.
    pub const GPFSEL0: usize = 0x00;
    /// Pin Output Set 0 (pins 0-31).
    pub const GPSET0: usize = 0x1C;
    /// Pin Output Clear 0 (pins 0-31).
    pub const GPCLR0: usize = 0x28;
    /// Pin Level 0 (pins 0-31).
    pub const GPLEV0: usize = 0x34;
}

/// Pin function codes for the 3-bit function-select fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input = 0b000,
    Output = 0b001,
    /// Alternate function 0 (SPI0 on pins 7-11).
    Alt0 = 0b100,
    Alt1 = 0b101,
    Alt2 = 0b110,
    Alt3 = 0b111,
    Alt4 = 0b011,
    Alt5 = 0b010,
}

/// Byte offset of the function-select word holding `pin`'s field.
fn fsel_offset(pin: u8) -> usize {
    reg::GPFSEL0 + (pin as usize / 10) * 4
}

/// Bit position of `pin`'s 3-bit field within its function-select word.
fn fsel_shift(pin: u8) -> u32 {
    (pin as u32 % 10) * 3
}

/// Rewrite one pin's field in a function-select word, preserving the other
/// nine pins' fields.
fn fsel_update(word: u32, pin: u8, mode: PinMode) -> u32 {
    let shift = fsel_shift(pin);
    (word & !(0x7 << shift)) | ((mode as u32) << shift)
}

/// GPIO driver over a register backend.
pub struct Gpio<B: RegisterBlock> {
    regs: B,
}

impl<B: RegisterBlock> Gpio<B> {
    pub fn new(regs: B) -> Self {
        Self { regs }
    }

    fn check_pin(pin: u8) -> Result<(), DriverError> {
        if pin < 32 {
            Ok(())
        } else {
            Err(DriverError::InvalidPin(pin))
        }
    }

    /// Route `pin` to `mode`, leaving all other pins' functions untouched.
    pub fn set_mode(&self, pin: u8, mode: PinMode) -> Result<(), DriverError> {
        Self::check_pin(pin)?;
        let offset = fsel_offset(pin);
        let word = self.regs.read(offset);
        self.regs.write(offset, fsel_update(word, pin, mode));
        Ok(())
    }

    /// Drive `pin` high.
    pub fn set(&self, pin: u8) -> Result<(), DriverError> {
        Self::check_pin(pin)?;
        self.regs.write(reg::GPSET0, 1 << pin);
        Ok(())
    }

    /// Drive `pin` low.
    pub fn clear(&self, pin: u8) -> Result<(), DriverError> {
        Self::check_pin(pin)?;
        self.regs.write(reg::GPCLR0, 1 << pin);
        Ok(())
    }

    /// Live level of `pin`.
    pub fn read(&self, pin: u8) -> Result<bool, DriverError> {
        Self::check_pin(pin)?;
        Ok(self.regs.read(reg::GPLEV0) & (1 << pin) != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeGpio;

    #[test]
    fn test_fsel_field_math() {
        assert_eq!(fsel_offset(5), 0x00);
        assert_eq!(fsel_offset(13), 0x04);
        assert_eq!(fsel_offset(25), 0x08);
        assert_eq!(fsel_shift(5), 15);
        assert_eq!(fsel_shift(13), 9);
    }

    #[test]
    fn test_set_mode_preserves_sibling_fields() {
        let gpio = Gpio::new(FakeGpio::new());
        // Give pins 0-9 a recognizable pattern first.
        for pin in 0..10 {
            gpio.set_mode(pin, PinMode::Alt3).unwrap();
        }
        let before = gpio.regs.fsel(0);
        gpio.set_mode(5, PinMode::Output).unwrap();
        let after = gpio.regs.fsel(0);

        let mask = 0x7u32 << fsel_shift(5);
        assert_eq!(after & !mask, before & !mask, "pins 0-4 and 6-9 changed");
        assert_eq!((after & mask) >> fsel_shift(5), PinMode::Output as u32);
    }

    #[test]
    fn test_set_clear_drive_single_bits() {
        let gpio = Gpio::new(FakeGpio::new());
        gpio.set(6).unwrap();
        gpio.set(13).unwrap();
        assert!(gpio.read(6).unwrap());
        assert!(gpio.read(13).unwrap());
        gpio.clear(6).unwrap();
        assert!(!gpio.read(6).unwrap());
        assert!(gpio.read(13).unwrap());
    }

    #[test]
    fn test_pins_past_bank_zero_are_rejected() {
        let gpio = Gpio::new(FakeGpio::new());
        for pin in [32u8, 47, 53, 255] {
            assert!(matches!(
                gpio.set(pin),
                Err(DriverError::InvalidPin(p)) if p == pin
            ));
            assert!(gpio.set_mode(pin, PinMode::Output).is_err());
            assert!(gpio.read(pin).is_err());
        }
    }
}
