// PinPulse - Hardware PPS Pulse Generator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::mmio::{MmioError, RegisterWindow};
use crate::{PulseError, PulseResult};

/// Byte offset of the GPIO register block within BCM283x peripheral space.
pub const GPIO_REGISTER_OFFSET: u64 = 0x20_0000;

/// GPSET0: write-only, one bit per pin, writing 1 drives the pin high.
pub const GPSET0_WORD: usize = 0x1C / 4;
/// GPCLR0: write-only, one bit per pin, writing 1 drives the pin low.
pub const GPCLR0_WORD: usize = 0x28 / 4;

const FSEL_FIELD_MASK: u32 = 0b111;
const FSEL_OUTPUT: u32 = 0b001;

/// Highest pin reachable through GPSET0/GPCLR0. Bank 1 is not modeled.
pub const MAX_PIN: u8 = 31;

/// GPFSELn word holding `pin`'s function-select field (10 pins per word).
pub fn fsel_index(pin: u8) -> usize {
    pin as usize / 10
}

/// Bit position of `pin`'s 3-bit function-select field within its word.
pub fn fsel_shift(pin: u8) -> u32 {
    (pin as u32 % 10) * 3
}

/// Single-bit mask for `pin` in the set/clear registers.
pub fn pin_mask(pin: u8) -> u32 {
    1 << pin
}

fn check_pin(pin: u8) -> PulseResult<()> {
    if pin > MAX_PIN {
        return Err(PulseError::UnsupportedPin(pin));
    }
    Ok(())
}

/// Bank 0 of the BCM283x GPIO block, viewed through a register window.
pub struct GpioBank<W: RegisterWindow> {
    window: W,
}

impl<W: RegisterWindow> GpioBank<W> {
    pub fn new(window: W) -> Self {
        Self { window }
    }

    pub fn into_window(self) -> W {
        self.window
    }

    /// Force `pin` into output mode.
    ///
    /// Masked read-modify-write: first clears the 3-bit field back to the
    /// input encoding, then sets the output encoding, leaving every other
    /// pin's field untouched. One-time destructive configuration; the
    /// previous mode is not saved.
    pub fn configure_as_output(&mut self, pin: u8) -> PulseResult<()> {
        check_pin(pin)?;
        let word = fsel_index(pin);
        let shift = fsel_shift(pin);

        let cleared = self.window.read_word(word)? & !(FSEL_FIELD_MASK << shift);
        self.window.write_word(word, cleared)?;

        let as_output = self.window.read_word(word)? | (FSEL_OUTPUT << shift);
        self.window.write_word(word, as_output)?;
        Ok(())
    }

    /// Drive `pin` high via GPSET0.
    pub fn set(&mut self, pin: u8) -> Result<(), MmioError> {
        self.window.write_word(GPSET0_WORD, pin_mask(pin))
    }

    /// Drive `pin` low via GPCLR0.
    pub fn clear(&mut self, pin: u8) -> Result<(), MmioError> {
        self.window.write_word(GPCLR0_WORD, pin_mask(pin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mmio::BufferWindow;

    #[test]
    fn test_pin_arithmetic() {
        assert_eq!((fsel_index(0), fsel_shift(0)), (0, 0));
        assert_eq!((fsel_index(9), fsel_shift(9)), (0, 27));
        assert_eq!((fsel_index(10), fsel_shift(10)), (1, 0));
        assert_eq!((fsel_index(26), fsel_shift(26)), (2, 18));
        assert_eq!((fsel_index(31), fsel_shift(31)), (3, 3));

        assert_eq!(pin_mask(0), 0x0000_0001);
        assert_eq!(pin_mask(26), 0x0400_0000);
        assert_eq!(pin_mask(31), 0x8000_0000);
    }

    #[test]
    fn test_register_offsets() {
        assert_eq!(GPSET0_WORD, 7);
        assert_eq!(GPCLR0_WORD, 10);
    }

    #[test]
    fn test_configure_as_output_sets_field() {
        let mut bank = GpioBank::new(BufferWindow::new());
        bank.configure_as_output(26).unwrap();
        let fsel2 = bank.into_window().read_word(2).unwrap();
        assert_eq!((fsel2 >> 18) & 0b111, 0b001);
    }

    #[test]
    fn test_configure_as_output_preserves_neighbours() {
        let mut win = BufferWindow::new();
        // Pins 20-29 live in GPFSEL2; give every other field a distinct value.
        let mut fsel2 = 0u32;
        for p in 0..10 {
            fsel2 |= ((p as u32) % 8) << (p * 3);
        }
        win.write_word(2, fsel2).unwrap();

        let mut bank = GpioBank::new(win);
        bank.configure_as_output(26).unwrap();
        let after = bank.into_window().read_word(2).unwrap();

        for p in 0..10u8 {
            let shift = (p as u32) * 3;
            let field = (after >> shift) & 0b111;
            if p == 6 {
                // pin 26
                assert_eq!(field, 0b001);
            } else {
                assert_eq!(field, (fsel2 >> shift) & 0b111, "pin {} field changed", 20 + p);
            }
        }
    }

    #[test]
    fn test_configure_as_output_idempotent() {
        let mut bank = GpioBank::new(BufferWindow::new());
        bank.configure_as_output(26).unwrap();
        let once = {
            let w = bank.into_window();
            let v = w.read_word(2).unwrap();
            bank = GpioBank::new(w);
            v
        };
        bank.configure_as_output(26).unwrap();
        assert_eq!(bank.into_window().read_word(2).unwrap(), once);
    }

    #[test]
    fn test_set_then_clear_pin_26() {
        let mut bank = GpioBank::new(BufferWindow::new());
        bank.configure_as_output(26).unwrap();

        bank.set(26).unwrap();
        {
            let w = &bank.window;
            assert_eq!(w.read_word(GPSET0_WORD).unwrap(), 0x0400_0000);
        }

        bank.clear(26).unwrap();
        let w = bank.into_window();
        // Distinct write-only registers: both hold bit 26 independently.
        assert_eq!(w.read_word(GPSET0_WORD).unwrap(), 0x0400_0000);
        assert_eq!(w.read_word(GPCLR0_WORD).unwrap(), 0x0400_0000);
    }

    #[test]
    fn test_pin_out_of_bank_rejected() {
        let mut bank = GpioBank::new(BufferWindow::new());
        assert!(matches!(
            bank.configure_as_output(32),
            Err(PulseError::UnsupportedPin(32))
        ));
    }
}
