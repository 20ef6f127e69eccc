//! Si4060 Frequency Calculation
//!
//! Converts carrier, deviation, offset and channel step values in Hz into
//! Si4060 register codes. This module is testable on the host.
//!
//! # Theory of Operation
//!
//! The Si4060 synthesizer is a fractional-N PLL followed by an output
//! divider (OUTDIV) and a fixed prescaler of 2:
//!
//! 1. Carrier: `f_RF = (FC_INTE + FC_FRAC / 2^19) × 2 × f_xo / OUTDIV`,
//!    with `FC_FRAC` kept in `[2^19, 2^20)`
//! 2. Deviation, offset, channel step: `code = 2^19 × OUTDIV × f / (2 × f_xo)`
//!
//! All conversions floor. Rounding up could push a deviation past the
//! register's maximum.

use crate::types::{Band, Frequency};

/// Fractional bits of the PLL divider
pub const PLL_FRAC_BITS: u32 = 19;

/// Fixed synthesizer prescaler
pub const PRESCALER: u64 = 2;

/// Largest `MODEM_FREQ_DEV` value (17 bits)
pub const MAX_DEVIATION_CODE: u32 = 0x1_FFFF;

/// Integer and fractional PLL divider for one carrier
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PllCode {
    /// `FREQ_CONTROL_INTE`
    pub inte: u8,
    /// `FREQ_CONTROL_FRAC` (20 bits)
    pub frac: u32,
}

impl PllCode {
    /// Register bytes for `FREQ_CONTROL_INTE` .. `FREQ_CONTROL_FRAC_0`
    #[must_use]
    pub const fn to_registers(&self) -> [u8; 4] {
        [
            self.inte,
            ((self.frac >> 16) & 0x0F) as u8,
            ((self.frac >> 8) & 0xFF) as u8,
            (self.frac & 0xFF) as u8,
        ]
    }

    /// Carrier produced by this code, in Hz (floored)
    #[must_use]
    pub fn frequency_hz(&self, xo_hz: u32, band: Band) -> u64 {
        let n = (u64::from(self.inte) << PLL_FRAC_BITS) + u64::from(self.frac);
        n * PRESCALER * u64::from(xo_hz) / (u64::from(band.outdiv()) << PLL_FRAC_BITS)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for PllCode {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "PLL({}, 0x{:05X})", self.inte, self.frac);
    }
}

/// Calculate the PLL divider for a carrier
#[must_use]
pub fn pll_code(freq: Frequency, xo_hz: u32) -> PllCode {
    let outdiv = u64::from(freq.band().outdiv());
    let total = ((u64::from(freq.as_hz()) * outdiv) << PLL_FRAC_BITS) / (PRESCALER * u64::from(xo_hz));

    // FC_INTE is one below the integer ratio so FC_FRAC carries the leading 1
    let inte = (total >> PLL_FRAC_BITS) - 1;
    let frac = total - (inte << PLL_FRAC_BITS);

    PllCode {
        inte: inte as u8,
        frac: frac as u32,
    }
}

/// Scale a frequency difference in Hz into synthesizer step units
///
/// Shared by deviation, offset and channel step, which all use the same
/// resolution.
#[must_use]
pub fn hz_to_code(hz: u32, xo_hz: u32, outdiv: u32) -> u32 {
    let scaled = (u64::from(hz) * u64::from(outdiv)) << PLL_FRAC_BITS;
    (scaled / (PRESCALER * u64::from(xo_hz))) as u32
}

/// Peak deviation code for `MODEM_FREQ_DEV`
#[must_use]
pub fn deviation_code(deviation_hz: u32, xo_hz: u32, outdiv: u32) -> u32 {
    hz_to_code(deviation_hz, xo_hz, outdiv)
}

/// Offset code for `MODEM_FREQ_OFFSET`, saturating at 16 bits
#[must_use]
pub fn offset_code(offset_hz: u32, xo_hz: u32, outdiv: u32) -> u16 {
    u16::try_from(hz_to_code(offset_hz, xo_hz, outdiv)).unwrap_or(u16::MAX)
}

/// Channel step code for `FREQ_CONTROL_CHANNEL_STEP_SIZE`, saturating at 16 bits
#[must_use]
pub fn channel_step_code(step_hz: u32, xo_hz: u32, outdiv: u32) -> u16 {
    u16::try_from(hz_to_code(step_hz, xo_hz, outdiv)).unwrap_or(u16::MAX)
}

/// Size of one code step in millihertz
#[must_use]
pub fn resolution_millihz(xo_hz: u32, outdiv: u32) -> u32 {
    let step = PRESCALER * u64::from(xo_hz) * 1000 / (u64::from(outdiv) << PLL_FRAC_BITS);
    step as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pll_code_register_layout() {
        let code = PllCode {
            inte: 53,
            frac: 0xA_4978,
        };
        assert_eq!(code.to_registers(), [53, 0x0A, 0x49, 0x78]);
    }

    #[test]
    fn frac_carries_leading_one() {
        for hz in [144_000_000, 145_999_999, 434_000_000, 868_300_000] {
            let freq = Frequency::from_hz(hz).unwrap();
            let code = pll_code(freq, 32_000_000);
            assert!(code.frac >= 1 << PLL_FRAC_BITS);
            assert!(code.frac < 2 << PLL_FRAC_BITS);
        }
    }

    #[test]
    fn resolution_at_2m() {
        // 2 × 32 MHz / (24 × 2^19) ≈ 5.086 Hz
        assert_eq!(resolution_millihz(32_000_000, 24), 5086);
    }

    #[test]
    fn offset_saturates() {
        assert_eq!(offset_code(10_000_000, 32_000_000, 24), u16::MAX);
    }
}
