//! Sine Lookup Table
//!
//! One full period of a sine wave as 256 unsigned 8-bit samples, centred
//! on 128 with a range of 1-255. The lookup engine scales each sample into
//! a frequency offset code, so the table shapes the instantaneous carrier
//! offset rather than an audio amplitude.
//!
//! A [`TableCursor`] walks the table with a per-tone step. The cursor is a
//! `u8`, so wrapping modulo the table length is free and an out-of-bounds
//! index cannot be formed.

/// Number of samples in one period
pub const TABLE_LEN: usize = 256;

/// Value at cursor 0 (and 128), the zero crossing
pub const CENTER: u8 = 128;

/// One sine period, quarter-symmetric
pub static SINE_LOOKUP: [u8; TABLE_LEN] = [
    128, 131, 134, 137, 140, 144, 147, 150, 153, 156, 159, 162, 165, 168, 171, 174,
    177, 179, 182, 185, 188, 191, 193, 196, 199, 201, 204, 206, 209, 211, 213, 216,
    218, 220, 222, 224, 226, 228, 230, 232, 234, 235, 237, 239, 240, 241, 243, 244,
    245, 246, 248, 249, 250, 250, 251, 252, 253, 253, 254, 254, 254, 255, 255, 255,
    255, 255, 255, 255, 254, 254, 254, 253, 253, 252, 251, 250, 250, 249, 248, 246,
    245, 244, 243, 241, 240, 239, 237, 235, 234, 232, 230, 228, 226, 224, 222, 220,
    218, 216, 213, 211, 209, 206, 204, 201, 199, 196, 193, 191, 188, 185, 182, 179,
    177, 174, 171, 168, 165, 162, 159, 156, 153, 150, 147, 144, 140, 137, 134, 131,
    128, 125, 122, 119, 116, 112, 109, 106, 103, 100,  97,  94,  91,  88,  85,  82,
     79,  77,  74,  71,  68,  65,  63,  60,  57,  55,  52,  50,  47,  45,  43,  40,
     38,  36,  34,  32,  30,  28,  26,  24,  22,  21,  19,  17,  16,  15,  13,  12,
     11,  10,   8,   7,   6,   6,   5,   4,   3,   3,   2,   2,   2,   1,   1,   1,
      1,   1,   1,   1,   2,   2,   2,   3,   3,   4,   5,   6,   6,   7,   8,  10,
     11,  12,  13,  15,  16,  17,  19,  21,  22,  24,  26,  28,  30,  32,  34,  36,
     38,  40,  43,  45,  47,  50,  52,  55,  57,  60,  63,  65,  68,  71,  74,  77,
     79,  82,  85,  88,  91,  94,  97, 100, 103, 106, 109, 112, 116, 119, 122, 125,
];

/// Sample at a cursor position
#[inline]
#[must_use]
pub fn sample(cursor: u8) -> u8 {
    SINE_LOOKUP[usize::from(cursor)]
}

/// Stepping position inside [`SINE_LOOKUP`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TableCursor {
    position: u8,
}

impl TableCursor {
    /// Cursor at the start of the period
    #[must_use]
    pub const fn new() -> Self {
        Self { position: 0 }
    }

    /// Current position
    #[must_use]
    pub const fn position(self) -> u8 {
        self.position
    }

    /// Sample under the cursor
    #[must_use]
    pub fn sample(self) -> u8 {
        sample(self.position)
    }

    /// Move forward by `step`, wrapping at the end of the table
    pub fn advance(&mut self, step: u8) {
        self.position = self.position.wrapping_add(step);
    }

    /// Return to the start of the period
    pub fn reset(&mut self) {
        self.position = 0;
    }
}
