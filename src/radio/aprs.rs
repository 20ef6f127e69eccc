//! APRS Engines
//!
//! Three interchangeable ways of putting a framed AX.25 packet on air as
//! 1200 baud Bell 202 AFSK:
//!
//! - [`GfskSyncEngine`]: one fast timer clocks the chip's direct-mode data
//!   line, toggling it at the audio tone rate. Bit timing and tone come
//!   from the same tick so they cannot drift apart.
//! - [`LookupEngine`]: one timer paces bits, a second steps through the
//!   sine table and writes each sample as a frequency offset.
//! - [`OrdinaryGfsk`]: the chip's own data clock requests each level.
//!
//! All three consume bits from [`PacketBits`] and NRZI-encode them with
//! [`Nrzi`]. Bytes are sent LSB first. Between the flag boundaries a 0 is
//! inserted after five consecutive 1s; the flags themselves are sent
//! unstuffed.

use fixed::types::U16F16;

use crate::config::{
    ClockProfile, GFSK_SYNC_HALF_PERIOD_1200, GFSK_SYNC_HALF_PERIOD_2200, GFSK_SYNC_TICKS_PER_BIT,
    LOOKUP_TBL_MULTIPLIER_1200, LOOKUP_TBL_MULTIPLIER_2200, LOOKUP_TBL_MULTIPLIER_OFFSET,
    PREEMPHASIS_DEVIATION_1200, PREEMPHASIS_DEVIATION_2200,
};
use crate::dsp::sine_table::TableCursor;
use crate::radio::buffer::PacketView;
use crate::types::AfskTone;

/// Modulation strategy used for APRS
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AprsStrategy {
    /// Synchronous GFSK on one timer
    #[default]
    GfskSync,
    /// Sine lookup on two timers
    Lookup,
    /// Chip-clocked GFSK
    Ordinary,
}

/// Consecutive 1s after which a 0 is stuffed
const STUFF_AFTER: u8 = 5;

/// Bit source over a packet
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PacketBits {
    index: usize,
    bit: u8,
    ones: u8,
    stuff_pending: bool,
    data_bytes: usize,
}

impl PacketBits {
    /// Positioned on bit 0 of byte 0
    #[must_use]
    pub const fn new() -> Self {
        Self {
            index: 0,
            bit: 0,
            ones: 0,
            stuff_pending: false,
            data_bytes: 0,
        }
    }

    /// Next bit on air, `None` once every byte has been sent
    pub fn next_bit(&mut self, packet: &PacketView<'_>) -> Option<bool> {
        if self.stuff_pending {
            self.stuff_pending = false;
            self.ones = 0;
            return Some(false);
        }

        let byte = packet.get(self.index)?;
        let in_data = packet.is_data(self.index);
        let value = (byte >> self.bit) & 0x01 != 0;

        self.bit += 1;
        if self.bit == 8 {
            self.bit = 0;
            self.index += 1;
            if in_data {
                self.data_bytes += 1;
            }
        }

        if in_data && value {
            self.ones += 1;
            if self.ones == STUFF_AFTER {
                self.stuff_pending = true;
            }
        } else {
            self.ones = 0;
        }

        Some(value)
    }

    /// Index of the byte currently being sent
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Data-region bytes fully sent
    #[must_use]
    pub const fn data_bytes_sent(&self) -> usize {
        self.data_bytes
    }
}

/// NRZI encoder: a 0 toggles the tone, a 1 keeps it
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Nrzi {
    tone: AfskTone,
}

impl Nrzi {
    /// Starting on the 1200 Hz tone
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tone: AfskTone::Mark1200,
        }
    }

    /// Tone for the next bit
    pub fn encode(&mut self, bit: bool) -> AfskTone {
        if !bit {
            self.tone = self.tone.toggled();
        }
        self.tone
    }

    /// Tone currently on air
    #[must_use]
    pub const fn tone(&self) -> AfskTone {
        self.tone
    }
}

/// Pre-emphasis deviation code for a tone
#[must_use]
pub const fn preemphasis_code(tone: AfskTone) -> u32 {
    match tone {
        AfskTone::Mark1200 => PREEMPHASIS_DEVIATION_1200,
        AfskTone::Space2200 => PREEMPHASIS_DEVIATION_2200,
    }
}

/// Ticks per half cycle of an AFSK tone in GFSK-sync mode
const fn half_period(tone: AfskTone) -> u8 {
    match tone {
        AfskTone::Mark1200 => GFSK_SYNC_HALF_PERIOD_1200,
        AfskTone::Space2200 => GFSK_SYNC_HALF_PERIOD_2200,
    }
}

/// Carry the fraction of a half cycle already sent across a tone change
const fn rescale_half_count(count: u8, from: AfskTone, to: AfskTone) -> u8 {
    (count as u16 * half_period(to) as u16 / half_period(from) as u16) as u8
}

/// Output of one GFSK-sync tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GfskTick {
    /// Level to drive on the chip's data input
    pub level: bool,
    /// Deviation code to write, set when the tone changed this tick
    pub deviation: Option<u32>,
}

/// Synchronous GFSK: one tick per chip data bit
///
/// Each 1200 baud bit lasts [`GFSK_SYNC_TICKS_PER_BIT`] ticks. The data
/// level is toggled every half period of the current tone, producing a
/// square wave the chip's Gaussian filter rounds into the audio tone.
/// On a tone change the progress through the current half cycle is
/// rescaled to the new half period, keeping the audio phase continuous.
#[derive(Clone, Copy, Debug)]
pub struct GfskSyncEngine {
    bits: PacketBits,
    nrzi: Nrzi,
    tick_in_bit: u8,
    half_count: u8,
    level: bool,
    finished: bool,
}

impl GfskSyncEngine {
    /// Engine before the first bit
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bits: PacketBits::new(),
            nrzi: Nrzi::new(),
            tick_in_bit: 0,
            half_count: 0,
            level: false,
            finished: false,
        }
    }

    /// Deviation code to program before the first tick
    #[must_use]
    pub const fn initial_deviation(&self) -> u32 {
        preemphasis_code(self.nrzi.tone())
    }

    /// Advance one tick, `None` once the packet is exhausted
    pub fn tick(&mut self, packet: &PacketView<'_>) -> Option<GfskTick> {
        if self.finished {
            return None;
        }

        let mut deviation = None;
        if self.tick_in_bit == 0 {
            let Some(bit) = self.bits.next_bit(packet) else {
                self.finished = true;
                return None;
            };
            let previous = self.nrzi.tone();
            let tone = self.nrzi.encode(bit);
            if tone != previous {
                self.half_count = rescale_half_count(self.half_count, previous, tone);
                deviation = Some(preemphasis_code(tone));
            }
        }

        self.tick_in_bit += 1;
        if self.tick_in_bit == GFSK_SYNC_TICKS_PER_BIT {
            self.tick_in_bit = 0;
        }

        let half_period = half_period(self.nrzi.tone());
        self.half_count += 1;
        if self.half_count >= half_period {
            self.half_count = 0;
            self.level = !self.level;
        }

        Some(GfskTick {
            level: self.level,
            deviation,
        })
    }

    /// Packet exhausted
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Bit source position
    #[must_use]
    pub const fn bits(&self) -> &PacketBits {
        &self.bits
    }

    /// Tone currently on air
    #[must_use]
    pub const fn tone(&self) -> AfskTone {
        self.nrzi.tone()
    }
}

impl Default for GfskSyncEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Frequency offset code for a table sample
///
/// The 2200 Hz tone uses the wider multiplier; the 1200 Hz tone is lifted
/// by the offset so both swing around the same centre.
#[must_use]
pub fn lookup_code(sample: u8, tone: AfskTone) -> u16 {
    let (multiplier, offset) = match tone {
        AfskTone::Mark1200 => (LOOKUP_TBL_MULTIPLIER_1200, LOOKUP_TBL_MULTIPLIER_OFFSET),
        AfskTone::Space2200 => (LOOKUP_TBL_MULTIPLIER_2200, 0),
    };
    let scaled: u16 = (U16F16::from_num(sample) * multiplier).to_num();
    scaled + offset
}

/// Table-driven FSK over two timers
///
/// [`LookupEngine::on_bit_tick`] runs at the baud rate and selects the
/// tone; [`LookupEngine::on_sample_tick`] runs at the table rate and
/// returns the next offset code.
#[derive(Clone, Copy, Debug)]
pub struct LookupEngine {
    bits: PacketBits,
    nrzi: Nrzi,
    cursor: TableCursor,
    step_1200: u8,
    step_2200: u8,
    finished: bool,
}

impl LookupEngine {
    /// Engine using the table steps of a clock profile
    #[must_use]
    pub const fn new(profile: &ClockProfile) -> Self {
        Self {
            bits: PacketBits::new(),
            nrzi: Nrzi::new(),
            cursor: TableCursor::new(),
            step_1200: profile.table_step_1200,
            step_2200: profile.table_step_2200,
            finished: false,
        }
    }

    /// Take the next bit and select its tone
    ///
    /// A tone change restarts the table at the centre sample. Returns
    /// `None` once the packet is exhausted.
    pub fn on_bit_tick(&mut self, packet: &PacketView<'_>) -> Option<AfskTone> {
        if self.finished {
            return None;
        }
        let Some(bit) = self.bits.next_bit(packet) else {
            self.finished = true;
            return None;
        };
        let previous = self.nrzi.tone();
        let tone = self.nrzi.encode(bit);
        if tone != previous {
            self.cursor.reset();
        }
        Some(tone)
    }

    /// Offset code for the current sample, then step the cursor
    pub fn on_sample_tick(&mut self) -> u16 {
        let tone = self.nrzi.tone();
        let code = lookup_code(self.cursor.sample(), tone);
        let step = match tone {
            AfskTone::Mark1200 => self.step_1200,
            AfskTone::Space2200 => self.step_2200,
        };
        self.cursor.advance(step);
        code
    }

    /// Packet exhausted
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Table position
    #[must_use]
    pub const fn cursor(&self) -> TableCursor {
        self.cursor
    }

    /// Tone currently on air
    #[must_use]
    pub const fn tone(&self) -> AfskTone {
        self.nrzi.tone()
    }

    /// Bit source position
    #[must_use]
    pub const fn bits(&self) -> &PacketBits {
        &self.bits
    }
}

/// Chip-clocked GFSK: the chip asks for each data level on its clock edge
#[derive(Clone, Copy, Debug, Default)]
pub struct OrdinaryGfsk {
    bits: PacketBits,
    nrzi: Nrzi,
    finished: bool,
}

impl OrdinaryGfsk {
    /// Engine before the first bit
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bits: PacketBits::new(),
            nrzi: Nrzi::new(),
            finished: false,
        }
    }

    /// Level for the next data clock, high on the 1200 Hz tone
    pub fn on_data_clock(&mut self, packet: &PacketView<'_>) -> Option<bool> {
        if self.finished {
            return None;
        }
        let Some(bit) = self.bits.next_bit(packet) else {
            self.finished = true;
            return None;
        };
        Some(self.nrzi.encode(bit) == AfskTone::Mark1200)
    }

    /// Packet exhausted
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Bit source position
    #[must_use]
    pub const fn bits(&self) -> &PacketBits {
        &self.bits
    }
}
