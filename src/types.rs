//! Shared types used across the tracker firmware
//!
//! This module defines domain-specific types that enforce invariants
//! at compile time and provide type safety throughout the codebase.

use core::fmt;

/// Carrier frequency in Hertz with validation
///
/// Represents a frequency the Si4060 synthesizer can produce.
/// The frequency is stored in Hz for precision.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Frequency(u32);

impl Frequency {
    /// Minimum synthesizer frequency (142 MHz)
    pub const MIN_HZ: u32 = 142_000_000;

    /// Maximum synthesizer frequency (1050 MHz)
    pub const MAX_HZ: u32 = 1_050_000_000;

    /// Create a new Frequency from Hz, returns None if out of range
    #[must_use]
    pub const fn from_hz(hz: u32) -> Option<Self> {
        if hz >= Self::MIN_HZ && hz <= Self::MAX_HZ {
            Some(Self(hz))
        } else {
            None
        }
    }

    /// Create a new Frequency from kHz
    #[must_use]
    pub const fn from_khz(khz: u32) -> Option<Self> {
        match khz.checked_mul(1000) {
            Some(hz) => Self::from_hz(hz),
            None => None,
        }
    }

    /// Get the frequency in Hz
    #[must_use]
    pub const fn as_hz(self) -> u32 {
        self.0
    }

    /// Get the frequency in kHz (truncated)
    #[must_use]
    pub const fn as_khz(self) -> u32 {
        self.0 / 1000
    }

    /// Get the frequency in MHz as floating point
    #[must_use]
    pub fn as_mhz_f32(self) -> f32 {
        self.0 as f32 / 1_000_000.0
    }

    /// Shift by a signed number of Hz, staying inside the synthesizer range
    #[must_use]
    pub const fn offset_by(self, hz: i32) -> Option<Self> {
        match self.0.checked_add_signed(hz) {
            Some(shifted) => Self::from_hz(shifted),
            None => None,
        }
    }

    /// Output divider band this carrier falls in
    #[must_use]
    pub const fn band(self) -> Band {
        Band::from_frequency(self)
    }
}

impl fmt::Debug for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frequency({} Hz)", self.0)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Frequency {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{} Hz", self.0);
    }
}

/// Synthesizer output divider band
///
/// The Si4060 VCO runs at a fixed range; the output divider (OUTDIV)
/// brings it down to the carrier. Each divider has a band code written
/// to `MODEM_CLKGEN_BAND`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Band {
    /// OUTDIV 4 (705 - 1050 MHz)
    Div4,
    /// OUTDIV 6 (525 - 705 MHz)
    Div6,
    /// OUTDIV 8 (353 - 525 MHz)
    Div8,
    /// OUTDIV 12 (239 - 353 MHz)
    Div12,
    /// OUTDIV 16 (177 - 239 MHz)
    Div16,
    /// OUTDIV 24 (142 - 177 MHz)
    Div24,
}

impl Band {
    /// Get the band for a given frequency
    #[must_use]
    pub const fn from_frequency(freq: Frequency) -> Self {
        let hz = freq.as_hz();
        if hz >= 705_000_000 {
            Self::Div4
        } else if hz >= 525_000_000 {
            Self::Div6
        } else if hz >= 353_000_000 {
            Self::Div8
        } else if hz >= 239_000_000 {
            Self::Div12
        } else if hz >= 177_000_000 {
            Self::Div16
        } else {
            Self::Div24
        }
    }

    /// Output divider value
    #[must_use]
    pub const fn outdiv(self) -> u32 {
        match self {
            Self::Div4 => 4,
            Self::Div6 => 6,
            Self::Div8 => 8,
            Self::Div12 => 12,
            Self::Div16 => 16,
            Self::Div24 => 24,
        }
    }

    /// Band code for `MODEM_CLKGEN_BAND` (bits 2:0)
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Div4 => 0,
            Self::Div6 => 1,
            Self::Div8 => 2,
            Self::Div12 => 3,
            Self::Div16 => 4,
            Self::Div24 => 5,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Band {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "OUTDIV{}", self.outdiv());
    }
}

/// PA power level (`PA_PWR_LVL` DDAC code)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PowerLevel(u8);

impl PowerLevel {
    /// Lowest drive
    pub const MIN: Self = Self(0);

    /// Highest drive (7-bit register)
    pub const MAX: Self = Self(0x7F);

    /// Create a power level from the DDAC code, clamped to 7 bits
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        if code > 0x7F {
            Self(0x7F)
        } else {
            Self(code)
        }
    }

    /// Get the register code
    #[must_use]
    pub const fn code(self) -> u8 {
        self.0
    }
}

impl Default for PowerLevel {
    fn default() -> Self {
        Self(0x2A) // ~10 dBm at 434 MHz
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for PowerLevel {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "PWR 0x{:02X}", self.0);
    }
}

/// Modulation type (`MODEM_MOD_TYPE` bits 2:0)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ModulationType {
    /// Unmodulated carrier
    #[default]
    Cw,
    /// On-off keying
    Ook,
    /// Two-level FSK
    Fsk2,
    /// Two-level Gaussian FSK
    Gfsk2,
}

impl ModulationType {
    /// Register code
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Cw => 0,
            Self::Ook => 1,
            Self::Fsk2 => 2,
            Self::Gfsk2 => 3,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ModulationType {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Cw => defmt::write!(f, "CW"),
            Self::Ook => defmt::write!(f, "OOK"),
            Self::Fsk2 => defmt::write!(f, "2FSK"),
            Self::Gfsk2 => defmt::write!(f, "2GFSK"),
        }
    }
}

/// Direct-mode data sampling
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DirectMode {
    /// Chip samples the data pin on its own data clock
    Sync,
    /// Chip follows the data pin immediately
    #[default]
    Async,
}

impl DirectMode {
    /// Build the full `MODEM_MOD_TYPE` value for a modulation in this mode
    ///
    /// Source is always direct (bits 4:3 = 1) with data on GPIO1
    /// (bits 6:5 = 1).
    #[must_use]
    pub const fn mod_type_reg(self, modulation: ModulationType) -> u8 {
        let async_bit = match self {
            Self::Sync => 0,
            Self::Async => 0x80,
        };
        async_bit | (1 << 5) | (1 << 3) | modulation.code()
    }
}

/// Chip operating state for `CHANGE_STATE`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChipState {
    /// Keep the current state
    NoChange,
    /// Lowest power with configuration retained
    Sleep,
    /// SPI active, oscillator running
    SpiActive,
    /// Ready, synthesizer off
    Ready,
    /// Synthesizer locked, PA off
    TxTune,
    /// Transmitting
    Tx,
}

impl ChipState {
    /// Command argument
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::NoChange => 0,
            Self::Sleep => 1,
            Self::SpiActive => 2,
            Self::Ready => 3,
            Self::TxTune => 5,
            Self::Tx => 7,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ChipState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::NoChange => defmt::write!(f, "NOCHANGE"),
            Self::Sleep => defmt::write!(f, "SLEEP"),
            Self::SpiActive => defmt::write!(f, "SPI_ACTIVE"),
            Self::Ready => defmt::write!(f, "READY"),
            Self::TxTune => defmt::write!(f, "TX_TUNE"),
            Self::Tx => defmt::write!(f, "TX"),
        }
    }
}

/// RTTY symbol
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    /// Logical 1 and stop bits (carrier + shift)
    Mark,
    /// Logical 0 and start bit (carrier)
    Space,
}

impl Tone {
    /// Tone for a data bit
    #[must_use]
    pub const fn from_bit(bit: bool) -> Self {
        if bit {
            Self::Mark
        } else {
            Self::Space
        }
    }
}

/// APRS AFSK tone
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AfskTone {
    /// 1200 Hz
    #[default]
    Mark1200,
    /// 2200 Hz
    Space2200,
}

impl AfskTone {
    /// The other tone (NRZI toggle)
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Mark1200 => Self::Space2200,
            Self::Space2200 => Self::Mark1200,
        }
    }

    /// Audio frequency of the tone
    #[must_use]
    pub const fn hz(self) -> u32 {
        match self {
            Self::Mark1200 => 1200,
            Self::Space2200 => 2200,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for AfskTone {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}Hz", self.hz());
    }
}

/// RTTY character width
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DataBits {
    /// 7-bit ASCII
    Seven,
    /// 8-bit ASCII
    #[default]
    Eight,
}

impl DataBits {
    /// Number of data bits per character
    #[must_use]
    pub const fn count(self) -> u8 {
        match self {
            Self::Seven => 7,
            Self::Eight => 8,
        }
    }
}

/// RTTY stop bit count
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StopBits {
    /// One stop bit
    One,
    /// Two stop bits
    #[default]
    Two,
}

impl StopBits {
    /// Number of bit periods the stop level is held
    #[must_use]
    pub const fn count(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

/// Which interrupt-mode variant is (or was) active
///
/// The discriminants match the selector codes of the timer handlers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeTag {
    /// Timer-driven RTTY
    RttyInterrupt = 0,
    /// APRS, synchronous GFSK on one timer
    GfskSync = 1,
    /// APRS, chip-clocked ordinary GFSK
    OrdinaryGfsk = 2,
    /// APRS, sine lookup table on two timers
    Lookup = 3,
}

impl ModeTag {
    /// Selector code
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ModeTag {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::RttyInterrupt => defmt::write!(f, "RTTY_INTERRUPT"),
            Self::GfskSync => defmt::write!(f, "GFSK_SYNC"),
            Self::OrdinaryGfsk => defmt::write!(f, "ORDINARY_GFSK"),
            Self::Lookup => defmt::write!(f, "LOOKUP"),
        }
    }
}

/// Failure of a radio or transmission operation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RadioError {
    /// CTS was not asserted within the poll bound; nothing was written
    ChipNotReady,
    /// SPI transfer failed
    Bus(embedded_hal::spi::ErrorKind),
    /// A control line (SDN, TCXO, chip select, data) could not be driven
    Pin,
    /// Carrier outside the synthesizer range
    FrequencyOutOfRange(u32),
    /// Baud or data rate that the timer or modem cannot produce
    InvalidRate(u32),
    /// More bytes offered than the buffer holds
    BufferOverrun {
        /// Bytes offered
        requested: usize,
        /// Buffer capacity
        capacity: usize,
    },
    /// The engine has not released the buffer yet
    BufferInUse,
    /// APRS flag boundaries are not ordered inside the packet
    InvalidBoundaries {
        /// End of the leading flags
        flag_start: usize,
        /// Start of the trailing flags
        flag_end: usize,
        /// Packet length
        len: usize,
    },
    /// Tried to install an engine while a timer is still armed
    ModeConflict {
        /// Mode that still owns the timers
        active: Option<ModeTag>,
    },
}

/// Result alias for radio operations
pub type RadioResult<T> = Result<T, RadioError>;

#[cfg(feature = "embedded")]
impl defmt::Format for RadioError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::ChipNotReady => defmt::write!(f, "ChipNotReady"),
            Self::Bus(_) => defmt::write!(f, "Bus"),
            Self::Pin => defmt::write!(f, "Pin"),
            Self::FrequencyOutOfRange(hz) => defmt::write!(f, "FrequencyOutOfRange({})", hz),
            Self::InvalidRate(rate) => defmt::write!(f, "InvalidRate({})", rate),
            Self::BufferOverrun {
                requested,
                capacity,
            } => defmt::write!(f, "BufferOverrun({}/{})", requested, capacity),
            Self::BufferInUse => defmt::write!(f, "BufferInUse"),
            Self::InvalidBoundaries {
                flag_start,
                flag_end,
                len,
            } => defmt::write!(f, "InvalidBoundaries({}, {}, {})", flag_start, flag_end, len),
            Self::ModeConflict { active } => defmt::write!(f, "ModeConflict({})", active),
        }
    }
}
