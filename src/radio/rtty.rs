//! RTTY Engine
//!
//! Serializes bytes into asynchronous start/data/stop bit timing. Each call
//! to [`RttyEngine::step`] is one bit period; the returned [`Tone`] is the
//! carrier to hold for that period.
//!
//! ```text
//!  PAUSE ─▶ STARTBIT ─▶ BYTE ×N ─▶ STOPBIT ×S ─▶ RELOAD ─┬─▶ STARTBIT
//!                │                                       │
//!                └──────────── buffer empty ─────────────┴─▶ WAIT
//! ```
//!
//! RELOAD spends one tick without emitting, so the line idles at mark
//! between characters. Data bits go out LSB first.

use embedded_hal::delay::DelayNs;

use crate::config::{
    RTTY_BAUD, RTTY_BIT_DELAY_MS, RTTY_DATA_BITS, RTTY_PAUSE_TICKS, RTTY_SHIFT_HZ, RTTY_STOP_BITS,
};
use crate::drivers::si4060::RadioControl;
use crate::dsp::synth_calc::PllCode;
use crate::types::{DataBits, Frequency, RadioError, RadioResult, StopBits, Tone};

/// Character framing and timing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RttyConfig {
    /// Bit rate of the interrupt variant
    pub baud: u32,
    /// Character width
    pub data_bits: DataBits,
    /// Stop bits per character
    pub stop_bits: StopBits,
    /// Idle ticks before the first character
    pub pause_ticks: u16,
    /// Mark offset above the carrier in Hz
    pub shift_hz: u32,
}

impl Default for RttyConfig {
    fn default() -> Self {
        Self {
            baud: RTTY_BAUD,
            data_bits: RTTY_DATA_BITS,
            stop_bits: RTTY_STOP_BITS,
            pause_ticks: RTTY_PAUSE_TICKS,
            shift_hz: RTTY_SHIFT_HZ,
        }
    }
}

/// Serializer state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RttyState {
    /// Inter-transmission gap
    Pause,
    /// Load the next byte and send the start bit
    StartBit,
    /// Sending data bits
    Byte,
    /// Holding the stop level
    StopBit,
    /// Between characters
    Reload,
    /// Buffer exhausted
    Wait,
}

#[cfg(feature = "embedded")]
impl defmt::Format for RttyState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Pause => defmt::write!(f, "PAUSE"),
            Self::StartBit => defmt::write!(f, "STARTBIT"),
            Self::Byte => defmt::write!(f, "BYTE"),
            Self::StopBit => defmt::write!(f, "STOPBIT"),
            Self::Reload => defmt::write!(f, "RELOAD"),
            Self::Wait => defmt::write!(f, "WAIT"),
        }
    }
}

/// Tick-driven RTTY serializer
///
/// The engine keeps only a read index into the caller's bytes; it never
/// reads at or past `data.len()`.
#[derive(Clone, Debug)]
pub struct RttyEngine {
    config: RttyConfig,
    state: RttyState,
    index: usize,
    byte: u8,
    bits_left: u8,
    stops_left: u8,
    pause_left: u16,
}

impl RttyEngine {
    /// Engine positioned before the first character
    #[must_use]
    pub const fn new(config: RttyConfig) -> Self {
        Self {
            config,
            state: RttyState::Pause,
            index: 0,
            byte: 0,
            bits_left: 0,
            stops_left: 0,
            pause_left: config.pause_ticks,
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> RttyState {
        self.state
    }

    /// Bytes loaded so far
    #[must_use]
    pub const fn bytes_sent(&self) -> usize {
        self.index
    }

    /// Reached WAIT
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == RttyState::Wait
    }

    /// Framing in use
    #[must_use]
    pub const fn config(&self) -> &RttyConfig {
        &self.config
    }

    /// Advance one bit period
    pub fn step(&mut self, data: &[u8]) -> Option<Tone> {
        if self.state == RttyState::Pause {
            if self.pause_left > 0 {
                self.pause_left -= 1;
                return None;
            }
            self.state = RttyState::StartBit;
        }

        match self.state {
            RttyState::StartBit => self.load(data).then_some(Tone::Space),
            RttyState::Byte => {
                let bit = self.byte & 0x01 != 0;
                self.byte >>= 1;
                self.bits_left = self.bits_left.saturating_sub(1);
                if self.bits_left == 0 {
                    self.state = RttyState::StopBit;
                    self.stops_left = self.config.stop_bits.count();
                }
                Some(Tone::from_bit(bit))
            }
            RttyState::StopBit => {
                self.stops_left = self.stops_left.saturating_sub(1);
                if self.stops_left == 0 {
                    self.state = RttyState::Reload;
                }
                Some(Tone::Mark)
            }
            RttyState::Reload => {
                self.state = if self.index < data.len() {
                    RttyState::StartBit
                } else {
                    RttyState::Wait
                };
                None
            }
            RttyState::Pause | RttyState::Wait => None,
        }
    }

    /// Load the next byte, or finish if there is none
    fn load(&mut self, data: &[u8]) -> bool {
        match data.get(self.index) {
            Some(&byte) => {
                self.index += 1;
                self.byte = byte;
                self.bits_left = self.config.data_bits.count();
                self.state = RttyState::Byte;
                true
            }
            None => {
                self.state = RttyState::Wait;
                false
            }
        }
    }
}

/// Precomputed PLL codes for the two RTTY tones
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RttyTones {
    /// Carrier + shift
    pub mark: PllCode,
    /// Carrier
    pub space: PllCode,
}

impl RttyTones {
    /// Compute both codes for a carrier
    ///
    /// # Errors
    ///
    /// [`RadioError::FrequencyOutOfRange`] if either tone is outside the
    /// current band.
    pub fn new<R: RadioControl + ?Sized>(radio: &R, carrier_hz: u32, shift_hz: u32) -> RadioResult<Self> {
        let mark_hz = carrier_hz
            .checked_add(shift_hz)
            .ok_or(RadioError::FrequencyOutOfRange(carrier_hz))?;
        Ok(Self {
            mark: radio.pll_code(mark_hz)?,
            space: radio.pll_code(carrier_hz)?,
        })
    }

    /// Check that both tones are valid carriers in one band
    ///
    /// # Errors
    ///
    /// [`RadioError::FrequencyOutOfRange`] naming the offending tone.
    pub fn check(carrier_hz: u32, shift_hz: u32) -> RadioResult<()> {
        let space = Frequency::from_hz(carrier_hz).ok_or(RadioError::FrequencyOutOfRange(carrier_hz))?;
        let mark_hz = carrier_hz
            .checked_add(shift_hz)
            .ok_or(RadioError::FrequencyOutOfRange(carrier_hz))?;
        match Frequency::from_hz(mark_hz) {
            Some(mark) if mark.band() == space.band() => Ok(()),
            _ => Err(RadioError::FrequencyOutOfRange(mark_hz)),
        }
    }

    /// Code for a tone
    #[must_use]
    pub const fn code(&self, tone: Tone) -> PllCode {
        match tone {
            Tone::Mark => self.mark,
            Tone::Space => self.space,
        }
    }
}

/// Send `data` as RTTY, pacing bits with `delay`
///
/// Blocks for the whole transmission. The radio must already be tuned
/// and transmitting on `carrier_hz`.
///
/// # Errors
///
/// Stops at the first radio error.
pub fn transmit_rtty_blocking<R, D>(
    radio: &mut R,
    data: &[u8],
    carrier_hz: u32,
    config: RttyConfig,
    delay: &mut D,
) -> RadioResult<()>
where
    R: RadioControl + ?Sized,
    D: DelayNs,
{
    let tones = RttyTones::new(radio, carrier_hz, config.shift_hz)?;
    let mut engine = RttyEngine::new(config);

    loop {
        let tone = engine.step(data);
        if engine.is_finished() {
            break;
        }
        if let Some(tone) = tone {
            radio.hop(tones.code(tone))?;
        }
        delay.delay_ms(RTTY_BIT_DELAY_MS);
    }
    Ok(())
}
