//! System configuration and hardware constants
//!
//! This module defines compile-time constants for the tracker transmitter.
//! Carrier frequencies, deviations, buffer capacities and every
//! clock-dependent timer value are centralized here. Timer values are
//! grouped into a [`ClockProfile`] so that they can only be changed
//! together.

use fixed::types::U16F16;

use crate::radio::aprs::AprsStrategy;
use crate::types::{DataBits, Frequency, PowerLevel, RadioError, RadioResult, StopBits};

/// Si4060 reference oscillator (TCXO) frequency
pub const TCXO_HZ: u32 = 32_000_000;

/// RTTY carrier (70cm)
pub const FREQUENCY_RTTY_HZ: u32 = 434_287_000;

/// APRS carrier (2m, region 1)
pub const FREQUENCY_APRS_HZ: u32 = 144_800_000;

/// Subtracted from the APRS carrier so the lookup modulation is centred on it
pub const LOOKUP_CENTER_OFFSET_HZ: u32 = 2985;

/// RTTY mark/space shift
pub const RTTY_SHIFT_HZ: u32 = 450;

/// APRS peak deviation for the ordinary GFSK mode
pub const APRS_DEVIATION_HZ: u32 = 3500;

/// Deviation code while sending the 1200 Hz tone (manual pre-emphasis)
pub const PREEMPHASIS_DEVIATION_1200: u32 = 324;

/// Deviation code while sending the 2200 Hz tone (manual pre-emphasis)
pub const PREEMPHASIS_DEVIATION_2200: u32 = 589;

/// PA drive code (0x2A: ~10.3 dBm, 17 mA at 434 MHz)
pub const POWER_LEVEL: PowerLevel = PowerLevel::from_code(0x2A);

/// Crystal tuning capacitor code (unused with a TCXO)
pub const XO_TUNE: u8 = 0x00;

/// CTS polls allowed for commands issued from the main context
pub const CTS_TIMEOUT_POLLS: u32 = 15_000;

/// CTS polls allowed for writes issued from a tick handler
pub const CTS_TICK_POLLS: u32 = 64;

/// Time the chip needs after POWER_UP before it answers
pub const POWER_UP_DELAY_MS: u32 = 10;

/// Bit period of the blocking RTTY variant
pub const RTTY_BIT_DELAY_MS: u32 = 5;

/// RTTY baud rate for the interrupt variant
pub const RTTY_BAUD: u32 = 300;

/// Timer ticks to wait before each RTTY transmission
pub const RTTY_PAUSE_TICKS: u16 = 0;

/// RTTY character width
pub const RTTY_DATA_BITS: DataBits = DataBits::Eight;

/// RTTY stop bits
pub const RTTY_STOP_BITS: StopBits = StopBits::Two;

/// RTTY transmit buffer capacity
pub const TX_BUFFER_SIZE: usize = 330;

/// APRS packet buffer capacity
pub const APRS_BUFFER_SIZE: usize = 350;

/// APRS bit rate
pub const APRS_BAUD: u32 = 1200;

/// Modulation used for APRS frames
pub const APRS_STRATEGY: AprsStrategy = AprsStrategy::GfskSync;

/// Chip data rate in GFSK-sync mode (one chip bit per TC0 tick)
pub const GFSK_SYNC_DATA_RATE: u32 = 26_400;

/// GFSK-sync ticks per 1200 baud bit
pub const GFSK_SYNC_TICKS_PER_BIT: u8 = 22;

/// GFSK-sync ticks per half period of the 1200 Hz tone
pub const GFSK_SYNC_HALF_PERIOD_1200: u8 = 11;

/// GFSK-sync ticks per half period of the 2200 Hz tone
pub const GFSK_SYNC_HALF_PERIOD_2200: u8 = 6;

/// Table multiplier giving the 1200 Hz tone its modulation width
pub const LOOKUP_TBL_MULTIPLIER_1200: U16F16 = U16F16::lit("2.50");

/// Table multiplier giving the 2200 Hz tone its modulation width
pub const LOOKUP_TBL_MULTIPLIER_2200: U16F16 = U16F16::lit("4.60");

/// Offset code centring the narrower 1200 Hz tone inside the 2200 Hz one
pub const LOOKUP_TBL_MULTIPLIER_OFFSET: u16 = 268;

/// Timer clock selection (`TC_CMRx` TCCLKS)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerClock {
    /// MCK/2
    Clock1,
    /// MCK/8
    Clock2,
    /// MCK/32
    Clock3,
    /// MCK/128
    Clock4,
    /// Slow clock (32768 Hz)
    Clock5,
}

impl TimerClock {
    /// Slow clock frequency
    pub const SLOW_CLOCK_HZ: u32 = 32_768;

    /// Register code
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Clock1 => 0,
            Self::Clock2 => 1,
            Self::Clock3 => 2,
            Self::Clock4 => 3,
            Self::Clock5 => 4,
        }
    }

    /// Counter input frequency for a given master clock
    #[must_use]
    pub const fn input_hz(self, mck_hz: u32) -> u32 {
        match self {
            Self::Clock1 => mck_hz / 2,
            Self::Clock2 => mck_hz / 8,
            Self::Clock3 => mck_hz / 32,
            Self::Clock4 => mck_hz / 128,
            Self::Clock5 => Self::SLOW_CLOCK_HZ,
        }
    }
}

/// One timer's clock selection and compare value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerSetting {
    /// Counter clock
    pub clock: TimerClock,
    /// Compare (reload) value
    pub compare: u16,
}

impl TimerSetting {
    /// Create a setting
    #[must_use]
    pub const fn new(clock: TimerClock, compare: u16) -> Self {
        Self { clock, compare }
    }

    /// Resulting interrupt rate, 0 for a zero compare value
    #[must_use]
    pub const fn tick_hz(self, mck_hz: u32) -> u32 {
        match self.clock.input_hz(mck_hz).checked_div(self.compare as u32) {
            Some(hz) => hz,
            None => 0,
        }
    }
}

/// Compare value for an RTTY baud rate, rounded to the nearest count
///
/// `None` when the rounded count is zero or does not fit the 16-bit
/// counter.
#[must_use]
pub const fn rtty_compare_value(mck_hz: u32, clock: TimerClock, baud: u32) -> Option<u16> {
    if baud == 0 {
        return None;
    }
    let input = clock.input_hz(mck_hz) as u64;
    let count = (input + baud as u64 / 2) / baud as u64;
    if count == 0 || count > u16::MAX as u64 {
        return None;
    }
    Some(count as u16)
}

/// Every clock-dependent timing value for one master clock
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockProfile {
    /// Master clock
    pub mck_hz: u32,
    /// Counter clock used for RTTY bit timing
    pub rtty_clock: TimerClock,
    /// TC0 in GFSK-sync mode (~26400 Hz)
    pub gfsk_sync_tc0: TimerSetting,
    /// TC0 in lookup mode (1200 Hz bit clock)
    pub lookup_tc0: TimerSetting,
    /// TC1 in lookup mode (table stepping clock)
    pub lookup_tc1: TimerSetting,
    /// Table step for the 1200 Hz tone
    pub table_step_1200: u8,
    /// Table step for the 2200 Hz tone
    pub table_step_2200: u8,
}

impl ClockProfile {
    /// 12 MHz crystal. TC1 runs at half speed with doubled table steps.
    pub const MCK_12MHZ: Self = Self {
        mck_hz: 12_000_000,
        rtty_clock: TimerClock::Clock2,
        gfsk_sync_tc0: TimerSetting::new(TimerClock::Clock1, 227),
        lookup_tc0: TimerSetting::new(TimerClock::Clock1, 5000),
        lookup_tc1: TimerSetting::new(TimerClock::Clock1, 552),
        table_step_1200: 28,
        table_step_2200: 52,
    };

    /// 16 MHz crystal. TC1 runs at half speed with doubled table steps.
    pub const MCK_16MHZ: Self = Self {
        mck_hz: 16_000_000,
        rtty_clock: TimerClock::Clock2,
        gfsk_sync_tc0: TimerSetting::new(TimerClock::Clock1, 303),
        lookup_tc0: TimerSetting::new(TimerClock::Clock1, 6667),
        lookup_tc1: TimerSetting::new(TimerClock::Clock1, 736),
        table_step_1200: 28,
        table_step_2200: 52,
    };

    /// 64 MHz PLL
    pub const MCK_64MHZ: Self = Self {
        mck_hz: 64_000_000,
        rtty_clock: TimerClock::Clock4,
        gfsk_sync_tc0: TimerSetting::new(TimerClock::Clock2, 303),
        lookup_tc0: TimerSetting::new(TimerClock::Clock2, 6667),
        lookup_tc1: TimerSetting::new(TimerClock::Clock2, 368),
        table_step_1200: 14,
        table_step_2200: 26,
    };

    /// RTTY bit timer for a baud rate
    ///
    /// # Errors
    ///
    /// [`RadioError::InvalidRate`] if the rate has no compare value on
    /// this profile's RTTY clock.
    pub const fn rtty_timer(&self, baud: u32) -> RadioResult<TimerSetting> {
        match rtty_compare_value(self.mck_hz, self.rtty_clock, baud) {
            Some(compare) => Ok(TimerSetting::new(self.rtty_clock, compare)),
            None => Err(RadioError::InvalidRate(baud)),
        }
    }

    /// Table stepping rate in lookup mode
    #[must_use]
    pub const fn lookup_sample_hz(&self) -> u32 {
        self.lookup_tc1.tick_hz(self.mck_hz)
    }
}

/// Active clock profile
#[cfg(feature = "mck-64mhz")]
pub const CLOCK_PROFILE: ClockProfile = ClockProfile::MCK_64MHZ;

/// Active clock profile
#[cfg(all(feature = "mck-16mhz", not(feature = "mck-64mhz")))]
pub const CLOCK_PROFILE: ClockProfile = ClockProfile::MCK_16MHZ;

/// Active clock profile
#[cfg(not(any(feature = "mck-16mhz", feature = "mck-64mhz")))]
pub const CLOCK_PROFILE: ClockProfile = ClockProfile::MCK_12MHZ;

/// Pin assignments for GPIO
pub mod pins {
    //! GPIO pin assignments matching the tracker schematic

    /// Si4060 shutdown (high = off)
    pub const SI4060_SDN: &str = "PB0";

    /// TCXO supply enable (high = on)
    pub const TCXO_EN: &str = "PB1";

    /// Si4060 GPIO1, direct-mode TX data input
    pub const SI4060_GPIO1: &str = "PB4";

    /// Si4060 GPIO0, TX data clock output (ordinary GFSK)
    pub const SI4060_GPIO0: &str = "PB6";

    /// SPI1 chip select (NSEL)
    pub const SPI1_NSEL: &str = "PA4";

    /// SPI1 clock
    pub const SPI1_SCK: &str = "PA5";

    /// SPI1 MISO
    pub const SPI1_MISO: &str = "PA6";

    /// SPI1 MOSI
    pub const SPI1_MOSI: &str = "PA7";
}

/// Timer assignments
pub mod timers {
    //! Hardware timer assignments

    /// TC0: RTTY bits, GFSK-sync chip bits, lookup bit clock
    pub const TC0: u8 = 2;

    /// TC1: lookup table stepping
    pub const TC1: u8 = 3;

    /// Embassy time driver
    pub const TIME_DRIVER: u8 = 15;
}

/// Build the RTTY carrier
#[must_use]
pub const fn rtty_frequency() -> Option<Frequency> {
    Frequency::from_hz(FREQUENCY_RTTY_HZ)
}

/// Build the APRS carrier
#[must_use]
pub const fn aprs_frequency() -> Option<Frequency> {
    Frequency::from_hz(FREQUENCY_APRS_HZ)
}
