//! `Si4060` Transmitter Driver
//!
//! Register-level control of the Si4060 sub-GHz synthesizer/PA. The chip is
//! run in direct mode only: the MCU supplies all modulation by hopping the
//! PLL, writing the frequency offset, or driving GPIO1.
//!
//! Every command is preceded by a bounded CTS poll. Commands issued from
//! the main context use [`Poll::Init`]; the fast operations called from
//! tick handlers use [`Poll::Tight`] so a stalled chip cannot stretch a
//! tick. When the bound is exhausted nothing is written and the call
//! returns [`RadioError::ChipNotReady`].

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::{CTS_TICK_POLLS, CTS_TIMEOUT_POLLS, POWER_UP_DELAY_MS, XO_TUNE};
use crate::dsp::synth_calc::{self, PllCode, MAX_DEVIATION_CODE};
use crate::hal::spi::CommandBus;
use crate::types::{
    Band, ChipState, DirectMode, Frequency, ModulationType, PowerLevel, RadioError, RadioResult,
};

/// `Si4060` command codes
mod cmd {
    pub const PART_INFO: u8 = 0x01;
    pub const POWER_UP: u8 = 0x02;
    pub const FUNC_INFO: u8 = 0x10;
    pub const SET_PROPERTY: u8 = 0x11;
    pub const GPIO_PIN_CFG: u8 = 0x13;
    pub const GET_ADC_READING: u8 = 0x14;
    pub const START_TX: u8 = 0x31;
    pub const CHANGE_STATE: u8 = 0x34;
}

/// `Si4060` properties as (group, index)
mod prop {
    pub const GLOBAL_XO_TUNE: (u8, u8) = (0x00, 0x00);
    pub const MODEM_MOD_TYPE: (u8, u8) = (0x20, 0x00);
    pub const MODEM_DATA_RATE: (u8, u8) = (0x20, 0x03);
    pub const MODEM_TX_NCO_MODE: (u8, u8) = (0x20, 0x06);
    pub const MODEM_FREQ_DEV: (u8, u8) = (0x20, 0x0A);
    pub const MODEM_FREQ_OFFSET: (u8, u8) = (0x20, 0x0D);
    pub const MODEM_TX_FILTER_COEFF: (u8, u8) = (0x20, 0x0F);
    pub const MODEM_CLKGEN_BAND: (u8, u8) = (0x20, 0x51);
    pub const PA_MODE: (u8, u8) = (0x22, 0x00);
    pub const PA_PWR_LVL: (u8, u8) = (0x22, 0x01);
    pub const FREQ_CONTROL_INTE: (u8, u8) = (0x40, 0x00);
    pub const FREQ_CONTROL_CHANNEL_STEP_SIZE: (u8, u8) = (0x40, 0x04);
}

/// Longest property payload the driver writes (Gaussian filter taps)
const MAX_PROPERTY_LEN: usize = 9;

/// `POWER_UP` boot option: start the EZRadio application image
const BOOT_EZRADIO: u8 = 0x01;

/// `POWER_UP` XTAL option: external TCXO
const XTAL_TCXO: u8 = 0x01;

/// `MODEM_CLKGEN_BAND` SY_SEL bit (high-performance synthesizer)
const CLKGEN_SY_SEL: u8 = 0x08;

/// `GET_ADC_READING` input select: temperature sensor
const ADC_TEMPERATURE: u8 = 0x10;

/// `MODEM_DATA_RATE` is a 24-bit field
const MAX_DATA_RATE_FIELD: u32 = 0x00FF_FFFF;

/// Default Gaussian filter taps for 2GFSK (BT = 0.5)
pub const GAUSSIAN_TAPS: [u8; 9] = [0x67, 0x60, 0x4D, 0x36, 0x21, 0x11, 0x08, 0x03, 0x01];

/// GPIO pin functions for `GPIO_PIN_CFG`
pub mod gpio {
    /// Leave the pin unchanged
    pub const DONOTHING: u8 = 0x00;
    /// Tristate
    pub const TRISTATE: u8 = 0x01;
    /// Drive low
    pub const DRIVE0: u8 = 0x02;
    /// Drive high
    pub const DRIVE1: u8 = 0x03;
    /// Input (direct-mode TX data)
    pub const INPUT: u8 = 0x04;
    /// TX data clock output
    pub const TX_DATA_CLK: u8 = 0x10;
}

/// Bound on the CTS poll preceding a command
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Poll {
    /// Main-context bound
    Init,
    /// Tick-handler bound
    Tight,
}

impl Poll {
    /// Maximum number of `READ_CMD_BUFF` attempts
    #[must_use]
    pub const fn limit(self) -> u32 {
        match self {
            Self::Init => CTS_TIMEOUT_POLLS,
            Self::Tight => CTS_TICK_POLLS,
        }
    }
}

/// `PART_INFO` response
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartInfo {
    /// Chip mask revision
    pub chip_rev: u8,
    /// Part number (0x4060)
    pub part: u16,
    /// Part build
    pub build: u8,
    /// Chip ID
    pub id: u16,
    /// Customer ID
    pub customer: u8,
    /// ROM ID
    pub rom_id: u8,
}

impl PartInfo {
    fn from_response(r: &[u8; 8]) -> Self {
        Self {
            chip_rev: r[0],
            part: u16::from_be_bytes([r[1], r[2]]),
            build: r[3],
            id: u16::from_be_bytes([r[4], r[5]]),
            customer: r[6],
            rom_id: r[7],
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for PartInfo {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Si{:04X} rev {} rom {}",
            self.part,
            self.chip_rev,
            self.rom_id
        );
    }
}

/// `FUNC_INFO` response
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FuncInfo {
    /// External firmware revision
    pub rev_ext: u8,
    /// Branch firmware revision
    pub rev_branch: u8,
    /// Internal firmware revision
    pub rev_int: u8,
    /// Applied patch ID
    pub patch: u16,
    /// Functional mode
    pub func: u8,
}

impl FuncInfo {
    fn from_response(r: &[u8; 6]) -> Self {
        Self {
            rev_ext: r[0],
            rev_branch: r[1],
            rev_int: r[2],
            patch: u16::from_be_bytes([r[3], r[4]]),
            func: r[5],
        }
    }
}

/// Convert a temperature ADC reading to degrees Celsius
#[must_use]
pub fn temperature_from_adc(adc: u16) -> i16 {
    let celsius = 899 * i32::from(adc) / 4096 - 293;
    celsius as i16
}

/// Operations the transmission engines perform on the synthesizer
///
/// Frequencies are carriers in Hz. Deviation, offset and step arguments
/// are converted with the OUTDIV of the carrier last set through
/// [`RadioControl::set_frequency`].
pub trait RadioControl {
    /// Program band and PLL for a carrier (slow path, before a burst)
    ///
    /// # Errors
    ///
    /// [`RadioError::FrequencyOutOfRange`], or any transport error.
    fn set_frequency(&mut self, hz: u32) -> RadioResult<()>;

    /// PLL code for a carrier inside the current band
    ///
    /// # Errors
    ///
    /// [`RadioError::FrequencyOutOfRange`] if `hz` is outside the
    /// synthesizer span or would need a different output divider.
    fn pll_code(&self, hz: u32) -> RadioResult<PllCode>;

    /// Write a precomputed PLL code (fast path, tick handlers)
    ///
    /// # Errors
    ///
    /// [`RadioError::ChipNotReady`] if the tight CTS poll is exhausted.
    fn hop(&mut self, code: PllCode) -> RadioResult<()>;

    /// Move the carrier without touching the band (fast path)
    ///
    /// # Errors
    ///
    /// Same as [`RadioControl::pll_code`] and [`RadioControl::hop`].
    fn set_frequency_fast(&mut self, hz: u32) -> RadioResult<()> {
        let code = self.pll_code(hz)?;
        self.hop(code)
    }

    /// Peak deviation in Hz
    ///
    /// # Errors
    ///
    /// Any transport error.
    fn set_deviation(&mut self, hz: u32) -> RadioResult<()>;

    /// Raw `MODEM_FREQ_DEV` code (fast path, pre-emphasis)
    ///
    /// # Errors
    ///
    /// [`RadioError::ChipNotReady`] if the tight CTS poll is exhausted.
    fn set_deviation_code(&mut self, code: u32) -> RadioResult<()>;

    /// Static frequency offset in Hz
    ///
    /// # Errors
    ///
    /// Any transport error.
    fn set_frequency_offset(&mut self, hz: u32) -> RadioResult<()>;

    /// Raw `MODEM_FREQ_OFFSET` code (fast path, lookup samples)
    ///
    /// # Errors
    ///
    /// [`RadioError::ChipNotReady`] if the tight CTS poll is exhausted.
    fn set_frequency_offset_fast(&mut self, code: u16) -> RadioResult<()>;

    /// Channel spacing in Hz
    ///
    /// # Errors
    ///
    /// Any transport error.
    fn set_channel_step(&mut self, hz: u32) -> RadioResult<()>;

    /// Modulation type with direct data on GPIO1
    ///
    /// # Errors
    ///
    /// Any transport error.
    fn set_modulation(&mut self, modulation: ModulationType, mode: DirectMode) -> RadioResult<()>;

    /// PA drive level
    ///
    /// # Errors
    ///
    /// Any transport error.
    fn set_power_level(&mut self, level: PowerLevel) -> RadioResult<()>;

    /// Direct-mode data rate in bits per second
    ///
    /// # Errors
    ///
    /// [`RadioError::InvalidRate`] if ten times `bps` does not fit the
    /// 24-bit rate field; nothing is written. Any transport error.
    fn set_data_rate(&mut self, bps: u32) -> RadioResult<()>;

    /// Move the chip to another operating state
    ///
    /// # Errors
    ///
    /// Any transport error.
    fn request_state_change(&mut self, state: ChipState) -> RadioResult<()>;

    /// Enter TX on a channel
    ///
    /// # Errors
    ///
    /// Any transport error.
    fn start_tx(&mut self, channel: u8) -> RadioResult<()>;

    /// On-chip temperature in degrees Celsius
    ///
    /// # Errors
    ///
    /// Any transport error.
    fn read_temperature(&mut self) -> RadioResult<i16>;
}

/// `Si4060` driver
pub struct Si4060<BUS, SDN, TCXO> {
    bus: BUS,
    sdn: SDN,
    tcxo: TCXO,
    xo_hz: u32,
    /// Band of the last programmed carrier (chip reset value: OUTDIV 4)
    band: Band,
    frequency: Option<Frequency>,
    power: PowerLevel,
    modulation: ModulationType,
}

impl<BUS, SDN, TCXO> Si4060<BUS, SDN, TCXO>
where
    BUS: CommandBus,
    SDN: OutputPin,
    TCXO: OutputPin,
{
    /// Create a driver; the chip is not touched until [`Si4060::init`]
    pub fn new(bus: BUS, sdn: SDN, tcxo: TCXO, xo_hz: u32) -> Self {
        Self {
            bus,
            sdn,
            tcxo,
            xo_hz,
            band: Band::Div4,
            frequency: None,
            power: PowerLevel::default(),
            modulation: ModulationType::default(),
        }
    }

    /// Power the TCXO, release shutdown and boot the chip
    ///
    /// # Errors
    ///
    /// Returns an error if a control line fails or the chip never
    /// reports CTS after power-up.
    pub fn init(&mut self, delay: &mut impl DelayNs) -> RadioResult<PartInfo> {
        self.tcxo.set_high().map_err(|_| RadioError::Pin)?;
        self.sdn.set_low().map_err(|_| RadioError::Pin)?;
        delay.delay_ms(POWER_UP_DELAY_MS);

        let xo = self.xo_hz.to_be_bytes();
        self.bus.send(&[
            cmd::POWER_UP,
            BOOT_EZRADIO,
            XTAL_TCXO,
            xo[0],
            xo[1],
            xo[2],
            xo[3],
        ])?;
        self.wait_cts(Poll::Init, &mut [])?;

        self.set_property(Poll::Init, prop::GLOBAL_XO_TUNE, &[XO_TUNE])?;
        self.band = Band::Div4;
        self.frequency = None;

        let info = self.part_info()?;
        log_info!("Si4060 up: {}", info);
        Ok(info)
    }

    /// Put the chip to sleep and cut its power
    ///
    /// # Errors
    ///
    /// Returns [`RadioError::Pin`] if SDN or the TCXO line fails. A chip
    /// that does not answer the sleep request is shut down anyway.
    pub fn deinit(&mut self) -> RadioResult<()> {
        if let Err(_e) = self.request_state_change(ChipState::Sleep) {
            log_warn!("Si4060 sleep request failed: {}", _e);
        }
        self.sdn.set_high().map_err(|_| RadioError::Pin)?;
        self.tcxo.set_low().map_err(|_| RadioError::Pin)?;
        self.frequency = None;
        Ok(())
    }

    /// Configure GPIO0..3, NIRQ and SDO functions
    ///
    /// # Errors
    ///
    /// Any transport error.
    pub fn setup_pins(
        &mut self,
        gpio: [u8; 4],
        nirq: u8,
        sdo: u8,
    ) -> RadioResult<()> {
        self.command(
            Poll::Init,
            &[
                cmd::GPIO_PIN_CFG,
                gpio[0],
                gpio[1],
                gpio[2],
                gpio[3],
                nirq,
                sdo,
                0x00,
            ],
        )
    }

    /// Select the PA output stage and mode
    ///
    /// # Errors
    ///
    /// Any transport error.
    pub fn set_pa_mode(&mut self, pa_sel: u8, pa_mode: u8) -> RadioResult<()> {
        let value = ((pa_sel & 0x0F) << 2) | (pa_mode & 0x01);
        self.set_property(Poll::Init, prop::PA_MODE, &[value])
    }

    /// Load the nine Gaussian TX filter taps
    ///
    /// # Errors
    ///
    /// Any transport error.
    pub fn load_filter_coeffs(&mut self, taps: &[u8; 9]) -> RadioResult<()> {
        self.set_property(Poll::Init, prop::MODEM_TX_FILTER_COEFF, taps)
    }

    /// Read the part number and revision
    ///
    /// # Errors
    ///
    /// Any transport error.
    pub fn part_info(&mut self) -> RadioResult<PartInfo> {
        let mut response = [0u8; 8];
        self.query(&[cmd::PART_INFO], &mut response)?;
        Ok(PartInfo::from_response(&response))
    }

    /// Read the firmware revision
    ///
    /// # Errors
    ///
    /// Any transport error.
    pub fn func_info(&mut self) -> RadioResult<FuncInfo> {
        let mut response = [0u8; 6];
        self.query(&[cmd::FUNC_INFO], &mut response)?;
        Ok(FuncInfo::from_response(&response))
    }

    /// Carrier last set with [`RadioControl::set_frequency`]
    #[must_use]
    pub const fn frequency(&self) -> Option<Frequency> {
        self.frequency
    }

    /// Band used for deviation and offset maths
    #[must_use]
    pub const fn band(&self) -> Band {
        self.band
    }

    /// Last PA drive level written
    #[must_use]
    pub const fn power_level(&self) -> PowerLevel {
        self.power
    }

    /// Last modulation type written
    #[must_use]
    pub const fn modulation(&self) -> ModulationType {
        self.modulation
    }

    /// Release the bus and control lines
    pub fn release(self) -> (BUS, SDN, TCXO) {
        (self.bus, self.sdn, self.tcxo)
    }

    /// Poll until CTS, filling `response`
    fn wait_cts(&mut self, poll: Poll, response: &mut [u8]) -> RadioResult<()> {
        for _ in 0..poll.limit() {
            if self.bus.poll_cts(response)? {
                return Ok(());
            }
        }
        log_warn!("Si4060 CTS timeout ({} polls)", poll.limit());
        Err(RadioError::ChipNotReady)
    }

    /// Wait for CTS, then send a frame
    fn command(&mut self, poll: Poll, frame: &[u8]) -> RadioResult<()> {
        self.wait_cts(poll, &mut [])?;
        self.bus.send(frame)
    }

    /// Send a command and collect its response
    fn query(&mut self, frame: &[u8], response: &mut [u8]) -> RadioResult<()> {
        self.command(Poll::Init, frame)?;
        self.wait_cts(Poll::Init, response)
    }

    /// `SET_PROPERTY` for consecutive properties starting at `property`
    fn set_property(&mut self, poll: Poll, property: (u8, u8), values: &[u8]) -> RadioResult<()> {
        debug_assert!(values.len() <= MAX_PROPERTY_LEN);
        let len = values.len().min(MAX_PROPERTY_LEN);
        let mut frame = [0u8; 4 + MAX_PROPERTY_LEN];
        frame[0] = cmd::SET_PROPERTY;
        frame[1] = property.0;
        frame[2] = len as u8;
        frame[3] = property.1;
        frame[4..4 + len].copy_from_slice(&values[..len]);
        self.command(poll, &frame[..4 + len])
    }

    fn write_deviation(&mut self, poll: Poll, code: u32) -> RadioResult<()> {
        let code = code.min(MAX_DEVIATION_CODE);
        let bytes = code.to_be_bytes();
        self.set_property(poll, prop::MODEM_FREQ_DEV, &[bytes[1] & 0x01, bytes[2], bytes[3]])
    }

    fn write_offset(&mut self, poll: Poll, code: u16) -> RadioResult<()> {
        self.set_property(poll, prop::MODEM_FREQ_OFFSET, &code.to_be_bytes())
    }

    fn outdiv(&self) -> u32 {
        self.band.outdiv()
    }
}

impl<BUS, SDN, TCXO> RadioControl for Si4060<BUS, SDN, TCXO>
where
    BUS: CommandBus,
    SDN: OutputPin,
    TCXO: OutputPin,
{
    fn set_frequency(&mut self, hz: u32) -> RadioResult<()> {
        let freq = Frequency::from_hz(hz).ok_or(RadioError::FrequencyOutOfRange(hz))?;
        let band = freq.band();
        let code = synth_calc::pll_code(freq, self.xo_hz);

        self.set_property(
            Poll::Init,
            prop::MODEM_CLKGEN_BAND,
            &[CLKGEN_SY_SEL | band.code()],
        )?;
        self.set_property(Poll::Init, prop::FREQ_CONTROL_INTE, &code.to_registers())?;

        self.band = band;
        self.frequency = Some(freq);
        log_debug!("carrier {} ({}) {}", freq, band, code);
        Ok(())
    }

    fn pll_code(&self, hz: u32) -> RadioResult<PllCode> {
        let freq = Frequency::from_hz(hz).ok_or(RadioError::FrequencyOutOfRange(hz))?;
        if self.frequency.is_some() && freq.band() != self.band {
            return Err(RadioError::FrequencyOutOfRange(hz));
        }
        Ok(synth_calc::pll_code(freq, self.xo_hz))
    }

    fn hop(&mut self, code: PllCode) -> RadioResult<()> {
        self.set_property(Poll::Tight, prop::FREQ_CONTROL_INTE, &code.to_registers())
    }

    fn set_deviation(&mut self, hz: u32) -> RadioResult<()> {
        let code = synth_calc::deviation_code(hz, self.xo_hz, self.outdiv());
        self.write_deviation(Poll::Init, code)
    }

    fn set_deviation_code(&mut self, code: u32) -> RadioResult<()> {
        self.write_deviation(Poll::Tight, code)
    }

    fn set_frequency_offset(&mut self, hz: u32) -> RadioResult<()> {
        let code = synth_calc::offset_code(hz, self.xo_hz, self.outdiv());
        self.write_offset(Poll::Init, code)
    }

    fn set_frequency_offset_fast(&mut self, code: u16) -> RadioResult<()> {
        self.write_offset(Poll::Tight, code)
    }

    fn set_channel_step(&mut self, hz: u32) -> RadioResult<()> {
        let code = synth_calc::channel_step_code(hz, self.xo_hz, self.outdiv());
        self.set_property(
            Poll::Init,
            prop::FREQ_CONTROL_CHANNEL_STEP_SIZE,
            &code.to_be_bytes(),
        )
    }

    fn set_modulation(&mut self, modulation: ModulationType, mode: DirectMode) -> RadioResult<()> {
        self.set_property(
            Poll::Init,
            prop::MODEM_MOD_TYPE,
            &[mode.mod_type_reg(modulation)],
        )?;
        self.modulation = modulation;
        Ok(())
    }

    fn set_power_level(&mut self, level: PowerLevel) -> RadioResult<()> {
        self.set_property(Poll::Init, prop::PA_PWR_LVL, &[level.code()])?;
        self.power = level;
        Ok(())
    }

    fn set_data_rate(&mut self, bps: u32) -> RadioResult<()> {
        // TXOSR 10x: the NCO runs at ten times the data rate
        let rate = bps
            .checked_mul(10)
            .filter(|&r| r <= MAX_DATA_RATE_FIELD)
            .ok_or(RadioError::InvalidRate(bps))?
            .to_be_bytes();
        let nco = (self.xo_hz & 0x03FF_FFFF).to_be_bytes();
        self.set_property(Poll::Init, prop::MODEM_TX_NCO_MODE, &nco)?;
        self.set_property(Poll::Init, prop::MODEM_DATA_RATE, &rate[1..])
    }

    fn request_state_change(&mut self, state: ChipState) -> RadioResult<()> {
        self.command(Poll::Init, &[cmd::CHANGE_STATE, state.code()])
    }

    fn start_tx(&mut self, channel: u8) -> RadioResult<()> {
        // Return to READY when TX completes, no packet length
        self.command(Poll::Init, &[cmd::START_TX, channel, 0x30, 0x00, 0x00])
    }

    fn read_temperature(&mut self) -> RadioResult<i16> {
        let mut response = [0u8; 6];
        self.query(&[cmd::GET_ADC_READING, ADC_TEMPERATURE], &mut response)?;
        let adc = u16::from_be_bytes([response[4], response[5]]);
        Ok(temperature_from_adc(adc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_conversion() {
        assert_eq!(temperature_from_adc(1000), -74);
        assert_eq!(temperature_from_adc(1500), 36);
    }

    #[test]
    fn part_info_layout() {
        let info = PartInfo::from_response(&[0x11, 0x40, 0x60, 0x00, 0x12, 0x34, 0x00, 0x06]);
        assert_eq!(info.part, 0x4060);
        assert_eq!(info.id, 0x1234);
        assert_eq!(info.rom_id, 6);
    }
}
