//! Si4060 Driver Tests
//!
//! Command framing and CTS handling against a scripted command bus.
//! Run with: cargo test --target x86_64-unknown-linux-gnu --no-default-features --features std --test driver_tests

use std::collections::VecDeque;
use std::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};

use tracker_firmware::drivers::si4060::{Poll, RadioControl, Si4060, GAUSSIAN_TAPS};
use tracker_firmware::hal::spi::CommandBus;
use tracker_firmware::radio::ook::{transmit_ook_blips, OokBlips};
use tracker_firmware::types::{
    Band, ChipState, DirectMode, ModulationType, PowerLevel, RadioError, RadioResult,
};

// =============================================================================
// Test Doubles
// =============================================================================

/// Bus that asserts CTS after a scripted number of polls
#[derive(Default)]
struct ScriptedBus {
    /// Polls answered "busy" before each CTS
    busy_polls: u32,
    busy_left: u32,
    /// Responses handed out on successive CTS polls that ask for data
    responses: VecDeque<Vec<u8>>,
    frames: Vec<Vec<u8>>,
    polls: u32,
}

impl ScriptedBus {
    fn ready() -> Self {
        Self::default()
    }

    fn busy_for(polls: u32) -> Self {
        Self {
            busy_polls: polls,
            busy_left: polls,
            ..Self::default()
        }
    }

    fn with_response(mut self, response: &[u8]) -> Self {
        self.responses.push_back(response.to_vec());
        self
    }
}

impl CommandBus for ScriptedBus {
    fn send(&mut self, frame: &[u8]) -> RadioResult<()> {
        self.frames.push(frame.to_vec());
        self.busy_left = self.busy_polls;
        Ok(())
    }

    fn poll_cts(&mut self, response: &mut [u8]) -> RadioResult<bool> {
        self.polls += 1;
        if self.busy_left > 0 {
            self.busy_left -= 1;
            return Ok(false);
        }
        if !response.is_empty() {
            if let Some(data) = self.responses.pop_front() {
                response.copy_from_slice(&data[..response.len()]);
            }
        }
        Ok(true)
    }
}

/// Bus whose chip never answers
struct DeadBus {
    polls: u32,
    frames: usize,
}

impl CommandBus for DeadBus {
    fn send(&mut self, _frame: &[u8]) -> RadioResult<()> {
        self.frames += 1;
        Ok(())
    }

    fn poll_cts(&mut self, _response: &mut [u8]) -> RadioResult<bool> {
        self.polls += 1;
        Ok(false)
    }
}

#[derive(Default)]
struct Pin {
    high: bool,
}

impl ErrorType for Pin {
    type Error = Infallible;
}

impl OutputPin for Pin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.high = true;
        Ok(())
    }
}

#[derive(Default)]
struct NoDelay {
    total_ns: u64,
}

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

fn radio(bus: ScriptedBus) -> Si4060<ScriptedBus, Pin, Pin> {
    Si4060::new(bus, Pin { high: true }, Pin::default(), 32_000_000)
}

fn frames(radio: Si4060<ScriptedBus, Pin, Pin>) -> Vec<Vec<u8>> {
    radio.release().0.frames
}

// =============================================================================
// Power-up Tests
// =============================================================================

#[test]
fn init_boots_with_tcxo() {
    let bus = ScriptedBus::ready().with_response(&[0x11, 0x40, 0x60, 0x00, 0x00, 0x01, 0x00, 0x06]);
    let mut si = radio(bus);
    let mut delay = NoDelay::default();

    let info = si.init(&mut delay).unwrap();
    assert_eq!(info.part, 0x4060);
    assert!(delay.total_ns >= 10_000_000);

    let (bus, sdn, tcxo) = si.release();
    assert!(!sdn.high);
    assert!(tcxo.high);
    assert_eq!(bus.frames[0], [0x02, 0x01, 0x01, 0x01, 0xE8, 0x48, 0x00]);
    assert_eq!(bus.frames[1], [0x11, 0x00, 0x01, 0x00, 0x00]);
    assert_eq!(bus.frames[2], [0x01]);
}

#[test]
fn deinit_shuts_down_even_if_chip_is_silent() {
    let mut si = Si4060::new(DeadBus { polls: 0, frames: 0 }, Pin::default(), Pin { high: true }, 32_000_000);
    si.deinit().unwrap();
    let (bus, sdn, tcxo) = si.release();
    assert_eq!(bus.frames, 0);
    assert!(sdn.high);
    assert!(!tcxo.high);
}

#[test]
fn func_info_parses() {
    let bus = ScriptedBus::ready().with_response(&[2, 0, 6, 0x12, 0x34, 1]);
    let mut si = radio(bus);
    let info = si.func_info().unwrap();
    assert_eq!(info.rev_int, 6);
    assert_eq!(info.patch, 0x1234);
}

// =============================================================================
// Frequency Tests
// =============================================================================

#[test]
fn set_frequency_writes_band_then_pll() {
    let mut si = radio(ScriptedBus::ready());
    si.set_frequency(434_287_000).unwrap();
    assert_eq!(si.band(), Band::Div8);
    assert_eq!(si.frequency().unwrap().as_hz(), 434_287_000);

    let frames = frames(si);
    assert_eq!(frames[0], [0x11, 0x20, 0x01, 0x51, 0x0A]);
    assert_eq!(frames[1], [0x11, 0x40, 0x04, 0x00, 0x35, 0x0A, 0x49, 0x78]);
}

#[test]
fn set_frequency_rejects_out_of_range() {
    let mut si = radio(ScriptedBus::ready());
    assert_eq!(
        si.set_frequency(100_000_000),
        Err(RadioError::FrequencyOutOfRange(100_000_000))
    );
    assert!(frames(si).is_empty());
}

#[test]
fn fast_hop_writes_only_pll() {
    let mut si = radio(ScriptedBus::ready());
    si.set_frequency(144_800_000).unwrap();
    si.set_frequency_fast(144_800_000).unwrap();

    let frames = frames(si);
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[2], [0x11, 0x40, 0x04, 0x00, 0x35, 0x0A, 0x66, 0x66]);
}

#[test]
fn fast_hop_stays_in_band() {
    let mut si = radio(ScriptedBus::ready());
    si.set_frequency(434_287_000).unwrap();
    assert_eq!(
        si.pll_code(144_800_000),
        Err(RadioError::FrequencyOutOfRange(144_800_000))
    );
}

// =============================================================================
// Modem Property Tests
// =============================================================================

#[test]
fn deviation_uses_current_outdiv() {
    let mut si = radio(ScriptedBus::ready());
    si.set_frequency(144_800_000).unwrap();
    si.set_deviation(3500).unwrap();
    si.set_deviation_code(589).unwrap();

    let frames = frames(si);
    // 688 = 0x02B0
    assert_eq!(frames[2], [0x11, 0x20, 0x03, 0x0A, 0x00, 0x02, 0xB0]);
    assert_eq!(frames[3], [0x11, 0x20, 0x03, 0x0A, 0x00, 0x02, 0x4D]);
}

#[test]
fn deviation_code_is_clamped_to_17_bits() {
    let mut si = radio(ScriptedBus::ready());
    si.set_deviation_code(0xFF_FFFF).unwrap();
    assert_eq!(frames(si)[0], [0x11, 0x20, 0x03, 0x0A, 0x01, 0xFF, 0xFF]);
}

#[test]
fn offset_and_channel_step() {
    let mut si = radio(ScriptedBus::ready());
    si.set_frequency(144_800_000).unwrap();
    si.set_frequency_offset(3500).unwrap();
    si.set_frequency_offset_fast(588).unwrap();
    si.set_channel_step(12_500).unwrap();

    let frames = frames(si);
    assert_eq!(frames[2], [0x11, 0x20, 0x02, 0x0D, 0x02, 0xB0]);
    assert_eq!(frames[3], [0x11, 0x20, 0x02, 0x0D, 0x02, 0x4C]);
    assert_eq!(frames[4], [0x11, 0x40, 0x02, 0x04, 0x09, 0x99]);
}

#[test]
fn modulation_power_and_rate() {
    let mut si = radio(ScriptedBus::ready());
    si.set_modulation(ModulationType::Gfsk2, DirectMode::Sync).unwrap();
    si.set_power_level(PowerLevel::from_code(0x4F)).unwrap();
    si.set_data_rate(26_400).unwrap();
    assert_eq!(si.modulation(), ModulationType::Gfsk2);
    assert_eq!(si.power_level().code(), 0x4F);

    let frames = frames(si);
    assert_eq!(frames[0], [0x11, 0x20, 0x01, 0x00, 0x2B]);
    assert_eq!(frames[1], [0x11, 0x22, 0x01, 0x01, 0x4F]);
    // NCO clocked from the 32 MHz TCXO
    assert_eq!(frames[2], [0x11, 0x20, 0x04, 0x06, 0x01, 0xE8, 0x48, 0x00]);
    // 264000 = 0x040740
    assert_eq!(frames[3], [0x11, 0x20, 0x03, 0x03, 0x04, 0x07, 0x40]);
}

#[test]
fn data_rate_must_fit_24_bits() {
    let mut si = radio(ScriptedBus::ready());
    assert_eq!(si.set_data_rate(2_000_000), Err(RadioError::InvalidRate(2_000_000)));
    assert_eq!(si.set_data_rate(u32::MAX), Err(RadioError::InvalidRate(u32::MAX)));
    assert!(frames(si).is_empty());

    let mut si = radio(ScriptedBus::ready());
    si.set_data_rate(1_677_721).unwrap();
    assert_eq!(frames(si)[1], [0x11, 0x20, 0x03, 0x03, 0xFF, 0xFF, 0xFA]);
}

#[test]
fn pa_mode_and_filter() {
    let mut si = radio(ScriptedBus::ready());
    si.set_pa_mode(0x02, 0x01).unwrap();
    si.load_filter_coeffs(&GAUSSIAN_TAPS).unwrap();

    let frames = frames(si);
    assert_eq!(frames[0], [0x11, 0x22, 0x01, 0x00, 0x09]);
    assert_eq!(frames[1].len(), 13);
    assert_eq!(&frames[1][..4], &[0x11, 0x20, 0x09, 0x0F]);
    assert_eq!(&frames[1][4..], &GAUSSIAN_TAPS);
}

#[test]
fn state_tx_and_pins() {
    let mut si = radio(ScriptedBus::ready());
    si.request_state_change(ChipState::Ready).unwrap();
    si.start_tx(0).unwrap();
    si.setup_pins([0x10, 0x04, 0x00, 0x00], 0x00, 0x00).unwrap();

    let frames = frames(si);
    assert_eq!(frames[0], [0x34, 0x03]);
    assert_eq!(frames[1], [0x31, 0x00, 0x30, 0x00, 0x00]);
    assert_eq!(frames[2], [0x13, 0x10, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00]);
}

#[test]
fn temperature_reading() {
    // ADC value 1500 in bytes 4-5
    let bus = ScriptedBus::ready().with_response(&[0, 0, 0, 0, 0x05, 0xDC]);
    let mut si = radio(bus);
    assert_eq!(si.read_temperature().unwrap(), 36);
    assert_eq!(frames(si)[0], [0x14, 0x10]);
}

// =============================================================================
// CTS Tests
// =============================================================================

#[test]
fn waits_for_cts_before_writing() {
    let mut si = radio(ScriptedBus::busy_for(100));
    si.set_power_level(PowerLevel::default()).unwrap();
    let bus = si.release().0;
    assert_eq!(bus.frames.len(), 1);
}

#[test]
fn init_poll_timeout_writes_nothing() {
    let mut si = Si4060::new(DeadBus { polls: 0, frames: 0 }, Pin::default(), Pin::default(), 32_000_000);
    assert_eq!(si.set_power_level(PowerLevel::default()), Err(RadioError::ChipNotReady));
    let bus = si.release().0;
    assert_eq!(bus.frames, 0);
    assert_eq!(bus.polls, Poll::Init.limit());
}

#[test]
fn tick_writes_use_tight_poll() {
    let mut si = Si4060::new(DeadBus { polls: 0, frames: 0 }, Pin::default(), Pin::default(), 32_000_000);
    assert_eq!(si.set_frequency_offset_fast(588), Err(RadioError::ChipNotReady));
    assert_eq!(si.release().0.polls, Poll::Tight.limit());
}

#[test]
fn tight_poll_tolerates_short_busy() {
    let mut si = radio(ScriptedBus::busy_for(Poll::Tight.limit() - 1));
    si.set_frequency_offset_fast(588).unwrap();
    si.set_frequency_offset_fast(600).unwrap();
    assert_eq!(frames(si).len(), 2);
}

// =============================================================================
// OOK Blip Tests
// =============================================================================

#[test]
fn ook_blips_key_the_carrier() {
    let mut si = radio(ScriptedBus::ready());
    let mut delay = NoDelay::default();
    let blips = OokBlips {
        count: 3,
        on_ms: 20,
        off_ms: 100,
        power_save: false,
    };
    transmit_ook_blips(&mut si, blips, &mut delay).unwrap();
    assert_eq!(delay.total_ns, 3 * 120 * 1_000_000);

    let frames = frames(si);
    assert_eq!(frames[0], [0x11, 0x20, 0x01, 0x00, 0xA8]);
    let starts = frames.iter().filter(|f| f[0] == 0x31).count();
    let readies = frames.iter().filter(|f| f.as_slice() == [0x34, 0x03]).count();
    assert_eq!(starts, 3);
    assert_eq!(readies, 3);
}

#[test]
fn ook_power_save_sleeps_between_blips() {
    let mut si = radio(ScriptedBus::ready());
    let blips = OokBlips {
        power_save: true,
        ..OokBlips::default()
    };
    transmit_ook_blips(&mut si, blips, &mut NoDelay::default()).unwrap();
    let frames = frames(si);
    assert!(frames.iter().any(|f| f.as_slice() == [0x34, 0x01]));
    assert!(!frames.iter().any(|f| f.as_slice() == [0x34, 0x03]));
}
