//! Configuration and Constants Tests
//!
//! Tests to verify configuration values are valid and consistent.
//! Run with: cargo test --target x86_64-unknown-linux-gnu --no-default-features --features std --test config_tests

use tracker_firmware::config::*;
use tracker_firmware::dsp::synth_calc::deviation_code;
use tracker_firmware::dsp::sine_table::TABLE_LEN;
use tracker_firmware::types::{Band, RadioError};

const PROFILES: [ClockProfile; 3] = [
    ClockProfile::MCK_12MHZ,
    ClockProfile::MCK_16MHZ,
    ClockProfile::MCK_64MHZ,
];

/// Audio tone produced by stepping the table at `sample_hz`
fn tone_hz(sample_hz: u32, step: u8) -> u32 {
    sample_hz * u32::from(step) / TABLE_LEN as u32
}

// =============================================================================
// Carrier Tests
// =============================================================================

#[test]
fn carriers_in_range() {
    let rtty = rtty_frequency().unwrap();
    let aprs = aprs_frequency().unwrap();
    assert_eq!(rtty.band(), Band::Div8);
    assert_eq!(aprs.band(), Band::Div24);
}

#[test]
fn lookup_base_stays_in_band() {
    let base = aprs_frequency().unwrap().offset_by(-(LOOKUP_CENTER_OFFSET_HZ as i32)).unwrap();
    assert_eq!(base.band(), Band::Div24);
}

#[test]
fn preemphasis_codes_fit_deviation_register() {
    assert!(PREEMPHASIS_DEVIATION_1200 < PREEMPHASIS_DEVIATION_2200);
    assert!(PREEMPHASIS_DEVIATION_2200 < 0x1_FFFF);
    assert_eq!(deviation_code(APRS_DEVIATION_HZ, TCXO_HZ, 24), 688);
}

// =============================================================================
// Timer Clock Tests
// =============================================================================

#[test]
fn timer_clock_dividers() {
    assert_eq!(TimerClock::Clock1.input_hz(12_000_000), 6_000_000);
    assert_eq!(TimerClock::Clock2.input_hz(64_000_000), 8_000_000);
    assert_eq!(TimerClock::Clock4.input_hz(64_000_000), 500_000);
    assert_eq!(TimerClock::Clock5.input_hz(64_000_000), 32_768);
    assert_eq!(TimerClock::Clock3.code(), 2);
}

#[test]
fn rtty_compare_values_match_baud_table() {
    let p12 = ClockProfile::MCK_12MHZ;
    let p16 = ClockProfile::MCK_16MHZ;
    let p64 = ClockProfile::MCK_64MHZ;

    assert_eq!(p12.rtty_timer(50).unwrap().compare, 30_000);
    assert_eq!(p12.rtty_timer(300).unwrap().compare, 5000);
    assert_eq!(p12.rtty_timer(1200).unwrap().compare, 1250);

    assert_eq!(p16.rtty_timer(300).unwrap().compare, 6667);
    assert_eq!(p16.rtty_timer(600).unwrap().compare, 3333);

    assert_eq!(p64.rtty_timer(50).unwrap().compare, 10_000);
    assert_eq!(p64.rtty_timer(300).unwrap().compare, 1667);
    assert_eq!(p64.rtty_timer(1200).unwrap().compare, 417);
}

#[test]
fn rtty_compare_value_out_of_range() {
    // 12 MHz RTTY clock input is 1.5 MHz
    assert_eq!(rtty_compare_value(12_000_000, TimerClock::Clock2, 0), None);
    assert_eq!(rtty_compare_value(12_000_000, TimerClock::Clock2, 20), None);
    assert_eq!(rtty_compare_value(12_000_000, TimerClock::Clock2, 23), Some(65_217));
    assert_eq!(rtty_compare_value(12_000_000, TimerClock::Clock2, 4_000_000), None);

    for profile in PROFILES {
        assert_eq!(profile.rtty_timer(0), Err(RadioError::InvalidRate(0)));
    }
}

#[test]
fn zero_compare_has_no_tick() {
    let setting = TimerSetting::new(TimerClock::Clock1, 0);
    assert_eq!(setting.tick_hz(12_000_000), 0);
}

#[test]
fn rtty_tick_near_baud() {
    for profile in PROFILES {
        let hz = profile.rtty_timer(RTTY_BAUD).unwrap().tick_hz(profile.mck_hz);
        assert!(hz.abs_diff(RTTY_BAUD) <= 1, "{hz}");
    }
}

// =============================================================================
// Clock Profile Tests
// =============================================================================

#[test]
fn gfsk_sync_tick_matches_chip_data_rate() {
    for profile in PROFILES {
        let hz = profile.gfsk_sync_tc0.tick_hz(profile.mck_hz);
        assert!(hz.abs_diff(GFSK_SYNC_DATA_RATE) < 50, "{hz}");
    }
    assert_eq!(GFSK_SYNC_DATA_RATE, APRS_BAUD * u32::from(GFSK_SYNC_TICKS_PER_BIT));
}

#[test]
fn gfsk_sync_half_periods() {
    // 26400 / (2 * 11) = 1200, 26400 / (2 * 6) = 2200
    assert_eq!(GFSK_SYNC_DATA_RATE / (2 * u32::from(GFSK_SYNC_HALF_PERIOD_1200)), 1200);
    assert_eq!(GFSK_SYNC_DATA_RATE / (2 * u32::from(GFSK_SYNC_HALF_PERIOD_2200)), 2200);
}

#[test]
fn lookup_bit_clock_is_baud() {
    for profile in PROFILES {
        let hz = profile.lookup_tc0.tick_hz(profile.mck_hz);
        assert!(hz.abs_diff(APRS_BAUD) <= 1, "{hz}");
    }
}

#[test]
fn lookup_steps_produce_afsk_tones() {
    for profile in PROFILES {
        let sample_hz = profile.lookup_sample_hz();
        let low = tone_hz(sample_hz, profile.table_step_1200);
        let high = tone_hz(sample_hz, profile.table_step_2200);
        assert!(low.abs_diff(1200) < 20, "{low}");
        assert!(high.abs_diff(2200) < 20, "{high}");
    }
}

#[test]
fn slow_profiles_halve_table_rate() {
    assert_eq!(ClockProfile::MCK_12MHZ.lookup_sample_hz(), 10_869);
    assert_eq!(ClockProfile::MCK_16MHZ.lookup_sample_hz(), 10_869);
    assert_eq!(ClockProfile::MCK_64MHZ.lookup_sample_hz(), 21_739);
    assert_eq!(
        ClockProfile::MCK_12MHZ.table_step_1200,
        2 * ClockProfile::MCK_64MHZ.table_step_1200
    );
}

#[test]
fn default_profile_is_12mhz() {
    assert_eq!(CLOCK_PROFILE, ClockProfile::MCK_12MHZ);
}

// =============================================================================
// Buffer and Poll Tests
// =============================================================================

#[test]
fn buffer_capacities() {
    assert_eq!(TX_BUFFER_SIZE, 330);
    assert_eq!(APRS_BUFFER_SIZE, 350);
}

#[test]
fn tick_poll_bound_is_tighter() {
    assert!(CTS_TICK_POLLS < CTS_TIMEOUT_POLLS);
    assert_eq!(CTS_TIMEOUT_POLLS, 15_000);
}
