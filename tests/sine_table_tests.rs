//! Sine Lookup Table Tests
//!
//! Range, periodicity and stepping of the APRS waveform table.
//! Run with: cargo test --target x86_64-unknown-linux-gnu --no-default-features --features std --test sine_table_tests

use tracker_firmware::config::ClockProfile;
use tracker_firmware::dsp::sine_table::{sample, TableCursor, CENTER, SINE_LOOKUP, TABLE_LEN};
use tracker_firmware::radio::aprs::lookup_code;
use tracker_firmware::types::AfskTone;

// =============================================================================
// Table Shape Tests
// =============================================================================

#[test]
fn samples_in_range() {
    for cursor in 0..=u8::MAX {
        let value = sample(cursor);
        assert!((1..=255).contains(&value), "{cursor}: {value}");
    }
}

#[test]
fn one_period_centred_on_128() {
    assert_eq!(SINE_LOOKUP.len(), TABLE_LEN);
    assert_eq!(sample(0), CENTER);
    assert_eq!(sample(128), CENTER);
    assert_eq!(sample(64), 255);
    assert_eq!(sample(192), 1);
}

#[test]
fn half_period_antisymmetry() {
    for i in 0..128u8 {
        assert_eq!(u16::from(sample(i)) + u16::from(sample(i + 128)), 256);
    }
}

#[test]
fn rising_first_quarter() {
    for i in 0..63u8 {
        assert!(sample(i) <= sample(i + 1));
    }
}

// =============================================================================
// Cursor Tests
// =============================================================================

#[test]
fn cursor_is_periodic() {
    let mut a = TableCursor::new();
    let mut b = TableCursor::new();
    for _ in 0..256 {
        b.advance(1);
    }
    assert_eq!(a.position(), b.position());
    a.advance(200);
    b.advance(200);
    assert_eq!(a.sample(), b.sample());
}

#[test]
fn documented_steps_complete_one_period() {
    for profile in [ClockProfile::MCK_12MHZ, ClockProfile::MCK_64MHZ] {
        for step in [profile.table_step_1200, profile.table_step_2200] {
            let calls = (TABLE_LEN as f32 / f32::from(step)).round() as u32;
            let mut cursor = TableCursor::new();
            let mut travelled = 0u32;
            for _ in 0..calls {
                cursor.advance(step);
                travelled += u32::from(step);
            }
            // Within one step of a full period, and back near the start
            assert!(travelled.abs_diff(TABLE_LEN as u32) <= u32::from(step) / 2 + 1);
            let pos = u32::from(cursor.position());
            assert!(pos.min(256 - pos) <= u32::from(step) / 2 + 1, "step {step}: {pos}");
        }
    }
}

#[test]
fn cursor_reset() {
    let mut cursor = TableCursor::new();
    cursor.advance(77);
    cursor.reset();
    assert_eq!(cursor.position(), 0);
    assert_eq!(cursor.sample(), CENTER);
}

// =============================================================================
// Offset Code Tests
// =============================================================================

#[test]
fn both_tones_share_the_centre() {
    let low = lookup_code(CENTER, AfskTone::Mark1200);
    let high = lookup_code(CENTER, AfskTone::Space2200);
    assert_eq!(low, 588);
    assert!(high.abs_diff(low) <= 1);
}

#[test]
fn tone_swings() {
    // 1200 Hz: 2.5 * [1, 255] + 268
    assert_eq!(lookup_code(1, AfskTone::Mark1200), 270);
    assert_eq!(lookup_code(255, AfskTone::Mark1200), 905);
    // 2200 Hz: 4.6 * [1, 255]
    assert_eq!(lookup_code(1, AfskTone::Space2200), 4);
    assert!(lookup_code(255, AfskTone::Space2200).abs_diff(1173) <= 1);
}
