//! Calculation and waveform data
//!
//! Pure functions and constant tables with no hardware access:
//! - Si4060 PLL, deviation and offset register maths
//! - The sine lookup table used by the lookup APRS engine

pub mod sine_table;
pub mod synth_calc;
