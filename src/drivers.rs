//! Peripheral Drivers
//!
//! Drivers for external ICs built on the HAL traits.

pub mod si4060;
