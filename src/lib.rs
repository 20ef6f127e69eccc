//! Balloon Tracker Transmission Core
//!
//! This library drives an Si4060 direct-modulation synthesizer to emit
//! RTTY and APRS telemetry from a high-altitude balloon. All baseband
//! modulation is generated by the MCU from hardware timer interrupts and
//! a precomputed sine table; the chip's own packet modem is never used.
//!
//! # Architecture
//!
//! The firmware is organized in layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     COORDINATOR                              │
//! │   mode selector (tagged union)  │  TC0 / TC1 / data clock    │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 TRANSMISSION ENGINES                         │
//! │  RTTY state machine  │  APRS GFSK sync  │  APRS lookup       │
//! ├─────────────────────────────────────────────────────────────┤
//! │              DSP / CALCULATION LAYER                         │
//! │  PLL + deviation register maths  │  sine lookup table        │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 HAL / DRIVER LAYER                           │
//! │  Si4060 command driver  │  SPI command bus  │  tick timers   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **One active engine**: the coordinator holds exactly one mode variant
//! - **Flag handoff, no locks in handlers**: buffers carry their own
//!   ready/consumed pair
//! - **Fixed capacity**: every buffer is a bounded `heapless` vector
//! - **No unsafe in library code**: interrupt wiring lives in the binary
//! - **Explicit error handling**: all chip operations return `Result`

#![cfg_attr(feature = "embedded", no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export dependencies needed by applications (only in embedded mode)
#[cfg(feature = "embedded")]
pub use embassy_executor;
#[cfg(feature = "embedded")]
pub use embassy_stm32;
#[cfg(feature = "embedded")]
pub use embassy_time;

#[macro_use]
mod log;

/// Hardware Abstraction Layer
///
/// Command bus over SPI and the tick timer abstraction.
pub mod hal;

/// Peripheral Drivers
///
/// Register-level driver for the Si4060 synthesizer.
pub mod drivers;

/// Calculation and waveform data
///
/// PLL/deviation register maths and the sine lookup table.
pub mod dsp;

/// Transmission engines and the interrupt coordinator
pub mod radio;

/// Shared types used across modules
pub mod types;

/// System configuration and constants
pub mod config;

/// Prelude module for common imports
#[cfg(feature = "embedded")]
pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::config::*;
    pub use crate::types::*;

    pub use crate::drivers::si4060::{RadioControl, Si4060};
    pub use crate::radio::coordinator::{Coordinator, TxStatus};

    // Common traits
    pub use embedded_hal::digital::OutputPin;

    // Embassy
    pub use embassy_time::{Duration, Instant, Timer};

    // Error handling
    pub use core::result::Result;

    // Logging
    pub use defmt::{debug, error, info, trace, warn};
}
