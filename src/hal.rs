//! Hardware Abstraction Layer
//!
//! Traits at the seams between the transmission logic and the MCU:
//! the Si4060 command transport and the periodic tick timers. Embedded
//! builds provide implementations over embassy-stm32 peripherals; host
//! tests provide recording doubles.

pub mod spi;
pub mod timer;
