//! OOK Beacon Blips
//!
//! Short unmodulated carrier bursts, audible on a receiver as a series of
//! beeps. Used as a low-power locator beacon between telemetry frames.

use embedded_hal::delay::DelayNs;

use crate::drivers::si4060::RadioControl;
use crate::types::{ChipState, DirectMode, ModulationType, RadioResult};

/// Blip pattern
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OokBlips {
    /// Number of bursts
    pub count: u32,
    /// Carrier on-time per burst
    pub on_ms: u32,
    /// Gap after each burst
    pub off_ms: u32,
    /// Put the chip to sleep during gaps instead of holding it ready
    pub power_save: bool,
}

impl Default for OokBlips {
    fn default() -> Self {
        Self {
            count: 5,
            on_ms: 20,
            off_ms: 1000,
            power_save: false,
        }
    }
}

/// Key the carrier on and off `blips.count` times
///
/// The radio must already be tuned. The chip ends in READY (or SLEEP in
/// power-save mode).
///
/// # Errors
///
/// Stops at the first radio error.
pub fn transmit_ook_blips<R, D>(radio: &mut R, blips: OokBlips, delay: &mut D) -> RadioResult<()>
where
    R: RadioControl + ?Sized,
    D: DelayNs,
{
    radio.set_modulation(ModulationType::Cw, DirectMode::Async)?;
    let idle = if blips.power_save {
        ChipState::Sleep
    } else {
        ChipState::Ready
    };

    for _ in 0..blips.count {
        radio.start_tx(0)?;
        delay.delay_ms(blips.on_ms);
        radio.request_state_change(idle)?;
        delay.delay_ms(blips.off_ms);
    }
    Ok(())
}
