//! Tick Timers
//!
//! The transmission engines are advanced from periodic timer interrupts.
//! [`TickTimer`] is the small surface the coordinator needs from such a
//! timer; [`HwTimer`] implements it over an STM32 basic/general timer.

use crate::config::TimerSetting;

/// A periodic interrupt source
pub trait TickTimer {
    /// Program the rate and start counting with the update interrupt enabled
    fn arm(&mut self, setting: TimerSetting);

    /// Stop counting and mask the update interrupt
    fn stop(&mut self);

    /// Whether the timer is currently counting
    fn is_armed(&self) -> bool;

    /// Clear the pending update flag, returning whether it was set
    fn acknowledge(&mut self) -> bool;
}

#[cfg(feature = "embedded")]
pub use hw::HwTimer;

#[cfg(feature = "embedded")]
mod hw {
    use embassy_stm32::time::Hertz;
    use embassy_stm32::timer::low_level::Timer;
    use embassy_stm32::timer::CoreInstance;
    use embassy_stm32::Peripheral;

    use super::TickTimer;
    use crate::config::{TimerSetting, CLOCK_PROFILE};

    /// Update-interrupt timer over an STM32 core timer
    pub struct HwTimer<'d, T: CoreInstance> {
        timer: Timer<'d, T>,
        armed: bool,
    }

    impl<'d, T: CoreInstance> HwTimer<'d, T> {
        /// Take ownership of a timer peripheral, left stopped
        pub fn new(tim: impl Peripheral<P = T> + 'd) -> Self {
            let timer = Timer::new(tim);
            timer.stop();
            timer.enable_update_interrupt(false);
            Self {
                timer,
                armed: false,
            }
        }
    }

    impl<T: CoreInstance> TickTimer for HwTimer<'_, T> {
        fn arm(&mut self, setting: TimerSetting) {
            let hz = setting.tick_hz(CLOCK_PROFILE.mck_hz);
            self.timer.stop();
            self.timer.set_frequency(Hertz(hz));
            self.timer.clear_update_interrupt();
            self.timer.enable_update_interrupt(true);
            self.timer.start();
            self.armed = true;
            log_debug!("timer armed at {} Hz", hz);
        }

        fn stop(&mut self) {
            self.timer.enable_update_interrupt(false);
            self.timer.stop();
            self.timer.clear_update_interrupt();
            self.armed = false;
        }

        fn is_armed(&self) -> bool {
            self.armed
        }

        fn acknowledge(&mut self) -> bool {
            self.timer.clear_update_interrupt()
        }
    }
}
