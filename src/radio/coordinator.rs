//! Transmission Coordinator
//!
//! Owns the radio, both tick timers, the direct-mode data pin and the
//! transmit buffers, and holds the active engine as one variant of
//! [`ActiveMode`]. Interrupt handlers call [`Coordinator::on_tc0`],
//! [`Coordinator::on_tc1`] and [`Coordinator::on_data_clock`]; the main
//! context calls the `start_*` operations and polls
//! [`Coordinator::take_finished`].
//!
//! A start request is checked first: buffer length, flag boundaries, baud
//! rate and tone frequencies. A rejected request leaves the running
//! transmission untouched. An accepted one stops both timers before the
//! chip is reconfigured, so a tick of the previous mode can never run
//! after the new mode is armed. Errors
//! raised during a tick abort the transmission and are reported through
//! [`TxStatus::Aborted`]; they never leave the handler.
//!
//! The chip is left transmitting when a burst completes. Tuning it back
//! down is the caller's job, outside the tick handler.

use embedded_hal::digital::{OutputPin, PinState};

use crate::config::{
    ClockProfile, APRS_BAUD, APRS_BUFFER_SIZE, APRS_DEVIATION_HZ, FREQUENCY_APRS_HZ,
    GFSK_SYNC_DATA_RATE, LOOKUP_CENTER_OFFSET_HZ, POWER_LEVEL, TX_BUFFER_SIZE,
};
use crate::drivers::si4060::RadioControl;
use crate::hal::timer::TickTimer;
use crate::radio::aprs::{AprsStrategy, GfskSyncEngine, LookupEngine, OrdinaryGfsk};
use crate::radio::buffer::{AprsPacket, PacketView, TxBuffer};
use crate::radio::rtty::{RttyConfig, RttyEngine, RttyTones};
use crate::types::{DirectMode, ModeTag, ModulationType, RadioError, RadioResult};

/// RTTY engine with its precomputed tones
#[derive(Clone, Debug)]
pub struct RttyRun {
    /// Serializer
    pub engine: RttyEngine,
    /// Mark/space PLL codes
    pub tones: RttyTones,
}

/// The one engine currently driven by the timers
#[derive(Clone, Debug, Default)]
pub enum ActiveMode {
    /// Nothing transmitting, timers stopped
    #[default]
    Idle,
    /// Timer-driven RTTY on TC0
    Rtty(RttyRun),
    /// Synchronous GFSK on TC0
    GfskSync(GfskSyncEngine),
    /// Sine lookup on TC0 (bits) and TC1 (samples)
    Lookup(LookupEngine),
    /// Chip-clocked GFSK on the data clock interrupt
    Ordinary(OrdinaryGfsk),
}

impl ActiveMode {
    /// Selector tag, `None` when idle
    #[must_use]
    pub const fn tag(&self) -> Option<ModeTag> {
        match self {
            Self::Idle => None,
            Self::Rtty(_) => Some(ModeTag::RttyInterrupt),
            Self::GfskSync(_) => Some(ModeTag::GfskSync),
            Self::Lookup(_) => Some(ModeTag::Lookup),
            Self::Ordinary(_) => Some(ModeTag::OrdinaryGfsk),
        }
    }
}

/// Transmission status as seen by the caller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxStatus {
    /// Nothing started
    Idle,
    /// A mode is transmitting
    Active(ModeTag),
    /// The last transmission sent its whole buffer
    Completed(ModeTag),
    /// The last transmission stopped on an error
    Aborted(RadioError),
}

#[cfg(feature = "embedded")]
impl defmt::Format for TxStatus {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Idle => defmt::write!(f, "Idle"),
            Self::Active(tag) => defmt::write!(f, "Active({})", tag),
            Self::Completed(tag) => defmt::write!(f, "Completed({})", tag),
            Self::Aborted(err) => defmt::write!(f, "Aborted({})", err),
        }
    }
}

/// What a tick did
enum Step {
    Continue,
    Done,
    Ignored,
}

/// Owner of the timers and the active transmission
pub struct Coordinator<R, T0, T1, D> {
    radio: R,
    tc0: T0,
    tc1: T1,
    data_pin: D,
    profile: ClockProfile,
    rtty_buffer: TxBuffer<TX_BUFFER_SIZE>,
    aprs_packet: AprsPacket<APRS_BUFFER_SIZE>,
    mode: ActiveMode,
    status: TxStatus,
    finished: Option<TxStatus>,
}

impl<R, T0, T1, D> Coordinator<R, T0, T1, D>
where
    R: RadioControl,
    T0: TickTimer,
    T1: TickTimer,
    D: OutputPin,
{
    /// Take ownership of the radio, timers and data pin
    pub fn new(radio: R, tc0: T0, tc1: T1, data_pin: D, profile: ClockProfile) -> Self {
        Self {
            radio,
            tc0,
            tc1,
            data_pin,
            profile,
            rtty_buffer: TxBuffer::new(),
            aprs_packet: AprsPacket::new(),
            mode: ActiveMode::Idle,
            status: TxStatus::Idle,
            finished: None,
        }
    }

    /// Send `data` as RTTY on `carrier_hz`, one bit per TC0 tick
    ///
    /// # Errors
    ///
    /// [`RadioError::BufferOverrun`], [`RadioError::InvalidRate`] or
    /// [`RadioError::FrequencyOutOfRange`] before anything is stopped.
    /// Any radio error while configuring the chip, after the previous
    /// transmission was stopped. On error nothing is armed.
    pub fn start_rtty(&mut self, data: &[u8], carrier_hz: u32, config: RttyConfig) -> RadioResult<()> {
        check_capacity(data.len(), self.rtty_buffer.capacity())?;
        let timer = self.profile.rtty_timer(config.baud)?;
        RttyTones::check(carrier_hz, config.shift_hz)?;

        let previous = self.preempt();
        self.rtty_buffer.fill(data)?;
        if self.rtty_buffer.claim().is_none() {
            self.rtty_buffer.release();
            return Err(RadioError::BufferInUse);
        }

        let installed = self.configure_rtty(carrier_hz, config).and_then(|tones| {
            let run = RttyRun {
                engine: RttyEngine::new(config),
                tones,
            };
            self.install(ActiveMode::Rtty(run), previous)
        });
        if let Err(e) = installed {
            self.rtty_buffer.release();
            return Err(e);
        }
        self.tc0.arm(timer);
        log_info!("RTTY start: {} bytes at {} Hz", data.len(), carrier_hz);
        Ok(())
    }

    /// Send a framed APRS packet with the chosen strategy
    ///
    /// # Errors
    ///
    /// See [`Coordinator::start_aprs_gfsk`].
    pub fn start_aprs(
        &mut self,
        strategy: AprsStrategy,
        packet: &[u8],
        flag_start: usize,
        flag_end: usize,
    ) -> RadioResult<()> {
        match strategy {
            AprsStrategy::GfskSync => self.start_aprs_gfsk(packet, flag_start, flag_end),
            AprsStrategy::Lookup => self.start_aprs_lookup(packet, flag_start, flag_end),
            AprsStrategy::Ordinary => self.start_aprs_ordinary(packet, flag_start, flag_end),
        }
    }

    /// Send a framed APRS packet as synchronous GFSK on TC0
    ///
    /// # Errors
    ///
    /// [`RadioError::BufferOverrun`] or [`RadioError::InvalidBoundaries`]
    /// before anything is stopped. Any radio error while configuring the
    /// chip, after the previous transmission was stopped. On error nothing
    /// is armed.
    pub fn start_aprs_gfsk(&mut self, packet: &[u8], flag_start: usize, flag_end: usize) -> RadioResult<()> {
        let previous = self.load_packet(packet, flag_start, flag_end)?;
        let engine = GfskSyncEngine::new();

        let installed = self
            .configure_gfsk_sync(engine.initial_deviation())
            .and_then(|()| self.install(ActiveMode::GfskSync(engine), previous));
        self.release_on_error(installed)?;
        self.tc0.arm(self.profile.gfsk_sync_tc0);
        log_info!("APRS GFSK sync start: {} bytes", packet.len());
        Ok(())
    }

    /// Send a framed APRS packet with sine lookup on TC0 and TC1
    ///
    /// # Errors
    ///
    /// As [`Coordinator::start_aprs_gfsk`].
    pub fn start_aprs_lookup(&mut self, packet: &[u8], flag_start: usize, flag_end: usize) -> RadioResult<()> {
        let previous = self.load_packet(packet, flag_start, flag_end)?;

        let engine = LookupEngine::new(&self.profile);
        let installed = self
            .configure_lookup()
            .and_then(|()| self.install(ActiveMode::Lookup(engine), previous));
        self.release_on_error(installed)?;
        self.tc1.arm(self.profile.lookup_tc1);
        self.tc0.arm(self.profile.lookup_tc0);
        log_info!("APRS lookup start: {} bytes", packet.len());
        Ok(())
    }

    /// Send a framed APRS packet clocked by the chip's data clock
    ///
    /// No timer is armed; each level is supplied from
    /// [`Coordinator::on_data_clock`].
    ///
    /// # Errors
    ///
    /// As [`Coordinator::start_aprs_gfsk`].
    pub fn start_aprs_ordinary(&mut self, packet: &[u8], flag_start: usize, flag_end: usize) -> RadioResult<()> {
        let previous = self.load_packet(packet, flag_start, flag_end)?;

        let installed = self
            .configure_ordinary()
            .and_then(|()| self.install(ActiveMode::Ordinary(OrdinaryGfsk::new()), previous));
        self.release_on_error(installed)?;
        log_info!("APRS ordinary GFSK start: {} bytes", packet.len());
        Ok(())
    }

    /// TC0 interrupt: RTTY bit, GFSK-sync chip bit or lookup bit clock
    pub fn on_tc0(&mut self) {
        self.tc0.acknowledge();

        let step = match &mut self.mode {
            ActiveMode::Rtty(run) => {
                let tone = run.engine.step(self.rtty_buffer.as_slice());
                if run.engine.is_finished() {
                    Ok(Step::Done)
                } else if let Some(tone) = tone {
                    self.radio.hop(run.tones.code(tone)).map(|()| Step::Continue)
                } else {
                    Ok(Step::Continue)
                }
            }
            ActiveMode::GfskSync(engine) => match engine.tick(&self.aprs_packet.view()) {
                None => Ok(Step::Done),
                Some(tick) => self
                    .data_pin
                    .set_state(PinState::from(tick.level))
                    .map_err(|_| RadioError::Pin)
                    .and_then(|()| match tick.deviation {
                        Some(code) => self.radio.set_deviation_code(code),
                        None => Ok(()),
                    })
                    .map(|()| Step::Continue),
            },
            ActiveMode::Lookup(engine) => match engine.on_bit_tick(&self.aprs_packet.view()) {
                None => Ok(Step::Done),
                Some(_) => Ok(Step::Continue),
            },
            ActiveMode::Idle | ActiveMode::Ordinary(_) => Ok(Step::Ignored),
        };

        self.settle(step);
    }

    /// TC1 interrupt: lookup table sample
    pub fn on_tc1(&mut self) {
        self.tc1.acknowledge();

        let step = match &mut self.mode {
            ActiveMode::Lookup(engine) => {
                let code = engine.on_sample_tick();
                self.radio
                    .set_frequency_offset_fast(code)
                    .map(|()| Step::Continue)
            }
            _ => Ok(Step::Ignored),
        };

        self.settle(step);
    }

    /// Chip data clock edge: next ordinary-GFSK level
    pub fn on_data_clock(&mut self) {
        let step = match &mut self.mode {
            ActiveMode::Ordinary(engine) => match engine.on_data_clock(&self.aprs_packet.view()) {
                None => Ok(Step::Done),
                Some(level) => self
                    .data_pin
                    .set_state(PinState::from(level))
                    .map_err(|_| RadioError::Pin)
                    .map(|()| Step::Continue),
            },
            _ => Ok(Step::Ignored),
        };

        self.settle(step);
    }

    /// Cancel the active transmission from the main context
    ///
    /// Returns the mode that was stopped. No finished status is published.
    pub fn abort(&mut self) -> Option<ModeTag> {
        let tag = self.mode.tag();
        self.halt();
        self.status = TxStatus::Idle;
        if let Some(_tag) = tag {
            log_info!("{} cancelled", _tag);
        }
        tag
    }

    /// Consume the status of the last finished transmission
    pub fn take_finished(&mut self) -> Option<TxStatus> {
        self.finished.take()
    }

    /// Current status
    #[must_use]
    pub const fn status(&self) -> TxStatus {
        self.status
    }

    /// Active engine
    #[must_use]
    pub const fn mode(&self) -> &ActiveMode {
        &self.mode
    }

    /// A transmission is in progress
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        !matches!(self.mode, ActiveMode::Idle)
    }

    /// The RTTY buffer may be refilled
    #[must_use]
    pub fn rtty_buffer_free(&self) -> bool {
        self.rtty_buffer.handoff().is_free()
    }

    /// The APRS packet buffer may be refilled
    #[must_use]
    pub fn aprs_buffer_free(&self) -> bool {
        self.aprs_packet.handoff().is_free()
    }

    /// Radio, for configuration between transmissions
    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    /// Radio
    #[must_use]
    pub const fn radio(&self) -> &R {
        &self.radio
    }

    /// TC0
    #[must_use]
    pub const fn tc0(&self) -> &T0 {
        &self.tc0
    }

    /// TC1
    #[must_use]
    pub const fn tc1(&self) -> &T1 {
        &self.tc1
    }

    /// Stop whatever is running before a new mode is installed
    fn preempt(&mut self) -> Option<ModeTag> {
        let previous = self.mode.tag();
        if let Some(_tag) = previous {
            log_warn!("{} preempted", _tag);
        }
        self.halt();
        previous
    }

    /// Stop both timers, drop the engine and free the buffers
    ///
    /// A dropped engine leaves the status `Idle`; callers that finished a
    /// burst publish over it.
    fn halt(&mut self) {
        self.tc0.stop();
        self.tc1.stop();
        match self.mode {
            ActiveMode::Rtty(_) => self.rtty_buffer.release(),
            ActiveMode::GfskSync(_) | ActiveMode::Lookup(_) | ActiveMode::Ordinary(_) => {
                self.aprs_packet.release();
            }
            ActiveMode::Idle => return,
        }
        self.mode = ActiveMode::Idle;
        self.status = TxStatus::Idle;
    }

    /// Make `mode` the active engine; both timers must be stopped
    ///
    /// `previous` is the mode the timers were taken from, reported if one
    /// of them failed to stop.
    fn install(&mut self, mode: ActiveMode, previous: Option<ModeTag>) -> RadioResult<()> {
        if self.tc0.is_armed() || self.tc1.is_armed() {
            self.halt();
            log_warn!("timer still armed after stopping {}", previous);
            return Err(RadioError::ModeConflict { active: previous });
        }
        let Some(tag) = mode.tag() else {
            self.mode = ActiveMode::Idle;
            return Ok(());
        };
        self.mode = mode;
        self.status = TxStatus::Active(tag);
        self.finished = None;
        Ok(())
    }

    /// Apply the outcome of a tick
    fn settle(&mut self, step: RadioResult<Step>) {
        let Some(tag) = self.mode.tag() else {
            return;
        };
        match step {
            Ok(Step::Continue | Step::Ignored) => {}
            Ok(Step::Done) => {
                self.halt();
                self.publish(TxStatus::Completed(tag));
                log_info!("{} complete", tag);
            }
            Err(e) => {
                self.halt();
                self.publish(TxStatus::Aborted(e));
                log_warn!("{} aborted: {}", tag, e);
            }
        }
    }

    fn publish(&mut self, status: TxStatus) {
        self.status = status;
        self.finished = Some(status);
    }

    /// Check the packet, stop, then copy it in and claim it for the engine
    fn load_packet(
        &mut self,
        packet: &[u8],
        flag_start: usize,
        flag_end: usize,
    ) -> RadioResult<Option<ModeTag>> {
        check_capacity(packet.len(), self.aprs_packet.capacity())?;
        PacketView::new(packet, flag_start, flag_end)?;

        let previous = self.preempt();
        self.aprs_packet.fill(packet, flag_start, flag_end)?;
        if self.aprs_packet.claim().is_none() {
            self.aprs_packet.release();
            return Err(RadioError::BufferInUse);
        }
        Ok(previous)
    }

    fn release_on_error(&mut self, result: RadioResult<()>) -> RadioResult<()> {
        if result.is_err() {
            self.aprs_packet.release();
        }
        result
    }

    fn configure_rtty(&mut self, carrier_hz: u32, config: RttyConfig) -> RadioResult<RttyTones> {
        self.radio.set_frequency(carrier_hz)?;
        let tones = RttyTones::new(&self.radio, carrier_hz, config.shift_hz)?;
        self.radio.set_modulation(ModulationType::Cw, DirectMode::Async)?;
        self.radio.set_power_level(POWER_LEVEL)?;
        self.radio.start_tx(0)?;
        Ok(tones)
    }

    fn configure_gfsk_sync(&mut self, deviation: u32) -> RadioResult<()> {
        self.data_pin.set_low().map_err(|_| RadioError::Pin)?;
        self.radio.set_frequency(FREQUENCY_APRS_HZ)?;
        self.radio.set_modulation(ModulationType::Gfsk2, DirectMode::Sync)?;
        self.radio.set_data_rate(GFSK_SYNC_DATA_RATE)?;
        self.radio.set_deviation_code(deviation)?;
        self.radio.set_power_level(POWER_LEVEL)?;
        self.radio.start_tx(0)
    }

    fn configure_lookup(&mut self) -> RadioResult<()> {
        self.data_pin.set_low().map_err(|_| RadioError::Pin)?;
        self.radio.set_frequency(FREQUENCY_APRS_HZ - LOOKUP_CENTER_OFFSET_HZ)?;
        self.radio.set_modulation(ModulationType::Fsk2, DirectMode::Async)?;
        self.radio.set_deviation_code(0)?;
        self.radio.set_power_level(POWER_LEVEL)?;
        self.radio.start_tx(0)
    }

    fn configure_ordinary(&mut self) -> RadioResult<()> {
        self.data_pin.set_low().map_err(|_| RadioError::Pin)?;
        self.radio.set_frequency(FREQUENCY_APRS_HZ)?;
        self.radio.set_modulation(ModulationType::Gfsk2, DirectMode::Sync)?;
        self.radio.set_data_rate(APRS_BAUD)?;
        self.radio.set_deviation(APRS_DEVIATION_HZ)?;
        self.radio.set_power_level(POWER_LEVEL)?;
        self.radio.start_tx(0)
    }
}

fn check_capacity(requested: usize, capacity: usize) -> RadioResult<()> {
    if requested > capacity {
        return Err(RadioError::BufferOverrun {
            requested,
            capacity,
        });
    }
    Ok(())
}
