//! Balloon Tracker Transmitter
//!
//! Entry point for the STM32G474 tracker board. Brings up the Si4060,
//! hands the radio and timers to the coordinator, and alternates an RTTY
//! telemetry sentence with an APRS position frame.

#![no_std]
#![no_main]

use core::cell::RefCell;
use core::fmt::Write as _;

use critical_section::Mutex;
use defmt::{error, info, unwrap, warn};
use embassy_executor::Spawner;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, Pull, Speed};
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::InterruptExt;
use embassy_stm32::mode::Blocking;
use embassy_stm32::peripherals::{TIM2, TIM3};
use embassy_stm32::spi::{self, Spi};
use embassy_stm32::time::Hertz;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::Delay;
use heapless::String;
use {defmt_rtt as _, panic_probe as _};

use tracker_firmware::drivers::si4060::{gpio, GAUSSIAN_TAPS};
use tracker_firmware::hal::spi::SpiCommandBus;
use tracker_firmware::hal::timer::HwTimer;
use tracker_firmware::prelude::*;
use tracker_firmware::radio::rtty::RttyConfig;

type Radio = Si4060<SpiCommandBus<Spi<'static, Blocking>, Output<'static>>, Output<'static>, Output<'static>>;
type Tracker = Coordinator<Radio, HwTimer<'static, TIM2>, HwTimer<'static, TIM3>, Output<'static>>;

/// Shared with the timer interrupts
static TRACKER: Mutex<RefCell<Option<Tracker>>> = Mutex::new(RefCell::new(None));

/// Raised by an interrupt when a transmission finishes
static TX_DONE: Signal<CriticalSectionRawMutex, TxStatus> = Signal::new();

/// Opening flags in [`APRS_FRAME`]
const APRS_LEADING_FLAGS: usize = 4;

/// Closing flags in [`APRS_FRAME`]
const APRS_TRAILING_FLAGS: usize = 2;

/// N0CALL-11>APRS,WIDE2-1:!4903.50N/07201.75WOtracker with FCS
const APRS_FRAME: [u8; 58] = [
    0x7E, 0x7E, 0x7E, 0x7E, 0x82, 0xA0, 0xA4, 0xA6, 0x40, 0x40, 0x60, 0x9C,
    0x60, 0x86, 0x82, 0x98, 0x98, 0x76, 0xAE, 0x92, 0x88, 0x8A, 0x64, 0x40,
    0x63, 0x03, 0xF0, 0x21, 0x34, 0x39, 0x30, 0x33, 0x2E, 0x35, 0x30, 0x4E,
    0x2F, 0x30, 0x37, 0x32, 0x30, 0x31, 0x2E, 0x37, 0x35, 0x57, 0x4F, 0x74,
    0x72, 0x61, 0x63, 0x6B, 0x65, 0x72, 0xA9, 0xCC, 0x7E, 0x7E,
];

/// Run `f` on the coordinator inside a critical section
fn with_tracker<T>(f: impl FnOnce(&mut Tracker) -> T) -> Option<T> {
    critical_section::with(|cs| TRACKER.borrow_ref_mut(cs).as_mut().map(f))
}

/// Forward a finished status to the main loop
fn signal_finished(tracker: &mut Tracker) {
    if let Some(status) = tracker.take_finished() {
        TX_DONE.signal(status);
    }
}

#[interrupt]
fn TIM2() {
    critical_section::with(|cs| {
        if let Some(tracker) = TRACKER.borrow_ref_mut(cs).as_mut() {
            tracker.on_tc0();
            signal_finished(tracker);
        }
    });
}

#[interrupt]
fn TIM3() {
    critical_section::with(|cs| {
        if let Some(tracker) = TRACKER.borrow_ref_mut(cs).as_mut() {
            tracker.on_tc1();
            signal_finished(tracker);
        }
    });
}

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Tracker transmitter v{}", env!("CARGO_PKG_VERSION"));

    let p = embassy_stm32::init(embassy_stm32::Config::default());

    // Radio held in shutdown with the TCXO off until init
    let sdn = Output::new(p.PB0, Level::High, Speed::Low);
    let tcxo = Output::new(p.PB1, Level::Low, Speed::Low);
    let data = Output::new(p.PB4, Level::Low, Speed::VeryHigh);
    let nsel = Output::new(p.PA4, Level::High, Speed::VeryHigh);

    let mut spi_config = spi::Config::default();
    spi_config.frequency = Hertz(4_000_000);
    let spi = Spi::new_blocking(p.SPI1, p.PA5, p.PA7, p.PA6, spi_config);
    let bus = unwrap!(SpiCommandBus::new(spi, nsel));

    let mut radio = Si4060::new(bus, sdn, tcxo, TCXO_HZ);
    let mut delay = Delay;
    match radio.init(&mut delay) {
        Ok(part) => info!("Radio: {}", part),
        Err(e) => error!("Radio init failed: {}", e),
    }
    unwrap!(radio.setup_pins(
        [gpio::TX_DATA_CLK, gpio::INPUT, gpio::DONOTHING, gpio::DONOTHING],
        gpio::DONOTHING,
        gpio::DONOTHING,
    ));
    unwrap!(radio.load_filter_coeffs(&GAUSSIAN_TAPS));

    let tc0 = HwTimer::new(p.TIM2);
    let tc1 = HwTimer::new(p.TIM3);
    let tracker = Coordinator::new(radio, tc0, tc1, data, CLOCK_PROFILE);
    critical_section::with(|cs| TRACKER.borrow_ref_mut(cs).replace(tracker));

    // SAFETY: the handlers only touch TRACKER through a critical section
    unsafe {
        interrupt::TIM2.enable();
        interrupt::TIM3.enable();
    }

    let data_clock = ExtiInput::new(p.PB6, p.EXTI6, Pull::None);
    unwrap!(spawner.spawn(data_clock_task(data_clock)));

    info!("Entering transmit loop");

    let mut sequence: u32 = 0;
    loop {
        let temperature = with_tracker(|t| t.radio_mut().read_temperature()).and_then(Result::ok);

        let mut sentence: String<64> = String::new();
        let _ = writeln!(
            sentence,
            "$$TRACKER,{},{}",
            sequence,
            temperature.unwrap_or(i16::MIN)
        );

        let started = with_tracker(|t| {
            t.start_rtty(sentence.as_bytes(), FREQUENCY_RTTY_HZ, RttyConfig::default())
        });
        finish_burst(started).await;

        Timer::after(Duration::from_secs(1)).await;

        let started = with_tracker(|t| {
            t.start_aprs(
                APRS_STRATEGY,
                &APRS_FRAME,
                APRS_LEADING_FLAGS,
                APRS_FRAME.len() - APRS_TRAILING_FLAGS,
            )
        });
        finish_burst(started).await;

        sequence = sequence.wrapping_add(1);
        Timer::after(Duration::from_secs(30)).await;
    }
}

/// Wait for a started burst to end, then take the chip out of TX
async fn finish_burst(started: Option<Result<(), RadioError>>) {
    match started {
        Some(Ok(())) => {
            let status = TX_DONE.wait().await;
            info!("Burst finished: {}", status);
        }
        Some(Err(e)) => warn!("Burst not started: {}", e),
        None => return,
    }
    if let Some(Err(e)) = with_tracker(|t| t.radio_mut().request_state_change(ChipState::Ready)) {
        warn!("Radio did not leave TX: {}", e);
    }
}

/// Feeds the ordinary GFSK engine on each chip data clock edge
#[embassy_executor::task]
async fn data_clock_task(mut clock: ExtiInput<'static>) {
    loop {
        clock.wait_for_rising_edge().await;
        with_tracker(|t| {
            t.on_data_clock();
            signal_finished(t);
        });
    }
}
