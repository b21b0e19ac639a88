//! Serial Synth is [Embassy](https://embassy.dev)-based firmware for a General MIDI synthesizer shield and an HP/DEC
//! vacuum fluorescent display, running on the [Nucleo-F767ZI development
//! board](https://www.st.com/en/evaluation-tools/nucleo-f767zi.html).
//!
//! The synth listens on a single serial line that the board drives in software, which leaves the hardware UARTs
//! free. MIDI arriving on the link's receive line is echoed through to the synth, and each note played is shown on
//! the display.
//!
//! Wiring uses the Zio header's Arduino numbering: synth link receive on D2 and transmit on D4, display clock on
//! D6 and data on D5.

#![no_std]
#![no_main]

mod display;
mod platform;
mod synth;

use crate::platform::{CycleDelay, Gpio, zio};
use core::cell::RefCell;
use defmt::{info, unwrap};
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_stm32::{
    Config,
    exti::ExtiInput,
    gpio::{Level, Output, Pull, Speed},
    interrupt,
    interrupt::{InterruptExt, Priority},
    time::Hertz,
};
use embassy_sync::{
    blocking_mutex::{Mutex, raw::CriticalSectionRawMutex},
    signal::Signal,
};
use serial_synth_lib::{
    delay::Calibrated,
    midi::{ReverbProgram, Synth},
    pin::PortPin,
    registry::Registry,
    serial::SerialLink,
    vfd::Vfd,
};
use wmidi::Note;

#[cfg(feature = "defmt-rtt")]
use defmt_rtt as _;
#[cfg(not(feature = "panic-probe"))]
use panic_halt as _;
#[cfg(feature = "panic-probe")]
use panic_probe as _;

/// Zio header pins, in Arduino numbering.
const SYNTH_RX_PIN: u8 = 2;
const SYNTH_TX_PIN: u8 = 4;

/// General MIDI program the synth starts on (acoustic grand piano).
const DEFAULT_PROGRAM: u8 = 0;

type Link = SerialLink<'static, PortPin<Gpio>, Output<'static>, Calibrated<CycleDelay>>;
type SynthDriver = Synth<Link, CycleDelay>;
type SynthCell = Mutex<CriticalSectionRawMutex, RefCell<Option<SynthDriver>>>;

/// Owns the shared receive buffer for every software serial link.
static REGISTRY: Registry = Registry::new();

/// The synth, shared between the edge handler and the MIDI-thru task.
static SYNTH: SynthCell = Mutex::new(RefCell::new(None));

/// Raised once the link has armed its receive line.
static RX_ARMED: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// The most recent note sent through to the synth.
static NOTE_PLAYED: Signal<CriticalSectionRawMutex, Note> = Signal::new();

/// Runs the receive path above everything on the thread executor.
static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn UART4() {
    unsafe { EXECUTOR_HIGH.on_interrupt() }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Initializing Serial Synth");

    let mut config = Config::default();
    {
        use embassy_stm32::rcc::*;
        // hse: high-speed external clock
        config.rcc.hse = Some(Hse {
            freq: Hertz(8_000_000),
            mode: HseMode::Bypass,
        });

        // pll: phase-locked loop, crucial for dividing clock
        config.rcc.pll_src = PllSource::HSE;
        config.rcc.pll = Some(Pll {
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL216,
            divp: Some(PllPDiv::DIV2), // 8mhz / 4 * 216 / 2 = 216Mhz, see platform::CORE_CLOCK_HZ
            divq: None,
            divr: None,
        });
        config.rcc.ahb_pre = AHBPrescaler::DIV1;
        config.rcc.apb1_pre = APBPrescaler::DIV4;
        config.rcc.apb2_pre = APBPrescaler::DIV2;
        config.rcc.sys = Sysclk::PLL1_P;
    }
    let p = embassy_stm32::init(config);

    // The edge task owns the EXTI line; the link samples the same pin through its port registers
    let rx_location = zio::locate(SYNTH_RX_PIN).expect("Synth receive pin should be on the Zio header");
    let tx_location = zio::locate(SYNTH_TX_PIN).expect("Synth transmit pin should be on the Zio header");
    info!("Synth link on {} (rx), {} (tx)", rx_location, tx_location);

    let rx_edge = ExtiInput::new(p.PF15, p.EXTI15, Pull::Up);
    let tx = Output::new(p.PF14, Level::High, Speed::VeryHigh);
    let link = unwrap!(SerialLink::new(
        &REGISTRY,
        Gpio::pin(rx_location),
        tx,
        Calibrated::new(CycleDelay)
    ));

    let mut synth = Synth::new(link, CycleDelay);
    synth.begin();
    if !synth.port_mut().is_configured() {
        defmt::panic!("Synth link has no timing for MIDI");
    }
    unwrap!(synth.midi_reset());
    unwrap!(synth.program_change(0, 0, DEFAULT_PROGRAM));
    unwrap!(synth.set_reverb(0, ReverbProgram::Hall1, 0x40, 0));
    unwrap!(synth.set_master_volume(0x7F));
    SYNTH.lock(|cell| *cell.borrow_mut() = Some(synth));

    interrupt::UART4.set_priority(Priority::P6);
    let high_spawner = EXECUTOR_HIGH.start(interrupt::UART4);
    unwrap!(high_spawner.spawn(synth::receive(rx_edge)));

    unwrap!(spawner.spawn(synth::midi_thru()));

    let vfd_clock = Output::new(p.PE9, Level::High, Speed::Low);
    let vfd_data = Output::new(p.PE11, Level::Low, Speed::Low);
    let vfd = unwrap!(Vfd::new(vfd_clock, vfd_data, CycleDelay));
    unwrap!(spawner.spawn(display::display(vfd)));
}
