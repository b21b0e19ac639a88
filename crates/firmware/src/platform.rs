//! Board glue: register-level GPIO access for the serial link, a cycle-counted delay, and the Nucleo's Arduino-style
//! Zio header map.

use crate::RX_ARMED;
use defmt::debug;
use embassy_stm32::pac::{self, gpio::regs::Bsrr};
use embedded_hal::delay::DelayNs;
use serial_synth_lib::pin::{PinLocation, Port, PortName, PortPin};

/// Core clock as configured in `main`.
pub const CORE_CLOCK_HZ: u32 = 216_000_000;

const CYCLES_PER_MICROSECOND: u32 = CORE_CLOCK_HZ / 1_000_000;

/// A GPIO port, accessed through its registers so the receive path can sample a line that embassy also watches for
/// edges.
#[derive(Clone, Copy)]
pub struct Gpio {
    regs: pac::gpio::Gpio,
}

impl Gpio {
    /// The registers of `port`.
    pub fn new(port: PortName) -> Self {
        let regs = match port {
            PortName::A => pac::GPIOA,
            PortName::B => pac::GPIOB,
            PortName::C => pac::GPIOC,
            PortName::D => pac::GPIOD,
            PortName::E => pac::GPIOE,
            PortName::F => pac::GPIOF,
            PortName::G => pac::GPIOG,
            PortName::H => pac::GPIOH,
        };
        Self { regs }
    }

    /// A pin at `location`.
    pub fn pin(location: PinLocation) -> PortPin<Self> {
        PortPin::new(Self::new(location.port), location.bit)
    }
}

impl Port for Gpio {
    fn read(&self) -> u32 {
        self.regs.idr().read().0
    }

    fn set(&self, mask: u32) {
        self.regs.bsrr().write_value(Bsrr(mask));
    }

    fn clear(&self, mask: u32) {
        // Upper half of BSRR resets
        self.regs.bsrr().write_value(Bsrr(mask << 16));
    }

    /// The EXTI line is configured by embassy; arming it here only lets the edge task start handling edges.
    fn listen(&self, mask: u32) {
        debug!("Receive armed on mask {=u32:x}", mask);
        RX_ARMED.signal(());
    }
}

/// Busy-wait measured in CPU cycles. Wrapped in [`Calibrated`](serial_synth_lib::delay::Calibrated) it paces the
/// serial link; bare, it serves the display's microsecond waits.
#[derive(Clone, Copy)]
pub struct CycleDelay;

impl DelayNs for CycleDelay {
    fn delay_ns(&mut self, ns: u32) {
        let cycles = u64::from(ns) * u64::from(CYCLES_PER_MICROSECOND) / 1_000;
        cortex_m::asm::delay(cycles.min(u64::from(u32::MAX)) as u32);
    }
}

/// Pin map of the Nucleo-144 Zio connector's Arduino-compatible header.
pub mod zio {
    use serial_synth_lib::pin::{PinLocation, PortName};

    const fn at(port: PortName, bit: u8) -> Option<PinLocation> {
        Some(PinLocation { port, bit })
    }

    /// Locates header pin `D{pin}`.
    pub const fn locate(pin: u8) -> Option<PinLocation> {
        match pin {
            0 => at(PortName::G, 9),
            1 => at(PortName::G, 14),
            2 => at(PortName::F, 15),
            3 => at(PortName::E, 13),
            4 => at(PortName::F, 14),
            5 => at(PortName::E, 11),
            6 => at(PortName::E, 9),
            7 => at(PortName::F, 13),
            8 => at(PortName::F, 12),
            9 => at(PortName::D, 15),
            10 => at(PortName::D, 14),
            11 => at(PortName::A, 7),
            12 => at(PortName::A, 6),
            13 => at(PortName::A, 5),
            14 => at(PortName::B, 9),
            15 => at(PortName::B, 8),
            _ => None,
        }
    }
}
