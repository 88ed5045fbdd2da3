// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Peripheral initialization for the bootloader.

use rp2040_hal as hal;
use rp2040_hal::fugit::HertzU32;
use rp2040_hal::Clock;

pub type DmxTxPin = hal::gpio::Pin<hal::gpio::bank0::Gpio0, hal::gpio::FunctionUart, hal::gpio::PullDown>;
pub type DmxRxPin = hal::gpio::Pin<hal::gpio::bank0::Gpio1, hal::gpio::FunctionUart, hal::gpio::PullDown>;
pub type DmxPins = (DmxTxPin, DmxRxPin);

/// Everything the DMX line needs, still unconfigured.
pub struct Peripherals {
    pub uart: hal::pac::UART0,
    pub pins: DmxPins,
    pub resets: hal::pac::RESETS,
    pub peripheral_clock: HertzU32,
}

pub fn init() -> Peripherals {
    let mut pac = unsafe { hal::pac::Peripherals::steal() };

    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);
    let clocks = hal::clocks::init_clocks_and_plls(
        12_000_000u32,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .unwrap();

    let sio = hal::Sio::new(pac.SIO);
    let pins = hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    Peripherals {
        uart: pac.UART0,
        pins: (pins.gpio0.into_function(), pins.gpio1.into_function()),
        resets: pac.RESETS,
        peripheral_clock: clocks.peripheral_clock.freq(),
    }
}
