// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! DMX line on UART0: receive interrupt and the board side of the boot controller.

use core::cell::RefCell;

use cortex_m::peripheral::NVIC;
use critical_section::Mutex;
use rp2040_hal::fugit::RateExtU32;
use rp2040_hal::pac::{self, interrupt};
use rp2040_hal::uart::{DataBits, Enabled, StopBits, UartConfig, UartPeripheral};
use strobe_common::protocol::BAUD_RATE;
use strobe_common::{Commit, Handoff, Platform, Receiver};

use crate::peripherals::{DmxPins, Peripherals};

/// Shared between the UART interrupt and the main loop.
pub static HANDOFF: Handoff = Handoff::new();

static RECEIVER: Mutex<RefCell<Receiver<'static>>> =
    Mutex::new(RefCell::new(Receiver::new(&HANDOFF)));

// UART0 registers read directly from the interrupt
const UART0_BASE: u32 = 0x4003_4000;
const UART0_DR: *const u32 = UART0_BASE as *const u32;
const UART0_FR: *const u32 = (UART0_BASE + 0x18) as *const u32;
const UART_FR_RXFE: u32 = 1 << 4;
const UART_DR_BE: u32 = 1 << 10;

const RESETS_BASE: u32 = 0x4000_C000;
const RESETS_RESET_SET: *mut u32 = (RESETS_BASE + 0x2000) as *mut u32;
const RESETS_UART0_BIT: u32 = 1 << 22;

type DmxUart = UartPeripheral<Enabled, pac::UART0, DmxPins>;

/// Drain the receive FIFO into the frame parser.
#[interrupt]
fn UART0_IRQ() {
    critical_section::with(|cs| {
        let mut receiver = RECEIVER.borrow_ref_mut(cs);
        loop {
            let flags = unsafe { UART0_FR.read_volatile() };
            if flags & UART_FR_RXFE != 0 {
                break;
            }
            let data = unsafe { UART0_DR.read_volatile() };
            receiver.on_byte(data as u8, data & UART_DR_BE != 0);
        }
    });
}

enum Line {
    Unconfigured(Peripherals),
    Running(DmxUart),
    Released,
}

/// RP2040 services for the boot controller.
pub struct Board {
    line: Line,
}

impl Board {
    pub fn new(peripherals: Peripherals) -> Self {
        Self {
            line: Line::Unconfigured(peripherals),
        }
    }
}

impl Platform for Board {
    fn configure_serial(&mut self) {
        let mut p = match core::mem::replace(&mut self.line, Line::Released) {
            Line::Unconfigured(p) => p,
            other => {
                self.line = other;
                return;
            }
        };

        let config = UartConfig::new(BAUD_RATE.Hz(), DataBits::Eight, None, StopBits::Two);
        let mut uart = UartPeripheral::new(p.uart, p.pins, &mut p.resets)
            .enable(config, p.peripheral_clock)
            .unwrap();
        uart.enable_rx_interrupt();

        unsafe {
            NVIC::unmask(pac::Interrupt::UART0_IRQ);
        }
        defmt::println!("DMX line configured at {} baud", BAUD_RATE);
        self.line = Line::Running(uart);
    }

    fn restore_serial(&mut self) {
        NVIC::mask(pac::Interrupt::UART0_IRQ);
        NVIC::unpend(pac::Interrupt::UART0_IRQ);

        if let Line::Running(uart) = core::mem::replace(&mut self.line, Line::Released) {
            let _ = uart.disable();
        }

        // Back to power-on state so the application starts from a clean peripheral.
        unsafe {
            RESETS_RESET_SET.write_volatile(RESETS_UART0_BIT);
        }
    }

    fn enable_interrupts(&mut self) {
        unsafe {
            cortex_m::interrupt::enable();
        }
    }

    fn disable_interrupts(&mut self) {
        cortex_m::interrupt::disable();
    }

    fn idle(&mut self) {
        core::hint::spin_loop();
    }

    fn report(&mut self, commit: Commit) {
        match commit {
            Commit::Written { page, len } => defmt::println!("Page {} written ({} bytes)", page, len),
            Commit::Rejected { page, reason } => {
                defmt::println!("Page {} discarded: {}", page, reason)
            }
            Commit::EndOfImage => defmt::println!("End of image received"),
            Commit::Idle => {}
        }
    }
}

/// Frames dropped because the main loop fell behind the line.
pub fn overruns() -> u32 {
    HANDOFF.overruns()
}
