// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Strobe bootloader for RP2040: firmware update over the DMX line.
//!
//! After reset the bootloader listens on UART0 at the DMX line rate. Update frames are
//! programmed page by page until an end-of-image frame or a line break arrives, then
//! the resident application is started.

#![no_std]
#![no_main]

mod boot;
mod flash;
mod peripherals;
mod serial;

use defmt_rtt as _;
use panic_probe as _;
use strobe_common::{BootController, Committer};

defmt::timestamp!("{=u64:us}", { 0 });

use cortex_m_rt::entry;

#[unsafe(link_section = ".boot2")]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

#[entry]
fn main() -> ! {
    defmt::println!("Bootloader init");

    let p = peripherals::init();
    let board = serial::Board::new(p);
    let committer = Committer::new(
        flash::Rp2040Flash::new(),
        &serial::HANDOFF,
        boot::RP2040_LAYOUT,
    );

    defmt::println!("Waiting for update frames");
    let (transfer, _board) = BootController::new(&serial::HANDOFF, committer, board).boot();

    defmt::println!(
        "Leaving update mode: {} ({} frames overrun)",
        transfer.reason,
        serial::overruns()
    );

    if !boot::application_present(&boot::RP2040_LAYOUT) {
        defmt::println!("No valid application, restarting update mode");
        cortex_m::peripheral::SCB::sys_reset();
    }

    defmt::println!("Jumping to application at 0x{:08x}", transfer.entry);
    unsafe { boot::jump_to_application(transfer.entry) }
}
