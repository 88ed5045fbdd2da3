// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash layout of the board and the jump into the resident application.

use strobe_common::protocol::PAGE_SIZE;
use strobe_common::Layout;

use crate::flash::{FLASH_BASE, FLASH_SECTOR_SIZE};

/// Flash owned by the bootloader, boot2 included. Must match `linker_scripts/bootloader_rp2040.x`.
pub const BOOTLOADER_SIZE: u32 = 32 * 1024;

/// The page window ends 8 KiB of application pages past the bootloader. Pages 0-127
/// fall on the tail of the bootloader's own flash and stay protected.
pub const RP2040_LAYOUT: Layout = Layout {
    page_base: FLASH_BASE + BOOTLOADER_SIZE - 128 * PAGE_SIZE as u32,
    application_start_page: 128,
};

// The application must start on its own sector: page erases rewrite whole sectors.
const _: () = assert!(RP2040_LAYOUT.application_entry() == FLASH_BASE + BOOTLOADER_SIZE);
const _: () = assert!(BOOTLOADER_SIZE % FLASH_SECTOR_SIZE == 0);

const RAM_START: u32 = 0x2000_0000;
const RAM_END: u32 = 0x2004_2000;

struct VectorTable {
    initial_sp: u32,
    reset_vector: u32,
}

impl VectorTable {
    unsafe fn read_from(addr: u32) -> Self {
        Self {
            initial_sp: (addr as *const u32).read_volatile(),
            reset_vector: (addr as *const u32).offset(1).read_volatile(),
        }
    }

    /// Stack in RAM, reset handler inside the application pages, Thumb bit set.
    fn is_plausible(&self, layout: &Layout) -> bool {
        let app_start = layout.application_entry();
        let app_end = layout.page_base + layout.window_size();
        (RAM_START..=RAM_END).contains(&self.initial_sp)
            && (app_start..app_end).contains(&(self.reset_vector & !1))
            && self.reset_vector & 1 == 1
    }
}

/// Whether the application pages hold something that looks bootable.
pub fn application_present(layout: &Layout) -> bool {
    let vt = unsafe { VectorTable::read_from(layout.application_entry()) };
    vt.is_plausible(layout)
}

/// Jump to the application whose vector table is at `entry`.
///
/// # Safety
/// `entry` must point to a valid vector table and the UART must already be released.
pub unsafe fn jump_to_application(entry: u32) -> ! {
    prepare_for_application_handoff();
    relocate_vector_table(entry);

    let vt = VectorTable::read_from(entry);
    jump(vt.initial_sp, vt.reset_vector);
}

unsafe fn prepare_for_application_handoff() {
    // Disable all interrupts
    cortex_m::interrupt::disable();

    // Clear all pending interrupts in NVIC
    const NVIC_ICPR: *mut u32 = 0xE000_E280 as *mut u32;
    NVIC_ICPR.write_volatile(0xFFFF_FFFF);

    // Disable all NVIC interrupts
    const NVIC_ICER: *mut u32 = 0xE000_E180 as *mut u32;
    NVIC_ICER.write_volatile(0xFFFF_FFFF);
}

unsafe fn relocate_vector_table(base: u32) {
    const SCB_VTOR: *mut u32 = 0xE000_ED08 as *mut u32;
    SCB_VTOR.write_volatile(base);

    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

unsafe fn jump(initial_sp: u32, reset_vector: u32) -> ! {
    core::arch::asm!(
        "msr msp, {sp}",
        "cpsie i",  // Re-enable interrupts before jumping (SDK expects PRIMASK=0)
        "bx {reset}",
        sp = in(reg) initial_sp,
        reset = in(reg) reset_vector,
        options(noreturn)
    );
}
