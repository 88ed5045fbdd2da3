// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Page programming on the RP2040 using ROM flash routines.
//!
//! On RP2040, flash operations (erase/program) require disabling XIP first.
//! The full sequence is:
//!   1. connect_internal_flash()
//!   2. flash_exit_xip()
//!   3. flash_range_erase() or flash_range_program()
//!   4. flash_flush_cache()
//!   5. flash_enter_cmd_xip()
//!
//! All code executing during steps 1-5 must run from RAM, not flash.
//! We use `#[link_section = ".data"]` to place critical functions in RAM,
//! and pre-resolve all ROM function pointers at init time.
//!
//! The external flash erases 4 KiB sectors and programs 256-byte pages, while the
//! update protocol works on 64-byte pages. A page erase is a read-modify-write of the
//! enclosing sector. A commit programs only the 256-byte program page holding it,
//! padded with 0xFF so neighbouring bytes are left as they are.

use strobe_common::flash::program_page_image;
use strobe_common::protocol::PAGE_SIZE;
use strobe_common::FlashProgrammer;

pub const FLASH_BASE: u32 = 0x1000_0000;
pub const FLASH_SECTOR_SIZE: u32 = 4096;
pub const FLASH_PROGRAM_SIZE: u32 = 256;

const SECTOR_ERASE_CMD: u8 = 0x20;
const ERASED: u8 = 0xFF;

const _: () = assert!(FLASH_PROGRAM_SIZE as usize % PAGE_SIZE == 0);

// ROM function pointer types
type RomFnVoid = unsafe extern "C" fn();
type RomFnErase = unsafe extern "C" fn(u32, usize, u32, u8);
type RomFnProgram = unsafe extern "C" fn(u32, *const u8, usize);

/// ROM function pointers, resolved once at init from the ROM table.
/// Stored in static RAM so RAM-resident functions can call them without
/// accessing flash-based code.
static mut ROM_CONNECT_INTERNAL_FLASH: RomFnVoid = dummy_void;
static mut ROM_FLASH_EXIT_XIP: RomFnVoid = dummy_void;
static mut ROM_FLASH_RANGE_ERASE: RomFnErase = dummy_erase;
static mut ROM_FLASH_RANGE_PROGRAM: RomFnProgram = dummy_program;
static mut ROM_FLASH_FLUSH_CACHE: RomFnVoid = dummy_void;
static mut ROM_FLASH_ENTER_CMD_XIP: RomFnVoid = dummy_void;

unsafe extern "C" fn dummy_void() {}
unsafe extern "C" fn dummy_erase(_: u32, _: usize, _: u32, _: u8) {}
unsafe extern "C" fn dummy_program(_: u32, _: *const u8, _: usize) {}

/// Look up a ROM function by its two-character tag.
/// ROM table pointer at 0x14 and lookup function at 0x18 are 16-bit halfword pointers.
unsafe fn rom_func_lookup(tag: &[u8; 2]) -> usize {
    let fn_table = *(0x14 as *const u16) as *const u16;
    let lookup: unsafe extern "C" fn(*const u16, u32) -> usize =
        core::mem::transmute::<usize, unsafe extern "C" fn(*const u16, u32) -> usize>(
            *(0x18 as *const u16) as usize,
        );
    let code = u16::from_le_bytes(*tag) as u32;
    lookup(fn_table, code)
}

/// Resolve the ROM flash routines. Requires XIP to be active.
fn init_rom_functions() {
    unsafe {
        ROM_CONNECT_INTERNAL_FLASH =
            core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"IF"));
        ROM_FLASH_EXIT_XIP = core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"EX"));
        ROM_FLASH_RANGE_ERASE =
            core::mem::transmute::<usize, RomFnErase>(rom_func_lookup(b"RE"));
        ROM_FLASH_RANGE_PROGRAM =
            core::mem::transmute::<usize, RomFnProgram>(rom_func_lookup(b"RP"));
        ROM_FLASH_FLUSH_CACHE = core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"FC"));
        ROM_FLASH_ENTER_CMD_XIP =
            core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"CX"));
    }
}

/// Erase one sector and program it back from `data`, entirely from RAM.
///
/// # Safety
/// ROM functions must be resolved, interrupts must be masked, and `offset` must be a
/// sector-aligned flash-relative offset outside the bootloader.
#[link_section = ".data"]
#[inline(never)]
unsafe fn rewrite_sector(offset: u32, data: *const u8) {
    ROM_CONNECT_INTERNAL_FLASH();
    ROM_FLASH_EXIT_XIP();
    ROM_FLASH_RANGE_ERASE(
        offset,
        FLASH_SECTOR_SIZE as usize,
        FLASH_SECTOR_SIZE,
        SECTOR_ERASE_CMD,
    );
    ROM_FLASH_RANGE_PROGRAM(offset, data, FLASH_SECTOR_SIZE as usize);
    ROM_FLASH_FLUSH_CACHE();
    ROM_FLASH_ENTER_CMD_XIP();
}

/// Program one 256-byte program page from `data`, entirely from RAM.
///
/// # Safety
/// ROM functions must be resolved, interrupts must be masked, and `offset` must be a
/// program-page-aligned flash-relative offset outside the bootloader.
#[link_section = ".data"]
#[inline(never)]
unsafe fn program_range(offset: u32, data: *const u8) {
    ROM_CONNECT_INTERNAL_FLASH();
    ROM_FLASH_EXIT_XIP();
    ROM_FLASH_RANGE_PROGRAM(offset, data, FLASH_PROGRAM_SIZE as usize);
    ROM_FLASH_FLUSH_CACHE();
    ROM_FLASH_ENTER_CMD_XIP();
}

/// Read bytes from an absolute XIP flash address via volatile reads.
fn flash_read(abs_addr: u32, buf: &mut [u8]) {
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte = unsafe { ((abs_addr + i as u32) as *const u8).read_volatile() };
    }
}

/// `FlashProgrammer` backed by the RP2040 QSPI flash.
pub struct Rp2040Flash {
    temp: [u8; PAGE_SIZE],
    sector: [u8; FLASH_SECTOR_SIZE as usize],
}

impl Rp2040Flash {
    pub fn new() -> Self {
        init_rom_functions();
        Self {
            temp: [ERASED; PAGE_SIZE],
            sector: [ERASED; FLASH_SECTOR_SIZE as usize],
        }
    }
}

impl FlashProgrammer for Rp2040Flash {
    fn load_word(&mut self, word: u16, offset: u8) {
        let offset = offset as usize;
        if offset + 2 <= PAGE_SIZE {
            self.temp[offset..offset + 2].copy_from_slice(&word.to_le_bytes());
        }
    }

    fn erase_temp_buffer(&mut self) {
        self.temp = [ERASED; PAGE_SIZE];
    }

    fn erase_page(&mut self, page_address: u32) {
        let sector_addr = page_address & !(FLASH_SECTOR_SIZE - 1);
        let start = (page_address - sector_addr) as usize;

        flash_read(sector_addr, &mut self.sector);
        self.sector[start..start + PAGE_SIZE].fill(ERASED);

        unsafe {
            rewrite_sector(sector_addr - FLASH_BASE, self.sector.as_ptr());
        }
    }

    fn commit_page(&mut self, page_address: u32) {
        let (program_addr, image) =
            program_page_image::<{ FLASH_PROGRAM_SIZE as usize }>(page_address, &self.temp);

        unsafe {
            program_range(program_addr - FLASH_BASE, image.as_ptr());
        }
        self.temp = [ERASED; PAGE_SIZE];
    }
}
