// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash self-programming interface and page geometry.
//!
//! The committer drives flash through [`FlashProgrammer`]. The device binds it to
//! real flash routines; `SimFlash` (`std` only) keeps an in-memory image for tests and for the
//! uploader's dry run.

#[cfg(feature = "std")]
use heapless::Vec;

use crate::protocol::{APPLICATION_START_PAGE, PAGE_COUNT, PAGE_SIZE};

/// Atomic flash primitives. Every call blocks until the hardware is done and is only
/// issued from inside a critical section.
pub trait FlashProgrammer {
    /// Store a 16-bit word into the temporary page buffer at byte `offset`.
    fn load_word(&mut self, word: u16, offset: u8);

    /// Reset the temporary page buffer to the erased state.
    fn erase_temp_buffer(&mut self);

    /// Erase the page starting at `page_address`.
    fn erase_page(&mut self, page_address: u32);

    /// Program the temporary page buffer into the page starting at `page_address`.
    /// The temporary buffer is consumed.
    fn commit_page(&mut self, page_address: u32);
}

impl<F: FlashProgrammer + ?Sized> FlashProgrammer for &mut F {
    fn load_word(&mut self, word: u16, offset: u8) {
        (**self).load_word(word, offset)
    }

    fn erase_temp_buffer(&mut self) {
        (**self).erase_temp_buffer()
    }

    fn erase_page(&mut self, page_address: u32) {
        (**self).erase_page(page_address)
    }

    fn commit_page(&mut self, page_address: u32) {
        (**self).commit_page(page_address)
    }
}

/// Where pages live and which of them belong to the bootloader.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Layout {
    /// Address of page 0.
    pub page_base: u32,
    /// Pages below this one are never written.
    pub application_start_page: u8,
}

impl Layout {
    /// Protocol default: page 0 at address 0, first 1 KiB reserved.
    pub const DEFAULT: Self = Self {
        page_base: 0,
        application_start_page: APPLICATION_START_PAGE,
    };

    pub const fn page_address(&self, page_number: u8) -> u32 {
        self.page_base + page_number as u32 * PAGE_SIZE as u32
    }

    pub const fn is_protected(&self, page_number: u8) -> bool {
        page_number < self.application_start_page
    }

    /// Reset entry of the resident application.
    pub const fn application_entry(&self) -> u32 {
        self.page_address(self.application_start_page)
    }

    /// Bytes covered by all addressable pages.
    pub const fn window_size(&self) -> u32 {
        (PAGE_COUNT * PAGE_SIZE) as u32
    }

    /// Page number for an address inside the window.
    pub fn page_of(&self, address: u32) -> Option<u8> {
        let offset = address.checked_sub(self.page_base)?;
        if offset >= self.window_size() {
            return None;
        }
        Some((offset / PAGE_SIZE as u32) as u8)
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

const ERASED: u8 = 0xFF;

/// Place a page inside the `N`-byte program unit that holds it.
///
/// Returns the unit's address and its contents: the page at its offset, 0xFF
/// everywhere else. Programming 0xFF leaves flash unchanged, so the neighbours
/// of the page survive without a read-modify-write. `N` must be a power-of-two
/// multiple of `PAGE_SIZE`.
pub fn program_page_image<const N: usize>(
    page_address: u32,
    page: &[u8; PAGE_SIZE],
) -> (u32, [u8; N]) {
    let unit_addr = page_address & !(N as u32 - 1);
    let start = (page_address - unit_addr) as usize;

    let mut image = [ERASED; N];
    image[start..start + PAGE_SIZE].copy_from_slice(page);
    (unit_addr, image)
}

/// In-memory flash covering the whole page window. Host only.
///
/// Programming can only clear bits, like real NOR flash. Every access outside the
/// window or the temporary buffer is counted rather than performed.
#[cfg(feature = "std")]
pub struct SimFlash {
    layout: Layout,
    memory: [u8; PAGE_COUNT * PAGE_SIZE],
    temp: [u8; PAGE_SIZE],
    commits: Vec<u32, PAGE_COUNT>,
    commit_count: usize,
    page_erases: usize,
    temp_erases: usize,
    word_loads: usize,
    out_of_bounds: usize,
}

#[cfg(feature = "std")]
impl SimFlash {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            memory: [ERASED; PAGE_COUNT * PAGE_SIZE],
            temp: [ERASED; PAGE_SIZE],
            commits: Vec::new(),
            commit_count: 0,
            page_erases: 0,
            temp_erases: 0,
            word_loads: 0,
            out_of_bounds: 0,
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Contents of one page.
    pub fn page(&self, page_number: u8) -> &[u8] {
        let start = page_number as usize * PAGE_SIZE;
        &self.memory[start..start + PAGE_SIZE]
    }

    /// Read a 16-bit little-endian word at byte `offset` of a page.
    pub fn word(&self, page_number: u8, offset: usize) -> u16 {
        let page = self.page(page_number);
        u16::from_le_bytes([page[offset], page[offset + 1]])
    }

    /// Addresses passed to `commit_page`, in order (first `PAGE_COUNT` only).
    pub fn commits(&self) -> &[u32] {
        &self.commits
    }

    /// Pages that received a commit, in order.
    pub fn written_pages(&self) -> impl Iterator<Item = u8> + '_ {
        self.commits.iter().filter_map(|&addr| self.layout.page_of(addr))
    }

    pub fn commit_count(&self) -> usize {
        self.commit_count
    }

    pub fn page_erases(&self) -> usize {
        self.page_erases
    }

    /// Explicit `erase_temp_buffer` calls. A commit resets the buffer without counting.
    pub fn temp_erases(&self) -> usize {
        self.temp_erases
    }

    pub fn word_loads(&self) -> usize {
        self.word_loads
    }

    /// Accesses that would have landed outside a page or the window.
    pub fn out_of_bounds(&self) -> usize {
        self.out_of_bounds
    }

    fn page_index(&mut self, page_address: u32) -> Option<usize> {
        let aligned = page_address
            .checked_sub(self.layout.page_base)
            .is_some_and(|offset| offset % PAGE_SIZE as u32 == 0);
        match self.layout.page_of(page_address) {
            Some(page) if aligned => Some(page as usize * PAGE_SIZE),
            _ => {
                self.out_of_bounds += 1;
                None
            }
        }
    }
}

#[cfg(feature = "std")]
impl FlashProgrammer for SimFlash {
    fn load_word(&mut self, word: u16, offset: u8) {
        let offset = offset as usize;
        if offset + 2 > PAGE_SIZE {
            self.out_of_bounds += 1;
            return;
        }
        self.temp[offset..offset + 2].copy_from_slice(&word.to_le_bytes());
        self.word_loads += 1;
    }

    fn erase_temp_buffer(&mut self) {
        self.temp = [ERASED; PAGE_SIZE];
        self.temp_erases += 1;
    }

    fn erase_page(&mut self, page_address: u32) {
        if let Some(start) = self.page_index(page_address) {
            self.memory[start..start + PAGE_SIZE].fill(ERASED);
            self.page_erases += 1;
        }
    }

    fn commit_page(&mut self, page_address: u32) {
        if let Some(start) = self.page_index(page_address) {
            for (cell, byte) in self.memory[start..start + PAGE_SIZE].iter_mut().zip(self.temp) {
                *cell &= byte;
            }
            let _ = self.commits.push(page_address);
            self.commit_count += 1;
        }
        self.temp = [ERASED; PAGE_SIZE];
    }
}
