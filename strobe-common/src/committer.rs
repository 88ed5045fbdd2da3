// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Main-loop half of the update path: validate the pending frame and program it.

use core::fmt;

use crate::flash::{FlashProgrammer, Layout};
use crate::handoff::Handoff;
use crate::protocol::Message;

/// Why a framed message was discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reject {
    /// Target page belongs to the bootloader.
    ProtectedPage,
    /// Recomputed CRC differs from the received one.
    ChecksumMismatch,
}

impl fmt::Display for Reject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reject::ProtectedPage => f.write_str("page is reserved for the bootloader"),
            Reject::ChecksumMismatch => f.write_str("checksum mismatch"),
        }
    }
}

/// Outcome of one committer pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Commit {
    /// No frame was pending.
    Idle,
    Written { page: u8, len: u8 },
    Rejected { page: u8, reason: Reject },
    /// A valid end-of-image frame; boot has been requested.
    EndOfImage,
}

/// Decide what to do with a framed message, without touching flash.
pub fn validate(message: &Message, layout: &Layout) -> Result<(), Reject> {
    if layout.is_protected(message.page_number) {
        return Err(Reject::ProtectedPage);
    }
    if !message.verify() {
        return Err(Reject::ChecksumMismatch);
    }
    Ok(())
}

/// Load `payload` into the temporary buffer and program it at `page_address`.
pub fn program_page<F: FlashProgrammer>(flash: &mut F, page_address: u32, payload: &[u8]) {
    flash.erase_temp_buffer();
    for (i, pair) in payload.chunks(2).enumerate() {
        // A trailing odd byte is paired with the erased value.
        let high = pair.get(1).copied().unwrap_or(0xFF);
        let word = u16::from_le_bytes([pair[0], high]);
        flash.load_word(word, (i * 2) as u8);
    }
    flash.erase_page(page_address);
    flash.commit_page(page_address);
}

/// Drains the handoff slot into flash.
pub struct Committer<'a, F> {
    flash: F,
    handoff: &'a Handoff,
    layout: Layout,
}

impl<'a, F: FlashProgrammer> Committer<'a, F> {
    pub fn new(flash: F, handoff: &'a Handoff, layout: Layout) -> Self {
        Self {
            flash,
            handoff,
            layout,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Process the pending frame, if any.
    ///
    /// Inspection and programming happen inside the handoff's critical section, and
    /// the slot is free again when this returns.
    pub fn poll(&mut self) -> Commit {
        let handoff = self.handoff;
        let layout = &self.layout;
        let flash = &mut self.flash;

        handoff
            .take_with(|message| match validate(message, layout) {
                Err(reason) => Commit::Rejected {
                    page: message.page_number,
                    reason,
                },
                Ok(()) if message.is_end_of_image() => {
                    handoff.request_boot();
                    Commit::EndOfImage
                }
                Ok(()) => {
                    program_page(flash, layout.page_address(message.page_number), message.payload());
                    Commit::Written {
                        page: message.page_number,
                        len: message.payload_length,
                    }
                }
            })
            .unwrap_or(Commit::Idle)
    }
}
