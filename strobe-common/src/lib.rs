// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Common types and logic for the strobe DMX bootloader.
//!
//! Everything here is hardware-independent and runs both on the device and on the host:
//! - Default: `no_std` mode for embedded targets
//! - `std` feature: host support (critical-section implementation for std)
//! - `defmt` feature: `defmt::Format` on outcome types for device logging
//!
//! The update path is split in two halves that meet in a [`Handoff`]:
//! the [`Receiver`] runs in the UART receive interrupt and frames bytes with a
//! [`Parser`], the [`Committer`] runs in the main loop and programs flash through a
//! [`FlashProgrammer`]. The [`BootController`] sequences both.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod committer;
pub mod controller;
pub mod flash;
pub mod handoff;
pub mod parser;
pub mod protocol;
pub mod receiver;

// Re-export commonly used types
pub use committer::{Commit, Committer, Reject};
pub use controller::{BootController, BootPhase, Platform, Transfer};
pub use flash::{FlashProgrammer, Layout};
#[cfg(feature = "std")]
pub use flash::SimFlash;
pub use handoff::{ExitReason, Handoff, Overrun};
pub use parser::{Parser, ParserState};
pub use protocol::{checksum, encode_frame, Message};
pub use protocol::{APPLICATION_START_PAGE, BAUD_RATE, PAGE_COUNT, PAGE_SIZE, PREAMBLE};
pub use receiver::Receiver;
