// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! State shared between the receive interrupt and the main loop.
//!
//! There is a single message slot. The receiver publishes a complete frame into it,
//! the committer drains it. Both sides touch the slot only inside a critical section,
//! which on the device means interrupts are masked.
//!
//! Only plain atomic loads and stores are used: the Cortex-M0+ has no atomic
//! read-modify-write instructions.

use core::cell::RefCell;
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use critical_section::Mutex;

use crate::protocol::Message;

/// Why the bootloader stopped waiting for frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExitReason {
    /// A line break was seen on the bus.
    LineBreak,
    /// A valid end-of-image frame was committed.
    EndOfImage,
}

/// A frame completed while the previous one was still waiting to be committed.
///
/// The newer frame is dropped; the pending one stays intact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Overrun;

impl fmt::Display for Overrun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("frame arrived before the previous one was committed")
    }
}

/// Single-producer/single-consumer message cell plus the terminal flags.
pub struct Handoff {
    slot: Mutex<RefCell<Message>>,
    ready: AtomicBool,
    overruns: AtomicU32,
    line_break: AtomicBool,
    boot_now: AtomicBool,
}

impl Handoff {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(RefCell::new(Message::EMPTY)),
            ready: AtomicBool::new(false),
            overruns: AtomicU32::new(0),
            line_break: AtomicBool::new(false),
            boot_now: AtomicBool::new(false),
        }
    }

    /// Hand a framed message to the committer. Receiver side only.
    pub fn publish(&self, message: &Message) -> Result<(), Overrun> {
        critical_section::with(|cs| {
            if self.ready.load(Ordering::Acquire) {
                let count = self.overruns.load(Ordering::Relaxed);
                self.overruns.store(count.saturating_add(1), Ordering::Relaxed);
                return Err(Overrun);
            }
            *self.slot.borrow_ref_mut(cs) = *message;
            self.ready.store(true, Ordering::Release);
            Ok(())
        })
    }

    /// Run `f` on the pending message, if any, then free the slot.
    ///
    /// `f` runs inside the critical section, so the slot cannot change underneath it.
    /// The slot is released whatever `f` decides. Committer side only.
    pub fn take_with<R>(&self, f: impl FnOnce(&Message) -> R) -> Option<R> {
        if !self.ready.load(Ordering::Acquire) {
            return None;
        }
        critical_section::with(|cs| {
            if !self.ready.load(Ordering::Acquire) {
                return None;
            }
            let result = f(&*self.slot.borrow_ref(cs));
            self.ready.store(false, Ordering::Release);
            Some(result)
        })
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Number of frames dropped because the slot was still full.
    pub fn overruns(&self) -> u32 {
        self.overruns.load(Ordering::Relaxed)
    }

    pub fn request_exit(&self) {
        self.line_break.store(true, Ordering::Release);
    }

    pub fn request_boot(&self) {
        self.boot_now.store(true, Ordering::Release);
    }

    pub fn boot_requested(&self) -> bool {
        self.boot_now.load(Ordering::Acquire)
    }

    /// The terminal condition, if one has been raised. End-of-image wins over a break.
    pub fn exit_reason(&self) -> Option<ExitReason> {
        if self.boot_now.load(Ordering::Acquire) {
            Some(ExitReason::EndOfImage)
        } else if self.line_break.load(Ordering::Acquire) {
            Some(ExitReason::LineBreak)
        } else {
            None
        }
    }
}

impl Default for Handoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_on_empty_slot_does_not_run_closure() {
        let handoff = Handoff::new();
        let mut ran = false;
        assert!(handoff.take_with(|_| ran = true).is_none());
        assert!(!ran);
    }

    #[test]
    fn test_publish_then_take_releases_slot() {
        let handoff = Handoff::new();
        let msg = Message::new(20, &[1, 2]);
        handoff.publish(&msg).unwrap();
        assert!(handoff.is_ready());
        let page = handoff.take_with(|m| m.page_number);
        assert_eq!(page, Some(20));
        assert!(!handoff.is_ready());
    }

    #[test]
    fn test_second_publish_overruns_and_keeps_first() {
        let handoff = Handoff::new();
        handoff.publish(&Message::new(20, &[1])).unwrap();
        assert_eq!(handoff.publish(&Message::new(21, &[2])), Err(Overrun));
        assert_eq!(handoff.overruns(), 1);
        assert_eq!(handoff.take_with(|m| m.page_number), Some(20));
    }

    #[test]
    fn test_end_of_image_takes_precedence_over_break() {
        let handoff = Handoff::new();
        assert_eq!(handoff.exit_reason(), None);
        handoff.request_exit();
        assert_eq!(handoff.exit_reason(), Some(ExitReason::LineBreak));
        handoff.request_boot();
        assert_eq!(handoff.exit_reason(), Some(ExitReason::EndOfImage));
    }
}
