// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Boot controller: arm the receiver, commit pages until told to stop, hand off.
//!
//! Hardware specifics live behind [`Platform`], so the whole sequence runs on the
//! host against a fake.

use crate::committer::{Commit, Committer};
use crate::flash::FlashProgrammer;
use crate::handoff::{ExitReason, Handoff};

/// Board services the controller needs but does not implement.
pub trait Platform {
    /// Program the serial peripheral for update frames and enable its receive interrupt.
    fn configure_serial(&mut self);

    /// Put the serial peripheral back to its reset configuration.
    fn restore_serial(&mut self);

    fn enable_interrupts(&mut self);

    fn disable_interrupts(&mut self);

    /// One idle tick of the main loop.
    fn idle(&mut self) {}

    /// Called with every committer outcome other than [`Commit::Idle`].
    fn report(&mut self, _commit: Commit) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootPhase {
    Init,
    Running,
    ShuttingDown,
    Transferred,
}

/// Where to jump and why. Produced once shutdown is complete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transfer {
    pub entry: u32,
    pub reason: ExitReason,
}

pub struct BootController<'a, F, P> {
    handoff: &'a Handoff,
    committer: Committer<'a, F>,
    platform: P,
    phase: BootPhase,
}

impl<'a, F: FlashProgrammer, P: Platform> BootController<'a, F, P> {
    pub fn new(handoff: &'a Handoff, committer: Committer<'a, F>, platform: P) -> Self {
        Self {
            handoff,
            committer,
            platform,
            phase: BootPhase::Init,
        }
    }

    pub fn phase(&self) -> BootPhase {
        self.phase
    }

    pub fn committer(&self) -> &Committer<'a, F> {
        &self.committer
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// INIT: configure the line, clear the temporary page buffer, unmask interrupts.
    pub fn init(&mut self) {
        self.platform.configure_serial();
        self.committer.flash_mut().erase_temp_buffer();
        self.platform.enable_interrupts();
        self.phase = BootPhase::Running;
    }

    /// RUNNING: commit pages until a break or a valid end-of-image frame.
    pub fn run(&mut self) -> ExitReason {
        loop {
            if let Some(reason) = self.handoff.exit_reason() {
                self.phase = BootPhase::ShuttingDown;
                return reason;
            }
            self.commit_pending();
            self.platform.idle();
        }
    }

    /// SHUTTING_DOWN: mask interrupts, restore the UART, flush a frame that completed
    /// just before the exit was noticed.
    pub fn shutdown(&mut self, reason: ExitReason) -> Transfer {
        self.phase = BootPhase::ShuttingDown;
        self.platform.disable_interrupts();
        self.platform.restore_serial();
        self.commit_pending();
        self.phase = BootPhase::Transferred;

        // The flushed frame may itself have been the end-of-image marker.
        let reason = self.handoff.exit_reason().unwrap_or(reason);
        Transfer {
            entry: self.committer.layout().application_entry(),
            reason,
        }
    }

    /// The whole sequence. The caller performs the jump to `Transfer::entry`.
    pub fn boot(mut self) -> (Transfer, P) {
        self.init();
        let reason = self.run();
        let transfer = self.shutdown(reason);
        (transfer, self.platform)
    }

    fn commit_pending(&mut self) {
        let commit = self.committer.poll();
        if commit != Commit::Idle {
            self.platform.report(commit);
        }
    }
}
