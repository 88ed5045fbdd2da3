// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Boot controller tests with a scripted serial line standing in for the interrupt.

use std::collections::VecDeque;

use strobe_common::protocol::{encode_frame, Message, PREAMBLE};
use strobe_common::{
    BootController, BootPhase, Commit, Committer, ExitReason, Handoff, Layout, Platform,
    Receiver, Reject, SimFlash,
};

const LAYOUT: Layout = Layout::DEFAULT;
const MAX_IDLE_TICKS: usize = 10_000;

#[derive(Clone, Copy, Debug)]
enum Rx {
    Byte(u8),
    Break,
}

fn bytes(data: &[u8]) -> Vec<Rx> {
    data.iter().copied().map(Rx::Byte).collect()
}

/// Delivers one burst of line events per idle tick, as the UART interrupt would
/// between two main-loop iterations.
struct ScriptedLine<'a> {
    receiver: Receiver<'a>,
    bursts: VecDeque<Vec<Rx>>,
    calls: Vec<&'static str>,
    reports: Vec<Commit>,
    interrupts_enabled: bool,
    idle_ticks: usize,
}

impl<'a> ScriptedLine<'a> {
    fn new(handoff: &'a Handoff, bursts: Vec<Vec<Rx>>) -> Self {
        Self {
            receiver: Receiver::new(handoff),
            bursts: bursts.into(),
            calls: Vec::new(),
            reports: Vec::new(),
            interrupts_enabled: false,
            idle_ticks: 0,
        }
    }
}

impl Platform for ScriptedLine<'_> {
    fn configure_serial(&mut self) {
        self.calls.push("configure_serial");
    }

    fn restore_serial(&mut self) {
        self.calls.push("restore_serial");
    }

    fn enable_interrupts(&mut self) {
        self.interrupts_enabled = true;
        self.calls.push("enable_interrupts");
    }

    fn disable_interrupts(&mut self) {
        self.interrupts_enabled = false;
        self.calls.push("disable_interrupts");
    }

    fn idle(&mut self) {
        self.idle_ticks += 1;
        assert!(self.idle_ticks < MAX_IDLE_TICKS, "controller never left RUNNING");
        assert!(self.interrupts_enabled, "idle with interrupts masked");
        if let Some(burst) = self.bursts.pop_front() {
            for event in burst {
                match event {
                    Rx::Byte(b) => self.receiver.on_byte(b, false),
                    Rx::Break => self.receiver.on_byte(0x00, true),
                }
            }
        }
    }

    fn report(&mut self, commit: Commit) {
        self.reports.push(commit);
    }
}

fn boot(bursts: Vec<Vec<Rx>>) -> (strobe_common::Transfer, Vec<&'static str>, Vec<Commit>, SimFlash) {
    let handoff = Handoff::new();
    let mut flash = SimFlash::new(LAYOUT);
    let line = ScriptedLine::new(&handoff, bursts);
    let committer = Committer::new(&mut flash, &handoff, LAYOUT);
    let (transfer, line) = BootController::new(&handoff, committer, line).boot();
    (transfer, line.calls, line.reports, flash)
}

// =============================================================================
// Phase sequencing
// =============================================================================

#[test]
fn test_phases_advance_in_order() {
    let handoff = Handoff::new();
    let mut flash = SimFlash::new(LAYOUT);
    let line = ScriptedLine::new(&handoff, vec![vec![Rx::Break]]);
    let committer = Committer::new(&mut flash, &handoff, LAYOUT);
    let mut controller = BootController::new(&handoff, committer, line);

    assert_eq!(controller.phase(), BootPhase::Init);
    controller.init();
    assert_eq!(controller.phase(), BootPhase::Running);
    let reason = controller.run();
    assert_eq!(reason, ExitReason::LineBreak);
    assert_eq!(controller.phase(), BootPhase::ShuttingDown);
    controller.shutdown(reason);
    assert_eq!(controller.phase(), BootPhase::Transferred);
}

#[test]
fn test_init_clears_temp_buffer_once_before_unmasking() {
    let handoff = Handoff::new();
    let mut flash = SimFlash::new(LAYOUT);
    let line = ScriptedLine::new(&handoff, vec![]);
    let committer = Committer::new(&mut flash, &handoff, LAYOUT);
    let mut controller = BootController::new(&handoff, committer, line);

    controller.init();

    assert_eq!(controller.committer().flash().temp_erases(), 1);
    assert_eq!(controller.committer().flash().commit_count(), 0);
    assert_eq!(
        controller.platform().calls,
        ["configure_serial", "enable_interrupts"]
    );
    assert!(controller.platform().interrupts_enabled);
}

#[test]
fn test_peripheral_calls_bracket_the_run() {
    let (_, calls, _, _) = boot(vec![vec![Rx::Break]]);
    assert_eq!(
        calls,
        [
            "configure_serial",
            "enable_interrupts",
            "disable_interrupts",
            "restore_serial"
        ]
    );
}

#[test]
fn test_transfer_targets_application_start() {
    let (transfer, _, _, _) = boot(vec![vec![Rx::Break]]);
    assert_eq!(transfer.entry, LAYOUT.application_entry());
}

// =============================================================================
// Full updates
// =============================================================================

#[test]
fn test_image_then_end_of_image_boots() {
    let (transfer, _, reports, flash) = boot(vec![
        bytes(&encode_frame(16, &[0x00, 0x20, 0x00, 0x20])),
        bytes(&encode_frame(17, &[0x99; 64])),
        bytes(&Message::end_of_image(18).encode()),
    ]);

    assert_eq!(transfer.reason, ExitReason::EndOfImage);
    assert_eq!(
        reports,
        [
            Commit::Written { page: 16, len: 4 },
            Commit::Written { page: 17, len: 64 },
            Commit::EndOfImage,
        ]
    );
    assert_eq!(flash.written_pages().collect::<Vec<_>>(), [16, 17]);
    assert_eq!(flash.word(16, 2), 0x2000);
}

#[test]
fn test_rejected_pages_do_not_stop_the_update() {
    let mut corrupt = encode_frame(20, &[1, 2, 3, 4]);
    corrupt[5] ^= 0x40;
    let (transfer, _, reports, flash) = boot(vec![
        bytes(&encode_frame(3, &[0xEE; 8])),
        bytes(&corrupt),
        bytes(&encode_frame(21, &[5, 6])),
        bytes(&Message::end_of_image(22).encode()),
    ]);

    assert_eq!(transfer.reason, ExitReason::EndOfImage);
    assert_eq!(
        reports,
        [
            Commit::Rejected {
                page: 3,
                reason: Reject::ProtectedPage
            },
            Commit::Rejected {
                page: 20,
                reason: Reject::ChecksumMismatch
            },
            Commit::Written { page: 21, len: 2 },
            Commit::EndOfImage,
        ]
    );
    assert_eq!(flash.written_pages().collect::<Vec<_>>(), [21]);
}

// =============================================================================
// Break handling
// =============================================================================

#[test]
fn test_break_mid_frame_boots_without_waiting() {
    let (transfer, _, reports, flash) = boot(vec![vec![Rx::Byte(PREAMBLE), Rx::Byte(0x20), Rx::Break]]);

    assert_eq!(transfer.reason, ExitReason::LineBreak);
    assert!(reports.is_empty());
    assert_eq!(flash.commit_count(), 0);
}

#[test]
fn test_frame_completed_with_break_is_flushed_at_shutdown() {
    let mut burst = bytes(&[PREAMBLE, 0x10, 0x05, 0x01, 0x02, 0x03]);
    burst.push(Rx::Break);
    burst.extend(bytes(&[PREAMBLE, 0x12, 0x02, 0xAA, 0xBB, 0xAA, 0x7C]));

    let (transfer, _, reports, flash) = boot(vec![burst]);

    assert_eq!(transfer.reason, ExitReason::LineBreak);
    assert_eq!(reports, [Commit::Written { page: 0x12, len: 2 }]);
    assert_eq!(flash.word(0x12, 0), 0xBBAA);
}

#[test]
fn test_end_of_image_flushed_at_shutdown_reports_end_of_image() {
    let mut burst = bytes(&Message::end_of_image(0x40).encode());
    burst.push(Rx::Break);

    let (transfer, _, reports, _) = boot(vec![burst]);

    assert_eq!(reports, [Commit::EndOfImage]);
    assert_eq!(transfer.reason, ExitReason::EndOfImage);
}
