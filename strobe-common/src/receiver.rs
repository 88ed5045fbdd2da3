// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Interrupt-side half of the update path.

use crate::handoff::Handoff;
use crate::parser::{Parser, ParserState};

/// Receive-interrupt component: one call per received character.
pub struct Receiver<'a> {
    parser: Parser,
    handoff: &'a Handoff,
}

impl<'a> Receiver<'a> {
    pub const fn new(handoff: &'a Handoff) -> Self {
        Self {
            parser: Parser::new(),
            handoff,
        }
    }

    /// Feed one character from the UART.
    ///
    /// `line_break` is the break flag latched with this character. A break requests
    /// exit from update mode and abandons the frame in progress; the character that
    /// carried it is not data.
    pub fn on_byte(&mut self, byte: u8, line_break: bool) {
        if line_break {
            self.handoff.request_exit();
            self.parser.reset();
            return;
        }
        if let Some(message) = self.parser.step(byte) {
            // An overrun is counted by the handoff; nothing else can be done here.
            let _ = self.handoff.publish(&message);
        }
    }

    pub fn state(&self) -> ParserState {
        self.parser.state()
    }
}
