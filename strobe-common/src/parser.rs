// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Byte-at-a-time frame parser - pure logic without hardware dependencies.
//!
//! The parser runs in the serial receive interrupt, so every step is O(1) and never
//! fails. Malformed frames are framed anyway and left for checksum validation.

use crate::protocol::{Message, PAGE_SIZE, PREAMBLE};

/// Position within a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParserState {
    AwaitingPreamble,
    AwaitingPageNumber,
    AwaitingPayloadLength,
    AccumulatingPayload,
    AccumulatingChecksum,
}

/// Frame assembler owned by the receive path.
///
/// The message under construction is private to the parser; it only leaves through
/// the return value of [`Parser::step`] once the last checksum byte arrived.
#[derive(Clone, Debug)]
pub struct Parser {
    state: ParserState,
    counter: usize,
    working: Message,
}

impl Parser {
    pub const fn new() -> Self {
        Self {
            state: ParserState::AwaitingPreamble,
            counter: 0,
            working: Message::EMPTY,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Abandon any partial frame.
    pub fn reset(&mut self) {
        self.state = ParserState::AwaitingPreamble;
        self.counter = 0;
    }

    /// Consume one byte. Returns the framed message when `byte` completes it.
    pub fn step(&mut self, byte: u8) -> Option<Message> {
        match self.state {
            ParserState::AwaitingPreamble => {
                if byte == PREAMBLE {
                    self.state = ParserState::AwaitingPageNumber;
                }
            }
            ParserState::AwaitingPageNumber => {
                self.working.page_number = byte;
                self.state = ParserState::AwaitingPayloadLength;
            }
            ParserState::AwaitingPayloadLength => {
                self.working.payload_length = byte;
                self.counter = 0;
                self.state = if byte == 0 {
                    ParserState::AccumulatingChecksum
                } else {
                    ParserState::AccumulatingPayload
                };
            }
            ParserState::AccumulatingPayload => {
                self.working.data[self.counter] = byte;
                self.counter += 1;
                // Stop at the buffer bound even if the length field claims more.
                if self.counter == self.working.payload_length as usize || self.counter == PAGE_SIZE
                {
                    self.counter = 0;
                    self.state = ParserState::AccumulatingChecksum;
                }
            }
            ParserState::AccumulatingChecksum => {
                if self.counter == 0 {
                    self.working.checksum = byte as u16;
                    self.counter = 1;
                } else {
                    self.working.checksum |= (byte as u16) << 8;
                    self.reset();
                    return Some(self.working);
                }
            }
        }
        None
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_before_preamble_is_ignored() {
        let mut parser = Parser::new();
        for byte in [0x00, 0x13, 0xFF, 0x55] {
            assert!(parser.step(byte).is_none());
            assert_eq!(parser.state(), ParserState::AwaitingPreamble);
        }
        assert!(parser.step(PREAMBLE).is_none());
        assert_eq!(parser.state(), ParserState::AwaitingPageNumber);
    }

    #[test]
    fn test_zero_length_skips_payload() {
        let mut parser = Parser::new();
        parser.step(PREAMBLE);
        parser.step(0x30);
        parser.step(0x00);
        assert_eq!(parser.state(), ParserState::AccumulatingChecksum);
    }

    #[test]
    fn test_checksum_is_little_endian() {
        let mut parser = Parser::new();
        for byte in [PREAMBLE, 0x30, 0x00, 0x34] {
            assert!(parser.step(byte).is_none());
        }
        let msg = parser.step(0x12).unwrap();
        assert_eq!(msg.checksum, 0x1234);
        assert_eq!(parser.state(), ParserState::AwaitingPreamble);
    }

    #[test]
    fn test_reset_abandons_partial_frame() {
        let mut parser = Parser::new();
        parser.step(PREAMBLE);
        parser.step(0x10);
        parser.step(0x05);
        parser.step(0x01);
        parser.reset();
        assert_eq!(parser.state(), ParserState::AwaitingPreamble);
    }
}
