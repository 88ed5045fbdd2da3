// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Wire protocol shared by the bootloader and the host uploader.
//!
//! A frame on the DMX line is:
//!
//! | Field          | Size         |
//! |----------------|--------------|
//! | Preamble       | 1 byte       |
//! | Page number    | 1 byte       |
//! | Payload length | 1 byte       |
//! | Payload        | length bytes |
//! | Checksum       | 2 bytes (LE) |
//!
//! The checksum is CRC-16/XMODEM over page number, length and payload.
//! A payload length of zero marks the end of the image.

use crc::{Crc, CRC_16_XMODEM};
use heapless::Vec;

// --- Line and framing constants ---

pub const PREAMBLE: u8 = 0xAA;

/// DMX512 line rate, 8N2.
pub const BAUD_RATE: u32 = 250_000;

// --- Flash geometry ---

/// Bytes per flash page, and capacity of the message buffer.
pub const PAGE_SIZE: usize = 64;
/// Pages addressable by the 8-bit page number.
pub const PAGE_COUNT: usize = 256;
/// First page that may be written; everything below belongs to the bootloader.
pub const APPLICATION_START_PAGE: u8 = 16;

/// Preamble + page + length + payload + checksum.
pub const MAX_FRAME_LEN: usize = 3 + PAGE_SIZE + 2;

const _: () = assert!(PAGE_SIZE < u8::MAX as usize);
const _: () = assert!(PAGE_SIZE % 2 == 0);

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Compute the frame checksum over page number, payload length and payload.
///
/// `length` is folded in as transmitted, so it does not have to match `payload.len()`.
pub fn checksum(page_number: u8, length: u8, payload: &[u8]) -> u16 {
    let mut digest = CRC16.digest();
    digest.update(&[page_number, length]);
    digest.update(payload);
    digest.finalize()
}

/// One candidate page-update message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Message {
    pub page_number: u8,
    pub payload_length: u8,
    pub data: [u8; PAGE_SIZE],
    pub checksum: u16,
}

impl Message {
    pub const EMPTY: Self = Self {
        page_number: 0,
        payload_length: 0,
        data: [0; PAGE_SIZE],
        checksum: 0,
    };

    /// Build a message with a correct checksum. Payloads longer than a page are truncated.
    pub fn new(page_number: u8, payload: &[u8]) -> Self {
        let len = payload.len().min(PAGE_SIZE);
        let mut data = [0u8; PAGE_SIZE];
        data[..len].copy_from_slice(&payload[..len]);
        Self {
            page_number,
            payload_length: len as u8,
            data,
            checksum: checksum(page_number, len as u8, &payload[..len]),
        }
    }

    /// The end-of-image marker.
    pub fn end_of_image(page_number: u8) -> Self {
        Self::new(page_number, &[])
    }

    pub fn is_end_of_image(&self) -> bool {
        self.payload_length == 0
    }

    /// Payload bytes actually held by the buffer (at most one page).
    pub fn payload(&self) -> &[u8] {
        &self.data[..(self.payload_length as usize).min(PAGE_SIZE)]
    }

    /// Recompute the checksum and compare it with the received one.
    ///
    /// A declared length beyond the buffer capacity only folds in the bytes that were
    /// buffered, so such a message never verifies.
    pub fn verify(&self) -> bool {
        if self.payload_length as usize > PAGE_SIZE {
            return false;
        }
        checksum(self.page_number, self.payload_length, self.payload()) == self.checksum
    }

    /// Serialize into wire format.
    pub fn encode(&self) -> Vec<u8, MAX_FRAME_LEN> {
        let mut frame = Vec::new();
        // Capacity is MAX_FRAME_LEN and payload() is capped at PAGE_SIZE.
        let _ = frame.extend_from_slice(&[PREAMBLE, self.page_number, self.payload_length]);
        let _ = frame.extend_from_slice(self.payload());
        let _ = frame.extend_from_slice(&self.checksum.to_le_bytes());
        frame
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Encode a page frame in one go.
pub fn encode_frame(page_number: u8, payload: &[u8]) -> Vec<u8, MAX_FRAME_LEN> {
    Message::new(page_number, payload).encode()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_matches_xmodem_check_value() {
        // CRC-16/XMODEM check value for "123456789"
        let crc = checksum(b'1', b'2', b"3456789");
        assert_eq!(crc, 0x31C3);
    }

    #[test]
    fn test_checksum_of_empty_payload_covers_header() {
        assert_ne!(checksum(0x10, 0, &[]), checksum(0x11, 0, &[]));
    }

    #[test]
    fn test_encode_layout() {
        let frame = encode_frame(0x12, &[0xAA, 0xBB]);
        let crc = checksum(0x12, 0x02, &[0xAA, 0xBB]);
        assert_eq!(
            &frame[..],
            &[PREAMBLE, 0x12, 0x02, 0xAA, 0xBB, crc as u8, (crc >> 8) as u8]
        );
    }

    #[test]
    fn test_new_truncates_to_page() {
        let big = [0x5Au8; PAGE_SIZE + 10];
        let msg = Message::new(20, &big);
        assert_eq!(msg.payload_length as usize, PAGE_SIZE);
        assert!(msg.verify());
    }

    #[test]
    fn test_overlong_declared_length_never_verifies() {
        let mut msg = Message::new(20, &[1, 2, 3]);
        msg.payload_length = (PAGE_SIZE + 1) as u8;
        msg.checksum = checksum(20, msg.payload_length, &msg.data);
        assert!(!msg.verify());
    }
}
