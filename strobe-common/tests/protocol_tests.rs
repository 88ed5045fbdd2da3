// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for wire constants, checksums and frame validation.

use strobe_common::protocol::{
    checksum, encode_frame, Message, APPLICATION_START_PAGE, BAUD_RATE, MAX_FRAME_LEN, PAGE_COUNT,
    PAGE_SIZE, PREAMBLE,
};
use strobe_common::Parser;

fn parse_all(bytes: &[u8]) -> Vec<Message> {
    let mut parser = Parser::new();
    bytes.iter().filter_map(|&b| parser.step(b)).collect()
}

// =============================================================================
// Constants
// =============================================================================

#[test]
fn test_line_constants() {
    assert_eq!(PREAMBLE, 0xAA);
    assert_eq!(BAUD_RATE, 250_000);
}

#[test]
fn test_page_geometry() {
    assert_eq!(PAGE_SIZE, 64);
    assert_eq!(PAGE_COUNT, 256);
    assert_eq!(MAX_FRAME_LEN, 3 + PAGE_SIZE + 2);
}

#[test]
fn test_bootloader_region_is_first_kilobyte() {
    assert_eq!(APPLICATION_START_PAGE as usize * PAGE_SIZE, 1024);
}

// =============================================================================
// Checksum round trip
// =============================================================================

#[test]
fn test_round_trip_through_parser_preserves_payload() {
    for len in [1usize, 2, 7, 32, PAGE_SIZE] {
        let payload: Vec<u8> = (0..len).map(|i| (i * 37 + 5) as u8).collect();
        let frame = encode_frame(0x40, &payload);

        let messages = parse_all(&frame);
        assert_eq!(messages.len(), 1);
        let msg = &messages[0];
        assert!(msg.verify(), "length {len} did not verify");
        assert_eq!(msg.page_number, 0x40);
        assert_eq!(msg.payload(), &payload[..]);
    }
}

#[test]
fn test_round_trip_end_of_image() {
    let messages = parse_all(&Message::end_of_image(0x30).encode());
    assert_eq!(messages.len(), 1);
    assert!(messages[0].is_end_of_image());
    assert!(messages[0].verify());
}

#[test]
fn test_known_frame_checksum() {
    assert_eq!(checksum(0x12, 0x02, &[0xAA, 0xBB]), 0x7CAA);
}

// =============================================================================
// Tamper detection
// =============================================================================

fn tamper_subject() -> Message {
    Message::new(0x20, &[0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17])
}

#[test]
fn test_page_number_bit_flip_is_rejected() {
    for bit in 0..8 {
        let mut msg = tamper_subject();
        msg.page_number ^= 1 << bit;
        assert!(!msg.verify(), "page bit {bit} went undetected");
    }
}

#[test]
fn test_payload_length_bit_flip_is_rejected() {
    for bit in 0..8 {
        let mut msg = tamper_subject();
        msg.payload_length ^= 1 << bit;
        assert!(!msg.verify(), "length bit {bit} went undetected");
    }
}

#[test]
fn test_payload_bit_flip_is_rejected() {
    for byte in 0..8 {
        for bit in 0..8 {
            let mut msg = tamper_subject();
            msg.data[byte] ^= 1 << bit;
            assert!(!msg.verify(), "payload byte {byte} bit {bit} went undetected");
        }
    }
}

#[test]
fn test_checksum_bit_flip_is_rejected() {
    for bit in 0..16 {
        let mut msg = tamper_subject();
        msg.checksum ^= 1 << bit;
        assert!(!msg.verify());
    }
}

// =============================================================================
// Framing
// =============================================================================

#[test]
fn test_overlong_length_is_framed_at_capacity() {
    let mut bytes = vec![PREAMBLE, 0x20, 0xFF];
    bytes.extend((0..PAGE_SIZE).map(|i| i as u8));
    bytes.extend([0x00, 0x00]);

    let messages = parse_all(&bytes);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].payload_length, 0xFF);
    assert_eq!(messages[0].payload().len(), PAGE_SIZE);
    assert!(!messages[0].verify());
}

#[test]
fn test_back_to_back_frames() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&encode_frame(0x20, &[1, 2, 3, 4]));
    bytes.extend_from_slice(&[0x00, 0x13]);
    bytes.extend_from_slice(&encode_frame(0x21, &[5, 6]));

    let messages = parse_all(&bytes);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].payload(), &[1, 2, 3, 4]);
    assert_eq!(messages[1].page_number, 0x21);
    assert!(messages.iter().all(Message::verify));
}
