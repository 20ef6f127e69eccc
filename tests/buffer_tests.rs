//! Transmit Buffer Tests
//!
//! Ready/consumed handoff between the producer and the engine side.
//! Run with: cargo test --target x86_64-unknown-linux-gnu --no-default-features --features std --test buffer_tests

use tracker_firmware::radio::buffer::{AprsPacket, Handoff, PacketView, TxBuffer};
use tracker_firmware::types::RadioError;

// =============================================================================
// Handoff Tests
// =============================================================================

#[test]
fn new_handoff_is_free() {
    let handoff = Handoff::new();
    assert!(handoff.is_free());
    assert!(!handoff.is_ready());
}

#[test]
fn fill_claim_release_cycle() {
    let mut buffer: TxBuffer<16> = TxBuffer::new();
    buffer.fill(b"hello").unwrap();
    assert!(buffer.handoff().is_ready());
    assert!(!buffer.handoff().is_free());

    assert_eq!(buffer.claim(), Some(&b"hello"[..]));
    assert!(!buffer.handoff().is_ready());
    assert!(!buffer.handoff().is_free());

    buffer.release();
    assert!(buffer.handoff().is_free());
}

#[test]
fn claim_takes_data_once() {
    let mut buffer: TxBuffer<16> = TxBuffer::new();
    assert_eq!(buffer.claim(), None);
    buffer.fill(b"x").unwrap();
    assert!(buffer.claim().is_some());
    assert_eq!(buffer.claim(), None);
}

#[test]
fn refill_waits_for_release() {
    let mut buffer: TxBuffer<16> = TxBuffer::new();
    buffer.fill(b"first").unwrap();
    let _ = buffer.claim();
    assert_eq!(buffer.fill(b"second"), Err(RadioError::BufferInUse));
    assert_eq!(buffer.as_slice(), b"first");

    buffer.release();
    buffer.fill(b"second").unwrap();
    assert_eq!(buffer.as_slice(), b"second");
}

// =============================================================================
// Capacity Tests
// =============================================================================

#[test]
fn overrun_copies_nothing() {
    let mut buffer: TxBuffer<4> = TxBuffer::new();
    assert_eq!(
        buffer.fill(b"too long"),
        Err(RadioError::BufferOverrun {
            requested: 8,
            capacity: 4,
        })
    );
    assert!(buffer.is_empty());
    assert!(buffer.handoff().is_free());
}

#[test]
fn exact_capacity_fits() {
    let mut buffer: TxBuffer<4> = TxBuffer::new();
    buffer.fill(b"four").unwrap();
    assert_eq!(buffer.len(), buffer.capacity());
}

// =============================================================================
// APRS Packet Tests
// =============================================================================

#[test]
fn packet_view_boundaries() {
    let bytes = [0x7E, 0x41, 0x42, 0x7E];
    let view = PacketView::new(&bytes, 1, 3).unwrap();
    assert!(!view.is_data(0));
    assert!(view.is_data(1));
    assert!(view.is_data(2));
    assert!(!view.is_data(3));
    assert_eq!(view.get(3), Some(0x7E));
    assert_eq!(view.get(4), None);
}

#[test]
fn packet_view_rejects_bad_boundaries() {
    let bytes = [0x7E; 4];
    assert_eq!(
        PacketView::new(&bytes, 1, 5),
        Err(RadioError::InvalidBoundaries {
            flag_start: 1,
            flag_end: 5,
            len: 4,
        })
    );
    assert!(PacketView::new(&bytes, 3, 2).is_err());
    assert!(PacketView::new(&bytes, 4, 4).is_ok());
}

#[test]
fn aprs_packet_handoff() {
    let mut packet: AprsPacket<8> = AprsPacket::new();
    packet.fill(&[0x7E, 0x41, 0x7E], 1, 2).unwrap();

    let view = packet.claim().unwrap();
    assert_eq!(view.len(), 3);
    assert_eq!(view.flag_start(), 1);
    assert_eq!(view.flag_end(), 2);
    assert!(!packet.handoff().is_free());

    assert_eq!(packet.fill(&[0x7E], 0, 1), Err(RadioError::BufferInUse));
    packet.release();
    packet.fill(&[0x7E], 0, 1).unwrap();
    assert_eq!(packet.view().len(), 1);
}

#[test]
fn aprs_packet_invalid_fill_keeps_buffer_free() {
    let mut packet: AprsPacket<8> = AprsPacket::new();
    assert!(packet.fill(&[0x7E, 0x7E], 2, 1).is_err());
    assert!(packet.handoff().is_free());
    assert!(packet.claim().is_none());
    assert_eq!(packet.capacity(), 8);
}
