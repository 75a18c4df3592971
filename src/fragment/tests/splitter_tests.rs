//! Tests for outbound packet layout and payload limits.

use rstest::rstest;

use crate::{
    config::TransportConfig,
    crc::crc32,
    fragment::{FragmentationError, Splitter},
    packet::{PACKET_SIZE, PacketIndex, PacketKind, PhysicalPacket},
};

const CAPTURED_PAYLOAD: [u8; 22] = [
    0x54, 0x57, 0x10, 0x23, 0x03, 0x00, 0x00, 0xc0, 0xff, 0xff, 0xff, 0xfe, 0x08, 0x20, 0x2e, 0xa8,
    0x50, 0x30, 0x3d, 0x00, 0x01, 0xa5,
];

fn payload_of(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| u8::try_from(i % 251).expect("value below 251"))
        .collect()
}

#[rstest]
#[case::empty(0, 1)]
#[case::one(1, 1)]
#[case::first_capacity(13, 1)]
#[case::spills_to_extra(14, 2)]
#[case::single_limit(18, 2)]
#[case::first_multi(19, 2)]
#[case::last_full(32, 2)]
#[case::last_spills(33, 3)]
#[case::last_and_extra_full(36, 3)]
#[case::empty_last(37, 3)]
#[case::middle_and_last_full(51, 3)]
#[case::middle_and_extra(52, 4)]
#[case::maximum(300, 17)]
fn packet_count_follows_payload_length(#[case] len: usize, #[case] packets: usize) {
    let batch = Splitter::default()
        .split(&payload_of(len))
        .expect("payload within limit");
    assert_eq!(batch.len(), packets, "payload of {len} bytes");
    assert_eq!(batch.is_fragmented(), packets > 1);
}

#[test]
fn splits_captured_payload_like_firmware() {
    let batch = Splitter::default()
        .split(&CAPTURED_PAYLOAD)
        .expect("split captured payload");
    let frames = batch.frames();
    assert_eq!(frames.len(), 2);
    assert_eq!(
        frames[0],
        [
            0x00, 0x01, 0x54, 0x57, 0x10, 0x23, 0x03, 0x00, 0x00, 0xc0, 0xff, 0xff, 0xff, 0xfe,
            0x08, 0x20, 0x2e, 0xa8, 0x50, 0x30,
        ]
    );
    assert_eq!(
        &frames[1][..10],
        &[0x01, 0x04, 0xbc, 0x20, 0x1f, 0xf6, 0x3d, 0x00, 0x01, 0xa5]
    );
    assert!(frames[1][10..].iter().all(|&b| b == 0));
    assert_eq!(batch.crc32(), 0xbc20_1ff6);
}

#[test]
fn single_fragment_places_crc_in_first_packet() {
    let payload = payload_of(16);
    let batch = Splitter::default().split(&payload).expect("split payload");
    let first = &batch.frames()[0];
    assert_eq!(&first[..2], &[0x00, 0x00]);
    assert_eq!(&first[2..6], &crc32(&payload).to_be_bytes());
    assert_eq!(first[6], 16);
    assert_eq!(&first[7..], &payload[..13]);

    let extra = &batch.packets()[1];
    assert_eq!(
        extra,
        &PhysicalPacket::LastOptionalPlusOne {
            index: PacketIndex::new(1),
            size: 3,
            payload: payload[13..].to_vec(),
        }
    );
}

#[test]
fn multi_fragment_indices_are_sequential() {
    let batch = Splitter::default()
        .split(&payload_of(300))
        .expect("split maximum payload");
    let packets = batch.packets();
    assert!(matches!(
        packets[0],
        PhysicalPacket::First {
            full_fragments: 15,
            ..
        }
    ));
    for (position, packet) in packets.iter().enumerate() {
        assert_eq!(usize::from(packet.index().get()), position);
    }
    assert_eq!(packets[15].kind(), PacketKind::Last);
    assert_eq!(packets[16].kind(), PacketKind::LastOptionalPlusOne);
    assert_eq!(packets[16].payload().len(), 2);
}

#[test]
fn every_frame_is_packet_sized() {
    let batch = Splitter::default()
        .split(&payload_of(123))
        .expect("split payload");
    assert!(batch.into_iter().all(|frame| frame.len() == PACKET_SIZE));
}

#[test]
fn rejects_payload_above_hard_limit() {
    let err = Splitter::default()
        .split(&payload_of(301))
        .expect_err("payload above limit");
    assert_eq!(
        err,
        FragmentationError::PayloadTooLarge {
            size: 301,
            limit: 300,
        }
    );
}

#[test]
fn honours_configured_limit() {
    let config = TransportConfig::with_payload_limit(20).expect("valid limit");
    let splitter = Splitter::from_config(&config);
    assert_eq!(splitter.max_payload_size().get(), 20);
    assert!(splitter.split(&payload_of(20)).is_ok());
    assert!(matches!(
        splitter.split(&payload_of(21)),
        Err(FragmentationError::PayloadTooLarge { size: 21, limit: 20 })
    ));
}
