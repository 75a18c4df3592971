//! Property tests for splitting and joining payloads.
//!
//! Runs with a deterministic `ChaCha` RNG so failures reproduce across
//! machines.

use bytes::BytesMut;
use proptest::{
    collection::vec,
    prelude::*,
    test_runner::{Config as ProptestConfig, RngAlgorithm, TestRng, TestRunner},
};
use pumpwire::{
    Joiner,
    PacketCodec,
    Splitter,
    TransportConfig,
    packet::{MAX_FRAGMENTS, MAX_PAYLOAD_SIZE, PACKET_SIZE},
};
use pumpwire_testing::{decode_packets, encode_payloads};
use tokio_util::codec::Decoder;

fn deterministic_runner(cases: u32) -> TestRunner {
    let config = ProptestConfig {
        cases,
        ..ProptestConfig::default()
    };
    let rng = TestRng::deterministic_rng(RngAlgorithm::ChaCha);
    TestRunner::new_with_rng(config, rng)
}

fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        vec(any::<u8>(), 0..=18),
        vec(any::<u8>(), 19..=MAX_PAYLOAD_SIZE),
        Just(vec![0xa5; MAX_PAYLOAD_SIZE]),
    ]
}

/// Packets needed for `len` bytes: single mode up to 18 bytes, otherwise a
/// first packet, the middles, the last and possibly one extra.
fn expected_packets(len: usize) -> usize {
    if len <= 13 {
        1
    } else if len <= 18 {
        2
    } else {
        let middles = (len - 18) / 19;
        let rest = (len - 18) % 19;
        2 + middles + usize::from(rest > 14)
    }
}

#[test]
fn split_then_join_restores_payload() {
    let mut runner = deterministic_runner(256);
    runner
        .run(&payload_strategy(), |payload| {
            let batch = Splitter::default()
                .split(&payload)
                .map_err(|err| TestCaseError::fail(err.to_string()))?;
            prop_assert_eq!(batch.len(), expected_packets(payload.len()));
            prop_assert!(batch.len() <= usize::from(MAX_FRAGMENTS) + 2);

            let frames = batch.into_frames();
            let mut joiner =
                Joiner::new(&frames[0]).map_err(|err| TestCaseError::fail(err.to_string()))?;
            for frame in &frames[1..] {
                prop_assert!(!joiner.is_complete());
                joiner
                    .accumulate(frame)
                    .map_err(|err| TestCaseError::fail(err.to_string()))?;
            }
            prop_assert!(joiner.is_complete());
            let joined = joiner
                .finalize()
                .map_err(|err| TestCaseError::fail(err.to_string()))?;
            prop_assert_eq!(joined, payload);
            Ok(())
        })
        .expect("split/join property");
}

#[test]
fn codec_preserves_payload_sequences() {
    let mut runner = deterministic_runner(64);
    let config = TransportConfig::default();
    runner
        .run(&vec(payload_strategy(), 1..8), |payloads| {
            let slices: Vec<&[u8]> = payloads.iter().map(Vec::as_slice).collect();
            let stream = encode_payloads(&config, &slices)
                .map_err(|err| TestCaseError::fail(err.to_string()))?;
            prop_assert_eq!(stream.len() % PACKET_SIZE, 0);
            let decoded = decode_packets(&config, &stream)
                .map_err(|err| TestCaseError::fail(err.to_string()))?;
            let decoded: Vec<Vec<u8>> = decoded.into_iter().map(|b| b.to_vec()).collect();
            prop_assert_eq!(decoded, payloads);
            Ok(())
        })
        .expect("codec sequence property");
}

#[test]
fn arbitrary_packets_never_panic() {
    let mut runner = deterministic_runner(512);
    runner
        .run(&vec(any::<u8>(), 0..=10 * PACKET_SIZE), |bytes| {
            let mut codec = PacketCodec::default();
            let mut buf = BytesMut::from(bytes.as_slice());
            // Errors are expected; only completion matters.
            while let Ok(Some(_)) = codec.decode(&mut buf) {}
            Ok(())
        })
        .expect("decoder robustness property");
}
