//! Log output of the transport layers.
//!
//! `logtest` captures records process-wide, so every test here holds the
//! shared [`LoggerHandle`] and runs serially.

use log::Level;
use pumpwire::{
    Joiner,
    MessageType,
    SessionMessage,
    SessionNegotiator,
    SessionOutcome,
    SessionParams,
    Splitter,
    session::{EapAttribute, EapCode, EapMessage, Milenage},
};
use pumpwire_testing::{LoggerHandle, from_hex, logger, vectors::pod_session};
use rstest::rstest;
use serial_test::serial;

#[rstest]
#[serial]
fn splitter_logs_packet_count(mut logger: LoggerHandle) {
    logger.clear();
    Splitter::default().split(&[0x42; 60]).expect("split");
    let debug = logger.drain_level(Level::Debug);
    assert!(
        debug.iter().any(|m| m.starts_with("payload split: len=60, packets=4")),
        "missing split record: {debug:?}"
    );
}

#[rstest]
#[serial]
fn joiner_warns_on_skipped_packet(mut logger: LoggerHandle) {
    let frames = Splitter::default()
        .split(&[0x42; 60])
        .expect("split")
        .into_frames();
    logger.clear();
    let mut joiner = Joiner::new(&frames[0]).expect("first packet");
    assert!(joiner.accumulate(&frames[2]).is_err());
    let warnings = logger.drain_level(Level::Warn);
    assert_eq!(
        warnings,
        vec!["packet out of sequence: expected=1, received=2".to_owned()]
    );
}

#[rstest]
#[serial]
fn negotiation_logs_outcome_without_keys(mut logger: LoggerHandle) {
    let ltk = from_hex(pod_session::LTK);
    let milenage = Milenage::new(&ltk, &[0, 0, 0, 0, 0, 2])
        .and_then(|m| m.with_rand(&from_hex(pod_session::RAND)))
        .expect("valid inputs");
    let params = SessionParams {
        ltk: &ltk,
        eap_sqn: pod_session::EAP_SQN,
        controller_id: 0x1092,
        pod_id: 0x1093,
        msg_seq: 0,
    };
    let mut negotiator = SessionNegotiator::with_milenage(params, milenage).expect("negotiator");
    negotiator.challenge().expect("challenge");

    let mut res = [0u8; 8];
    res.copy_from_slice(&from_hex(pod_session::RES));
    let reply = EapMessage {
        code: EapCode::Response,
        identifier: 0,
        subtype: 1,
        attributes: vec![EapAttribute::Res(res), EapAttribute::CustomIv([9, 9, 9, 9])],
    };
    let reply = SessionMessage::new(
        MessageType::SessionEstablishment,
        0x1093,
        0x1092,
        1,
        reply.encode().expect("encode"),
    );

    logger.clear();
    let outcome = negotiator.process_response(&reply).expect("outcome");
    assert!(matches!(outcome, SessionOutcome::Established { .. }));

    let info = logger.drain_level(Level::Info);
    assert_eq!(info, vec!["session established: pod=0x00001093, seq=2".to_owned()]);
    assert!(!info.iter().any(|m| m.contains(pod_session::CK)));
}
