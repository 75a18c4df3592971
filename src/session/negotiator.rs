//! EAP-AKA session negotiation between controller and pump.
//!
//! [`SessionNegotiator`] owns no transport. The caller sends the frame from
//! [`SessionNegotiator::challenge`], hands the pump's reply to
//! [`SessionNegotiator::process_response`] and, when a session is
//! established, sends the returned EAP Success frame.

use log::{debug, info, warn};
use rand::{RngCore, rngs::OsRng};
use thiserror::Error;

use super::{
    eap::{EapAttribute, EapCode, EapError, EapMessage, SUBTYPE_SYNCHRONIZATION_FAILURE},
    milenage::{KEY_LEN, Milenage, MilenageError, RESYNC_AMF, SessionMaterial},
};
use crate::{
    byte_order::{read_network_u16, read_network_u48, write_network_u48},
    message::{MessageError, MessageType, SessionMessage},
};

/// Length of each half of the nonce prefix.
pub const IV_LEN: usize = 4;

/// Errors raised while negotiating a session.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Milenage(#[from] MilenageError),
    #[error(transparent)]
    Eap(#[from] EapError),
    #[error(transparent)]
    Message(#[from] MessageError),
    #[error("expected a session establishment frame, got {0:?}")]
    UnexpectedMessageType(MessageType),
    #[error("EAP identifier mismatch: expected {expected}, received {received}")]
    IdentifierMismatch { expected: u8, received: u8 },
    #[error("MAC-S mismatch during resynchronisation")]
    MacSMismatch,
    #[error("pump rejected the challenge with client error {0:#06x}")]
    ClientError(u16),
    #[error("expected two EAP-AKA attributes, got {0}")]
    UnexpectedAttributeCount(usize),
    #[error("unexpected EAP-AKA attribute {0:#04x} in challenge response")]
    UnexpectedAttribute(u8),
    #[error("RES mismatch")]
    ResMismatch,
    #[error("challenge response carried no node IV")]
    MissingNodeIv,
}

/// Inputs to a negotiation.
#[derive(Clone, Copy)]
pub struct SessionParams<'a> {
    /// Long-term key established during pairing.
    pub ltk: &'a [u8],
    /// EAP sequence number; only the low 48 bits are used.
    pub eap_sqn: u64,
    pub controller_id: u32,
    pub pod_id: u32,
    /// Last message sequence number used with this pump.
    pub msg_seq: u8,
}

/// Keys of an established session.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKeys {
    pub ck: [u8; KEY_LEN],
    /// Controller IV followed by node IV.
    pub nonce_prefix: [u8; 2 * IV_LEN],
    pub msg_seq: u8,
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("ck", &"<redacted>")
            .field("nonce_prefix", &self.nonce_prefix)
            .field("msg_seq", &self.msg_seq)
            .finish()
    }
}

/// Result of processing the pump's challenge response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The pump answered correctly. `success` must be sent to it.
    Established {
        keys: SessionKeys,
        success: SessionMessage,
    },
    /// The pump rejected the sequence number; retry with `synchronized_sqn`.
    Resynchronize { synchronized_sqn: u64, msg_seq: u8 },
}

/// Controller side of EAP-AKA session establishment.
#[derive(Debug)]
pub struct SessionNegotiator {
    milenage: Milenage,
    material: SessionMaterial,
    controller_id: u32,
    pod_id: u32,
    msg_seq: u8,
    identifier: u8,
    controller_iv: [u8; IV_LEN],
}

impl SessionNegotiator {
    /// Prepare a negotiation with a fresh challenge and controller IV.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Milenage`] when the LTK is not 16 bytes or no
    /// randomness is available.
    pub fn new(params: SessionParams<'_>) -> Result<Self, SessionError> {
        let milenage = Milenage::new(params.ltk, &write_network_u48(params.eap_sqn))?;
        Self::with_milenage(params, milenage)
    }

    /// Prepare a negotiation around an existing derivation.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Milenage`] when no randomness is available.
    pub fn with_milenage(params: SessionParams<'_>, milenage: Milenage) -> Result<Self, SessionError> {
        let mut controller_iv = [0u8; IV_LEN];
        OsRng
            .try_fill_bytes(&mut controller_iv)
            .map_err(|_| MilenageError::RandomUnavailable)?;
        Ok(Self {
            material: milenage.derive(),
            milenage,
            controller_id: params.controller_id,
            pod_id: params.pod_id,
            msg_seq: params.msg_seq,
            identifier: 0,
            controller_iv,
        })
    }

    /// Replace the controller IV.
    #[must_use]
    pub const fn with_controller_iv(mut self, controller_iv: [u8; IV_LEN]) -> Self {
        self.controller_iv = controller_iv;
        self
    }

    #[must_use]
    pub const fn controller_iv(&self) -> [u8; IV_LEN] { self.controller_iv }

    #[must_use]
    pub const fn msg_seq(&self) -> u8 { self.msg_seq }

    /// Build the EAP-AKA challenge, advancing the message sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Eap`] if the challenge cannot be encoded.
    pub fn challenge(&mut self) -> Result<SessionMessage, SessionError> {
        self.msg_seq = self.msg_seq.wrapping_add(1);
        let request = EapMessage::challenge(
            self.identifier,
            vec![
                EapAttribute::Autn(self.material.autn()),
                EapAttribute::Rand(self.milenage.rand()),
                EapAttribute::CustomIv(self.controller_iv),
            ],
        );
        debug!(
            "session challenge: seq={}, identifier={}, pod={:#010x}",
            self.msg_seq, self.identifier, self.pod_id
        );
        self.establishment_frame(&request)
    }

    /// Verify the pump's answer to [`Self::challenge`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the response is malformed, comes from
    /// another exchange, or fails authentication.
    pub fn process_response(
        &mut self,
        response: &SessionMessage,
    ) -> Result<SessionOutcome, SessionError> {
        if response.message_type != MessageType::SessionEstablishment {
            return Err(SessionError::UnexpectedMessageType(response.message_type));
        }
        let message = EapMessage::parse(&response.payload)?;
        if message.identifier != self.identifier {
            warn!(
                "EAP identifier mismatch: expected={}, received={}",
                self.identifier, message.identifier
            );
            return Err(SessionError::IdentifierMismatch {
                expected: self.identifier,
                received: message.identifier,
            });
        }

        if let Some(auts) = resynchronization_request(&message) {
            return self.resynchronize(auts);
        }

        let node_iv = self.verify_challenge_response(&message.attributes)?;
        self.msg_seq = self.msg_seq.wrapping_add(1);
        let success = self.establishment_frame(&EapMessage::bare(EapCode::Success, self.identifier))?;
        let mut nonce_prefix = [0u8; 2 * IV_LEN];
        nonce_prefix[..IV_LEN].copy_from_slice(&self.controller_iv);
        nonce_prefix[IV_LEN..].copy_from_slice(&node_iv);
        info!("session established: pod={:#010x}, seq={}", self.pod_id, self.msg_seq);
        Ok(SessionOutcome::Established {
            keys: SessionKeys {
                ck: self.material.ck(),
                nonce_prefix,
                msg_seq: self.msg_seq,
            },
            success,
        })
    }

    fn resynchronize(&self, auts: &[u8; 14]) -> Result<SessionOutcome, SessionError> {
        let recovered = self.milenage.clone().with_auts(auts)?.derive();
        let verified = self
            .milenage
            .clone()
            .with_sqn(recovered.synchronized_sqn())
            .with_amf(&RESYNC_AMF)?
            .with_auts(auts)?
            .derive();
        if verified.mac_s() != verified.received_mac_s() {
            warn!("resynchronisation rejected: MAC-S mismatch");
            return Err(SessionError::MacSMismatch);
        }
        let synchronized_sqn = read_network_u48(recovered.synchronized_sqn());
        info!("session resynchronisation requested: sqn={synchronized_sqn}");
        Ok(SessionOutcome::Resynchronize {
            synchronized_sqn,
            msg_seq: self.msg_seq,
        })
    }

    fn verify_challenge_response(
        &self,
        attributes: &[EapAttribute],
    ) -> Result<[u8; IV_LEN], SessionError> {
        if attributes.len() != 2 {
            if let [EapAttribute::ClientErrorCode(code)] = attributes {
                let code = read_network_u16(*code);
                warn!("pump returned EAP client error: code={code:#06x}");
                return Err(SessionError::ClientError(code));
            }
            return Err(SessionError::UnexpectedAttributeCount(attributes.len()));
        }
        let mut node_iv = None;
        for attribute in attributes {
            match attribute {
                EapAttribute::Res(res) => {
                    if *res != self.material.res() {
                        warn!("challenge response rejected: RES mismatch");
                        return Err(SessionError::ResMismatch);
                    }
                }
                EapAttribute::CustomIv(iv) => node_iv = Some(*iv),
                other => return Err(SessionError::UnexpectedAttribute(other.kind())),
            }
        }
        node_iv.ok_or(SessionError::MissingNodeIv)
    }

    fn establishment_frame(&self, message: &EapMessage) -> Result<SessionMessage, SessionError> {
        Ok(SessionMessage::new(
            MessageType::SessionEstablishment,
            self.controller_id,
            self.pod_id,
            self.msg_seq,
            message.encode()?,
        ))
    }
}

fn resynchronization_request(message: &EapMessage) -> Option<&[u8; 14]> {
    match message.attributes.as_slice() {
        [EapAttribute::Auts(auts)] if message.subtype == SUBTYPE_SYNCHRONIZATION_FAILURE => {
            Some(auts)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::{SessionError, SessionNegotiator, SessionOutcome, SessionParams};
    use crate::{
        message::{MessageType, SessionMessage},
        session::{
            eap::{
                EapAttribute,
                EapCode,
                EapMessage,
                SUBTYPE_CHALLENGE,
                SUBTYPE_SYNCHRONIZATION_FAILURE,
            },
            milenage::Milenage,
        },
    };

    const LTK: [u8; 16] = [
        0xc0, 0x77, 0x28, 0x99, 0x72, 0x09, 0x72, 0xa3, 0x14, 0xf5, 0x57, 0xde, 0x66, 0xd5, 0x71,
        0xdd,
    ];
    const RAND: [u8; 16] = [
        0xc2, 0xcd, 0x12, 0x48, 0x45, 0x11, 0x03, 0xbd, 0x77, 0xa6, 0xc7, 0xef, 0x88, 0xc4, 0x41,
        0xba,
    ];
    const RES: [u8; 8] = [0xa4, 0x0b, 0xc6, 0xd1, 0x38, 0x61, 0x44, 0x7e];
    const CK: [u8; 16] = [
        0x55, 0x79, 0x9f, 0xd2, 0x66, 0x64, 0xcb, 0xf6, 0xe4, 0x76, 0x52, 0x5e, 0x2d, 0xee, 0x52,
        0xc6,
    ];
    const AUTS: [u8; 14] = [
        0x8d, 0x83, 0xc9, 0xc9, 0xfa, 0xa9, 0x53, 0x12, 0xe3, 0x28, 0x1a, 0xb1, 0x28, 0xd6,
    ];
    const CONTROLLER_ID: u32 = 0x0000_1092;
    const POD_ID: u32 = 0x0000_1093;

    fn params() -> SessionParams<'static> {
        SessionParams {
            ltk: &LTK,
            eap_sqn: 2,
            controller_id: CONTROLLER_ID,
            pod_id: POD_ID,
            msg_seq: 1,
        }
    }

    #[fixture]
    fn negotiator() -> SessionNegotiator {
        let milenage = Milenage::new(&LTK, &[0, 0, 0, 0, 0, 2])
            .and_then(|m| m.with_rand(&RAND))
            .expect("valid inputs");
        SessionNegotiator::with_milenage(params(), milenage)
            .expect("negotiator")
            .with_controller_iv([0x01, 0x02, 0x03, 0x04])
    }

    fn pod_reply(subtype: u8, identifier: u8, attributes: Vec<EapAttribute>) -> SessionMessage {
        let message = EapMessage {
            code: EapCode::Response,
            identifier,
            subtype,
            attributes,
        };
        SessionMessage::new(
            MessageType::SessionEstablishment,
            POD_ID,
            CONTROLLER_ID,
            2,
            message.encode().expect("encode reply"),
        )
    }

    #[rstest]
    fn challenge_carries_autn_rand_and_iv(mut negotiator: SessionNegotiator) {
        let frame = negotiator.challenge().expect("challenge");
        assert_eq!(frame.message_type, MessageType::SessionEstablishment);
        assert_eq!((frame.source, frame.destination), (CONTROLLER_ID, POD_ID));
        assert_eq!(frame.sequence_number, 2);

        let request = EapMessage::parse(&frame.payload).expect("parse");
        assert_eq!(request.code, EapCode::Request);
        assert_eq!(request.identifier, 0);
        assert_eq!(request.subtype, SUBTYPE_CHALLENGE);
        assert_eq!(
            request.attributes,
            vec![
                EapAttribute::Autn([
                    0x00, 0xc5, 0x5c, 0x78, 0xe8, 0xd3, 0xb9, 0xb9, 0xe9, 0x35, 0x86, 0x0a, 0x72,
                    0x59, 0xf6, 0xc0,
                ]),
                EapAttribute::Rand(RAND),
                EapAttribute::CustomIv([0x01, 0x02, 0x03, 0x04]),
            ]
        );
    }

    #[rstest]
    fn valid_response_establishes_session(mut negotiator: SessionNegotiator) {
        negotiator.challenge().expect("challenge");
        let reply = pod_reply(
            SUBTYPE_CHALLENGE,
            0,
            vec![EapAttribute::Res(RES), EapAttribute::CustomIv([0xa1, 0xa2, 0xa3, 0xa4])],
        );
        let outcome = negotiator.process_response(&reply).expect("outcome");
        let SessionOutcome::Established { keys, success } = outcome else {
            panic!("expected an established session");
        };
        assert_eq!(keys.ck, CK);
        assert_eq!(keys.nonce_prefix, [0x01, 0x02, 0x03, 0x04, 0xa1, 0xa2, 0xa3, 0xa4]);
        assert_eq!(keys.msg_seq, 3);
        assert_eq!(success.sequence_number, 3);
        assert_eq!(success.payload, vec![0x03, 0x00, 0x00, 0x04]);
        assert!(!format!("{keys:?}").contains("85, 121"));
    }

    #[rstest]
    fn wrong_res_is_rejected(mut negotiator: SessionNegotiator) {
        negotiator.challenge().expect("challenge");
        let reply = pod_reply(
            SUBTYPE_CHALLENGE,
            0,
            vec![EapAttribute::Res([0; 8]), EapAttribute::CustomIv([0; 4])],
        );
        assert_eq!(negotiator.process_response(&reply), Err(SessionError::ResMismatch));
    }

    #[rstest]
    fn synchronization_failure_yields_new_sqn(mut negotiator: SessionNegotiator) {
        negotiator.challenge().expect("challenge");
        let reply = pod_reply(SUBTYPE_SYNCHRONIZATION_FAILURE, 0, vec![EapAttribute::Auts(AUTS)]);
        assert_eq!(
            negotiator.process_response(&reply),
            Ok(SessionOutcome::Resynchronize {
                synchronized_sqn: 7,
                msg_seq: 2,
            })
        );
    }

    #[rstest]
    fn forged_auts_is_rejected(mut negotiator: SessionNegotiator) {
        negotiator.challenge().expect("challenge");
        let mut auts = AUTS;
        auts[13] ^= 0x01;
        let reply = pod_reply(SUBTYPE_SYNCHRONIZATION_FAILURE, 0, vec![EapAttribute::Auts(auts)]);
        assert_eq!(negotiator.process_response(&reply), Err(SessionError::MacSMismatch));
    }

    #[rstest]
    #[case::identifier(
        pod_reply(SUBTYPE_CHALLENGE, 5, vec![EapAttribute::Res(RES), EapAttribute::CustomIv([0; 4])]),
        SessionError::IdentifierMismatch { expected: 0, received: 5 }
    )]
    #[case::client_error(
        pod_reply(SUBTYPE_CHALLENGE, 0, vec![EapAttribute::ClientErrorCode([0x00, 0x01])]),
        SessionError::ClientError(1)
    )]
    #[case::attribute_count(
        pod_reply(SUBTYPE_CHALLENGE, 0, vec![EapAttribute::Res(RES)]),
        SessionError::UnexpectedAttributeCount(1)
    )]
    #[case::unexpected_attribute(
        pod_reply(SUBTYPE_CHALLENGE, 0, vec![EapAttribute::Res(RES), EapAttribute::Rand(RAND)]),
        SessionError::UnexpectedAttribute(0x01)
    )]
    #[case::missing_iv(
        pod_reply(SUBTYPE_CHALLENGE, 0, vec![EapAttribute::Res(RES), EapAttribute::Res(RES)]),
        SessionError::MissingNodeIv
    )]
    #[case::auts_outside_resync(
        pod_reply(SUBTYPE_CHALLENGE, 0, vec![EapAttribute::Auts(AUTS)]),
        SessionError::UnexpectedAttributeCount(1)
    )]
    fn rejects_bad_responses(
        mut negotiator: SessionNegotiator,
        #[case] reply: SessionMessage,
        #[case] expected: SessionError,
    ) {
        negotiator.challenge().expect("challenge");
        assert_eq!(negotiator.process_response(&reply), Err(expected));
    }

    #[rstest]
    fn wrong_frame_type_is_rejected(mut negotiator: SessionNegotiator) {
        let reply = SessionMessage::new(MessageType::Clear, POD_ID, CONTROLLER_ID, 2, vec![0; 4]);
        assert_eq!(
            negotiator.process_response(&reply),
            Err(SessionError::UnexpectedMessageType(MessageType::Clear))
        );
    }

    #[test]
    fn short_ltk_is_rejected() {
        let mut params = params();
        params.ltk = &LTK[..8];
        assert!(matches!(
            SessionNegotiator::new(params),
            Err(SessionError::Milenage(_))
        ));
    }
}
