//! Pump command frames.
//!
//! ```text
//! address (u32 BE) | control | length low | payload | crc16 (BE)
//! ```
//!
//! The control byte packs the follow-on flag (bit 7), the four-bit sequence
//! number (bits 5..2) and the two high bits of the ten-bit payload length
//! (bits 1..0). Bit 6 is reserved and must be zero. The CRC-16 covers every
//! preceding byte.

use super::{CrcCheck, Frame, MessageError, SequenceNumber};
use crate::{
    byte_order::{read_network_u16_at, read_network_u32_at, write_network_u16, write_network_u32},
    crc::crc16,
};

const HEADER_LEN: usize = 6;
const CRC_LEN: usize = 2;
const MAX_BODY_LEN: usize = 0x3ff;
const FOLLOW_ON_BIT: u8 = 0b1000_0000;
const RESERVED_BIT: u8 = 0b0100_0000;

/// One addressed command or response exchanged with the pump.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandMessage {
    address: u32,
    sequence: SequenceNumber,
    expect_follow_on: bool,
    payload: Vec<u8>,
}

impl CommandMessage {
    /// Build a command for `address` carrying `payload`.
    #[must_use]
    pub fn new(address: u32, sequence: SequenceNumber, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            address,
            sequence,
            expect_follow_on: false,
            payload: payload.into(),
        }
    }

    /// Set whether the sender will transmit another frame immediately.
    #[must_use]
    pub fn with_follow_on(mut self, expect_follow_on: bool) -> Self {
        self.expect_follow_on = expect_follow_on;
        self
    }

    #[must_use]
    pub const fn address(&self) -> u32 { self.address }

    #[must_use]
    pub const fn sequence(&self) -> SequenceNumber { self.sequence }

    #[must_use]
    pub const fn expect_follow_on(&self) -> bool { self.expect_follow_on }

    #[must_use]
    pub fn payload(&self) -> &[u8] { self.payload.as_slice() }

    /// Consume the message, returning the payload blocks.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> { self.payload }

    /// Check that this frame carries the `expected` sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidSequence`] on mismatch.
    pub fn expect_sequence(&self, expected: SequenceNumber) -> Result<(), MessageError> {
        if self.sequence == expected {
            Ok(())
        } else {
            Err(MessageError::InvalidSequence {
                expected,
                actual: self.sequence,
            })
        }
    }

    /// Decode a frame, optionally skipping CRC verification.
    ///
    /// Pumps compute the CRC of their responses with a variant nobody has
    /// matched, so responses are usually decoded with [`CrcCheck::Skip`].
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::NotEnoughData`] when the buffer is shorter than
    /// ten bytes or than the declared length plus framing,
    /// [`MessageError::ReservedBitSet`] when bit 6 of the control byte is set,
    /// and [`MessageError::InvalidCrc`] when verification is enabled and fails.
    pub fn decode_with(bytes: &[u8], crc_check: CrcCheck) -> Result<Self, MessageError> {
        let available = bytes.len();
        if available < Self::MIN_LEN {
            return Err(MessageError::NotEnoughData {
                needed: Self::MIN_LEN,
                available,
            });
        }
        let address = read_network_u32_at(bytes, 0).ok_or(MessageError::NotEnoughData {
            needed: 4,
            available,
        })?;
        let control = bytes[4];
        if control & RESERVED_BIT != 0 {
            return Err(MessageError::ReservedBitSet { control });
        }
        let declared = (usize::from(control & 0b11) << 8) | usize::from(bytes[5]);
        if declared + HEADER_LEN + CRC_LEN > available {
            return Err(MessageError::NotEnoughData {
                needed: declared + HEADER_LEN + CRC_LEN,
                available,
            });
        }

        let (body, _) = bytes.split_at(available - CRC_LEN);
        if crc_check == CrcCheck::Verify {
            let declared_crc =
                read_network_u16_at(bytes, available - CRC_LEN).ok_or(MessageError::NotEnoughData {
                    needed: Self::MIN_LEN,
                    available,
                })?;
            let computed = crc16(body);
            if computed != declared_crc {
                return Err(MessageError::InvalidCrc {
                    declared: declared_crc,
                    computed,
                });
            }
        }

        Ok(Self {
            address,
            sequence: SequenceNumber::new(control >> 2),
            expect_follow_on: control & FOLLOW_ON_BIT != 0,
            payload: body[HEADER_LEN..].to_vec(),
        })
    }
}

impl Frame for CommandMessage {
    const MIN_LEN: usize = 10;

    fn encode(&self) -> Result<Vec<u8>, MessageError> {
        let len = self.payload.len();
        if len > MAX_BODY_LEN {
            return Err(MessageError::PayloadTooLarge {
                size: len,
                limit: MAX_BODY_LEN,
            });
        }
        let follow_on = if self.expect_follow_on { FOLLOW_ON_BIT } else { 0 };
        let [length_high, length_low] = write_network_u16(u16::try_from(len).map_err(|_| {
            MessageError::PayloadTooLarge {
                size: len,
                limit: MAX_BODY_LEN,
            }
        })?);
        let mut out = Vec::with_capacity(HEADER_LEN + len + CRC_LEN);
        out.extend_from_slice(&write_network_u32(self.address));
        out.push(follow_on | (self.sequence.get() << 2) | (length_high & 0b11));
        out.push(length_low);
        out.extend_from_slice(&self.payload);
        let crc = crc16(&out);
        out.extend_from_slice(&write_network_u16(crc));
        Ok(out)
    }

    fn decode(bytes: &[u8]) -> Result<Self, MessageError> { Self::decode_with(bytes, CrcCheck::Verify) }
}

#[cfg(test)]
mod tests {
    use pumpwire_testing::vectors::STATUS_REQUEST;
    use rstest::rstest;

    use super::CommandMessage;
    use crate::message::{CrcCheck, Frame, MessageError, SequenceNumber};

    #[test]
    fn decodes_captured_frame() {
        let message = CommandMessage::decode(&STATUS_REQUEST).expect("valid frame");
        assert_eq!(message.address(), 0x1f00_ee84);
        assert_eq!(message.sequence(), SequenceNumber::new(12));
        assert!(!message.expect_follow_on());
        assert_eq!(
            message.payload(),
            &[0x1d, 0x18, 0x00, 0x3f, 0x18, 0x00, 0x00, 0x42, 0x97, 0xff]
        );
        assert_eq!(message.encode().expect("re-encode"), STATUS_REQUEST);
    }

    #[test]
    fn encodes_short_command() {
        let message = CommandMessage::new(0x1f01_482a, SequenceNumber::new(4), vec![0x0e, 0x01, 0x00]);
        assert_eq!(
            message.encode().expect("encode"),
            vec![0x1f, 0x01, 0x48, 0x2a, 0x10, 0x03, 0x0e, 0x01, 0x00, 0x80, 0x2c]
        );
    }

    #[test]
    fn follow_on_and_long_payload_use_control_bits() {
        let message = CommandMessage::new(0xffff_ffff, SequenceNumber::new(15), vec![0xaa; 0x105])
            .with_follow_on(true);
        let encoded = message.encode().expect("encode");
        assert_eq!(encoded[4], 0b1011_1101);
        assert_eq!(encoded[5], 0x05);
        assert_eq!(CommandMessage::decode(&encoded).expect("decode"), message);
    }

    #[test]
    fn rejects_flipped_payload_bit() {
        let mut frame = STATUS_REQUEST;
        frame[8] ^= 0x01;
        assert_eq!(
            CommandMessage::decode(&frame),
            Err(MessageError::InvalidCrc {
                declared: 0x8128,
                computed: crate::crc::crc16(&frame[..16]),
            })
        );
        assert!(CommandMessage::decode_with(&frame, CrcCheck::Skip).is_ok());
    }

    #[rstest]
    #[case::checked(CrcCheck::Verify)]
    #[case::unchecked(CrcCheck::Skip)]
    fn rejects_reserved_control_bit(#[case] crc_check: CrcCheck) {
        let mut frame = STATUS_REQUEST;
        frame[4] |= 0b0100_0000;
        assert_eq!(
            CommandMessage::decode_with(&frame, crc_check),
            Err(MessageError::ReservedBitSet { control: 0x70 })
        );
    }

    #[rstest]
    #[case::empty(0)]
    #[case::nine_bytes(9)]
    fn short_frames_are_rejected(#[case] len: usize) {
        assert!(matches!(
            CommandMessage::decode(&STATUS_REQUEST[..len]),
            Err(MessageError::NotEnoughData { needed: 10, .. })
        ));
    }

    #[test]
    fn declared_length_must_fit() {
        let mut frame = STATUS_REQUEST;
        frame[5] = 0x0b;
        assert_eq!(
            CommandMessage::decode_with(&frame, CrcCheck::Skip),
            Err(MessageError::NotEnoughData {
                needed: 19,
                available: 18,
            })
        );
    }

    #[test]
    fn rejects_oversized_payload() {
        let message = CommandMessage::new(1, SequenceNumber::default(), vec![0; 0x400]);
        assert_eq!(
            message.encode(),
            Err(MessageError::PayloadTooLarge {
                size: 0x400,
                limit: 0x3ff,
            })
        );
    }

    #[test]
    fn sequence_mismatch_is_reported() {
        let message = CommandMessage::decode(&STATUS_REQUEST).expect("valid frame");
        assert!(message.expect_sequence(SequenceNumber::new(12)).is_ok());
        assert_eq!(
            message.expect_sequence(SequenceNumber::new(13)),
            Err(MessageError::InvalidSequence {
                expected: SequenceNumber::new(13),
                actual: SequenceNumber::new(12),
            })
        );
    }
}
