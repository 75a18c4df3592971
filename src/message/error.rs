//! Errors raised while framing or unframing logical messages.

use thiserror::Error;

use super::SequenceNumber;

/// Failure to encode or decode a command frame, session frame, or keyed
/// payload.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    /// The buffer is shorter than the header or the declared payload.
    #[error("not enough data: need {needed} bytes, have {available}")]
    NotEnoughData { needed: usize, available: usize },
    /// The trailing CRC-16 of a command frame does not match its contents.
    #[error("command crc mismatch: declared {declared:#06x}, computed {computed:#06x}")]
    InvalidCrc { declared: u16, computed: u16 },
    /// The reserved bit 6 of a command control byte is set.
    #[error("reserved control bit set in {control:#04x}")]
    ReservedBitSet { control: u8 },
    /// A response carried an unexpected sequence number.
    #[error("invalid sequence number: expected {expected}, received {actual}")]
    InvalidSequence {
        expected: SequenceNumber,
        actual: SequenceNumber,
    },
    /// A session frame did not start with the `TW` marker.
    #[error("session frame magic mismatch: found {found:02x?}")]
    MagicMismatch { found: [u8; 2] },
    /// A session frame declared a protocol version other than zero.
    #[error("unsupported session frame version {0}")]
    UnsupportedVersion(u8),
    /// A session frame declared a message type this crate does not know.
    #[error("unknown session message type {0}")]
    UnknownMessageType(u8),
    /// A payload does not fit the length field that describes it.
    #[error("payload of {size} bytes exceeds the {limit} byte field limit")]
    PayloadTooLarge { size: usize, limit: usize },
    /// A keyed payload did not contain the expected key.
    #[error("expected key {expected:?} in keyed payload")]
    KeyMismatch { expected: &'static str },
}
