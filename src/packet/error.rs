//! Errors raised while decoding or encoding a single packet.

use thiserror::Error;

use super::{MAX_FRAGMENTS, PacketIndex, PacketKind};

/// Failure to map between 20 wire bytes and a [`PhysicalPacket`](super::PhysicalPacket).
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    /// The buffer length or a declared size does not fit the packet layout.
    #[error("wrong packet size for {kind} packet: {actual} bytes")]
    WrongPacketSize {
        /// Layout being decoded or encoded.
        kind: PacketKind,
        /// Offending length: buffer length, or the declared payload size.
        actual: usize,
    },
    /// The leading index byte is not the one the caller expected.
    #[error("unexpected packet index: expected {expected}, received {received}")]
    UnexpectedIndex {
        /// Index the caller was waiting for.
        expected: PacketIndex,
        /// Index read from the wire.
        received: PacketIndex,
    },
    /// The first packet announces more fragments than the link allows.
    #[error("too many fragments: {count} announced, at most {MAX_FRAGMENTS} allowed")]
    TooManyFragments {
        /// Fragment count read from the first packet.
        count: u8,
    },
}
