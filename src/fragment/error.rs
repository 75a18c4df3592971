//! Error and status types emitted by the splitter and the joiner.

use thiserror::Error;

use crate::packet::{PacketError, PacketIndex};

/// Result of feeding a packet into a [`Joiner`](crate::fragment::Joiner).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FragmentStatus {
    /// The payload still expects more packets.
    Incomplete,
    /// The packet completed the payload.
    Complete,
}

/// Errors produced while splitting an outbound payload.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum FragmentationError {
    /// The payload exceeds the configured size limit.
    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },
    /// A packet could not be encoded.
    #[error("failed to encode packet: {0}")]
    Packet(#[from] PacketError),
}

/// Errors produced while joining inbound packets.
///
/// Every error is terminal: the caller discards the joiner and waits for the
/// next first packet.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ReassemblyError {
    /// A packet was truncated or declared an impossible size.
    #[error("malformed packet: {0}")]
    Packet(#[from] PacketError),
    /// A packet arrived out of order or does not belong to the payload.
    #[error("incorrect packet: expected index {expected}, received {received}")]
    IncorrectPacket {
        expected: PacketIndex,
        received: PacketIndex,
    },
    /// Finalisation was attempted before the last packet arrived.
    #[error("payload incomplete: packet {expected} still missing")]
    Incomplete { expected: PacketIndex },
    /// The joined payload does not match its advertised checksum.
    #[error("payload crc mismatch: declared {declared:#010x}, computed {computed:#010x}")]
    InvalidCrc { declared: u32, computed: u32 },
}
