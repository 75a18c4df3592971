//! Canonical error and result types for the crate.
//!
//! Each layer reports its own error enum. [`TransportError`] wraps all of them
//! so callers driving the whole stack can use a single `?`, and converts into
//! [`io::Error`] for the stream codec.

use std::io;

use thiserror::Error;

use crate::{
    fragment::{FragmentationError, ReassemblyError},
    message::MessageError,
    packet::{PacketError, PacketIndex},
    session::{EapError, MilenageError, SessionError},
};

/// End-of-stream conditions seen by the packet codec.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum EofError {
    /// The stream ended partway through a twenty-byte packet.
    #[error("premature EOF: {bytes_received} bytes of a packet received")]
    MidPacket { bytes_received: usize },
    /// The stream ended after some, but not all, packets of a payload.
    #[error("premature EOF: payload still expects packet {expected_index}")]
    MidPayload { expected_index: PacketIndex },
}

/// Top-level error of the pump transport.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("packet error: {0}")]
    Packet(#[from] PacketError),
    #[error("fragmentation error: {0}")]
    Fragmentation(#[from] FragmentationError),
    #[error("reassembly error: {0}")]
    Reassembly(#[from] ReassemblyError),
    #[error("message error: {0}")]
    Message(#[from] MessageError),
    #[error("key derivation error: {0}")]
    Milenage(#[from] MilenageError),
    #[error("EAP error: {0}")]
    Eap(#[from] EapError),
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error("EOF: {0}")]
    Eof(#[from] EofError),
}

impl TransportError {
    /// Returns true when the stream ended inside a packet or payload.
    #[must_use]
    pub const fn is_premature_eof(&self) -> bool { matches!(self, Self::Eof(_)) }
}

impl From<TransportError> for io::Error {
    fn from(err: TransportError) -> Self {
        let kind = if err.is_premature_eof() {
            io::ErrorKind::UnexpectedEof
        } else {
            io::ErrorKind::InvalidData
        };
        io::Error::new(kind, err)
    }
}

/// Result alias used across the transport stack.
pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use std::io;

    use rstest::rstest;

    use super::{EofError, TransportError};
    use crate::{fragment::ReassemblyError, message::MessageError, packet::PacketIndex};

    #[rstest]
    #[case::reassembly(
        TransportError::from(ReassemblyError::Incomplete { expected: PacketIndex::new(2) }),
        io::ErrorKind::InvalidData
    )]
    #[case::message(
        TransportError::from(MessageError::UnsupportedVersion(1)),
        io::ErrorKind::InvalidData
    )]
    #[case::eof(
        TransportError::from(EofError::MidPacket { bytes_received: 7 }),
        io::ErrorKind::UnexpectedEof
    )]
    fn maps_to_io_error_kind(#[case] err: TransportError, #[case] kind: io::ErrorKind) {
        let message = err.to_string();
        let io_err = io::Error::from(err);
        assert_eq!(io_err.kind(), kind);
        assert_eq!(io_err.to_string(), message);
    }

    #[test]
    fn io_error_keeps_source() {
        let io_err = io::Error::from(TransportError::from(EofError::MidPayload { expected_index: PacketIndex::new(3) }));
        let inner = io_err
            .get_ref()
            .and_then(|e| e.downcast_ref::<TransportError>())
            .expect("transport error source");
        assert_eq!(inner, &TransportError::Eof(EofError::MidPayload { expected_index: PacketIndex::new(3) }));
    }
}
