//! Inbound helper that stitches packets back into a complete payload.
//!
//! A [`Joiner`] is created from the first packet of a payload and then fed
//! each subsequent packet in order. It does not buffer or reorder: the first
//! packet out of sequence ends the assembly with an error. Once the last
//! expected packet arrives, [`Joiner::finalize`] verifies the CRC-32 and
//! yields the payload.

use log::{debug, warn};

use super::{FragmentStatus, ReassemblyError};
use crate::{
    crc::crc32,
    packet::{PacketError, PacketIndex, PacketKind, PhysicalPacket},
};

/// Minimum length of any packet after the first: index, size and one byte.
const MIN_PACKET_LEN: usize = 3;

/// Accumulates the packets of one payload.
#[derive(Debug)]
pub struct Joiner {
    full_fragments: u8,
    crc32: Option<u32>,
    extra_packet: bool,
    last_index: PacketIndex,
    complete: bool,
    packets: Vec<PhysicalPacket>,
}

impl Joiner {
    /// Start an assembly from the bytes of its first packet.
    ///
    /// # Examples
    ///
    /// ```
    /// use pumpwire::fragment::Joiner;
    ///
    /// let mut first = vec![0x00, 0x00];
    /// first.extend_from_slice(&pumpwire::crc::crc32(b"hi").to_be_bytes());
    /// first.extend_from_slice(&[0x02, b'h', b'i']);
    /// let joiner = Joiner::new(&first).expect("first packet");
    /// assert!(joiner.is_complete());
    /// assert_eq!(joiner.finalize().expect("valid payload"), b"hi");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError::IncorrectPacket`] when the leading byte is
    /// not zero and [`ReassemblyError::Packet`] when the packet is malformed.
    pub fn new(first: &[u8]) -> Result<Self, ReassemblyError> {
        let packet = PhysicalPacket::parse_first(first).map_err(|err| match err {
            PacketError::UnexpectedIndex { expected, received } => {
                ReassemblyError::IncorrectPacket { expected, received }
            }
            other => ReassemblyError::Packet(other),
        })?;
        let PhysicalPacket::First {
            full_fragments,
            crc32,
            has_extra_packet,
            ..
        } = packet
        else {
            return Err(ReassemblyError::Packet(PacketError::WrongPacketSize {
                kind: PacketKind::First,
                actual: first.len(),
            }));
        };
        debug!(
            "payload assembly started: full_fragments={full_fragments}, \
             extra_packet={has_extra_packet}"
        );
        Ok(Self {
            full_fragments,
            crc32,
            extra_packet: has_extra_packet,
            last_index: PacketIndex::zero(),
            complete: full_fragments == 0 && !has_extra_packet,
            packets: vec![packet],
        })
    }

    /// Whether every expected packet has been received.
    #[must_use]
    pub const fn is_complete(&self) -> bool { self.complete }

    /// Fragment count announced by the first packet.
    #[must_use]
    pub const fn full_fragments(&self) -> u8 { self.full_fragments }

    /// Index the joiner expects next.
    #[must_use]
    pub fn expected_index(&self) -> PacketIndex {
        PacketIndex::new(self.last_index.get().saturating_add(1))
    }

    /// Feed the next packet.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError::Packet`] when the packet is shorter than
    /// three bytes or malformed, and [`ReassemblyError::IncorrectPacket`] when
    /// its index is not the next one in sequence or names no packet of this
    /// payload (including anything sent after completion).
    pub fn accumulate(&mut self, bytes: &[u8]) -> Result<FragmentStatus, ReassemblyError> {
        let expected = self.expected_index();
        let kind = PacketKind::classify(expected, self.full_fragments, self.extra_packet);
        if bytes.len() < MIN_PACKET_LEN {
            return Err(ReassemblyError::Packet(PacketError::WrongPacketSize {
                kind: kind.unwrap_or(PacketKind::Middle),
                actual: bytes.len(),
            }));
        }
        let received = PacketIndex::new(bytes[0]);
        let kind = match kind {
            Some(kind) if received == expected && kind != PacketKind::First => kind,
            _ => {
                warn!("packet out of sequence: expected={expected}, received={received}");
                return Err(ReassemblyError::IncorrectPacket { expected, received });
            }
        };

        let packet = match kind {
            PacketKind::Middle => PhysicalPacket::parse_middle(bytes)?,
            PacketKind::Last => {
                let packet = PhysicalPacket::parse_last(bytes)?;
                self.crc32 = packet.crc32();
                self.extra_packet = packet.has_extra_packet();
                self.complete = !self.extra_packet;
                packet
            }
            PacketKind::LastOptionalPlusOne | PacketKind::First => {
                let packet = PhysicalPacket::parse_last_optional_plus_one(bytes)?;
                self.complete = true;
                packet
            }
        };
        self.last_index = received;
        self.packets.push(packet);

        Ok(if self.complete {
            FragmentStatus::Complete
        } else {
            FragmentStatus::Incomplete
        })
    }

    /// Consume the joiner, returning the verified payload.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError::Incomplete`] when packets are still missing
    /// and [`ReassemblyError::InvalidCrc`] when the joined payload does not
    /// match its advertised CRC-32.
    pub fn finalize(self) -> Result<Vec<u8>, ReassemblyError> {
        let expected = self.expected_index();
        let declared = match self.crc32 {
            Some(declared) if self.complete => declared,
            _ => return Err(ReassemblyError::Incomplete { expected }),
        };
        let payload: Vec<u8> = self
            .packets
            .into_iter()
            .flat_map(PhysicalPacket::into_payload)
            .collect();
        let computed = crc32(&payload);
        if computed != declared {
            warn!("payload crc mismatch: declared={declared:#010x}, computed={computed:#010x}");
            return Err(ReassemblyError::InvalidCrc { declared, computed });
        }
        Ok(payload)
    }
}
