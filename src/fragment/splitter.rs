//! Outbound helper that splits a payload into 20-byte packets.
//!
//! [`Splitter`] chooses between single-fragment mode (one first packet and at
//! most one optional extra packet) and multi-fragment mode (first, middle, last
//! and optional extra packets). The CRC-32 of the whole payload is computed
//! once and placed in the first packet or the last packet respectively.

use std::num::NonZeroUsize;

use log::debug;

use super::FragmentationError;
use crate::{
    config::TransportConfig,
    crc::crc32,
    packet::{
        FIRST_CAPACITY,
        FIRST_SINGLE_CAPACITY,
        LAST_CAPACITY,
        MAX_FRAGMENTS,
        MIDDLE_CAPACITY,
        PACKET_SIZE,
        PacketError,
        PacketIndex,
        PacketKind,
        PhysicalPacket,
        SINGLE_FRAGMENT_LIMIT,
    },
};

/// Splits payloads into ordered packets.
///
/// The splitter holds no mutable state and can be shared freely.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Splitter {
    max_payload_size: NonZeroUsize,
}

impl Default for Splitter {
    fn default() -> Self { Self::from_config(&TransportConfig::default()) }
}

impl Splitter {
    /// Create a splitter honouring the payload limit of `config`.
    #[must_use]
    pub const fn from_config(config: &TransportConfig) -> Self {
        Self {
            max_payload_size: config.max_payload_size,
        }
    }

    /// Return the largest payload accepted by [`split`](Self::split).
    #[must_use]
    pub const fn max_payload_size(&self) -> NonZeroUsize { self.max_payload_size }

    /// Split `payload` into packets ready to be written.
    ///
    /// # Examples
    ///
    /// ```
    /// use pumpwire::fragment::Splitter;
    ///
    /// let batch = Splitter::default().split(&[0xab; 40]).expect("split payload");
    /// assert_eq!(batch.len(), 3);
    /// assert!(batch.is_fragmented());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`FragmentationError::PayloadTooLarge`] when `payload` exceeds
    /// the configured limit.
    pub fn split(&self, payload: &[u8]) -> Result<PacketBatch, FragmentationError> {
        let limit = self.max_payload_size.get();
        if payload.len() > limit {
            return Err(FragmentationError::PayloadTooLarge {
                size: payload.len(),
                limit,
            });
        }

        let crc32 = crc32(payload);
        let packets = if payload.len() <= SINGLE_FRAGMENT_LIMIT {
            single_fragment(payload, crc32)?
        } else {
            multi_fragment(payload, crc32)?
        };
        let frames = packets
            .iter()
            .map(PhysicalPacket::encode)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            "payload split: len={}, packets={}, crc32={crc32:#010x}",
            payload.len(),
            packets.len()
        );
        Ok(PacketBatch {
            crc32,
            packets,
            frames,
        })
    }
}

fn size_byte(kind: PacketKind, len: usize) -> Result<u8, PacketError> {
    u8::try_from(len).map_err(|_| PacketError::WrongPacketSize { kind, actual: len })
}

fn single_fragment(payload: &[u8], crc32: u32) -> Result<Vec<PhysicalPacket>, PacketError> {
    let (head, tail) = payload.split_at(payload.len().min(FIRST_SINGLE_CAPACITY));
    let mut packets = vec![PhysicalPacket::First {
        full_fragments: 0,
        payload: head.to_vec(),
        size: Some(size_byte(PacketKind::First, payload.len())?),
        crc32: Some(crc32),
        has_extra_packet: !tail.is_empty(),
    }];
    if !tail.is_empty() {
        packets.push(PhysicalPacket::LastOptionalPlusOne {
            index: PacketIndex::new(1),
            size: size_byte(PacketKind::LastOptionalPlusOne, tail.len())?,
            payload: tail.to_vec(),
        });
    }
    Ok(packets)
}

fn multi_fragment(payload: &[u8], crc32: u32) -> Result<Vec<PhysicalPacket>, PacketError> {
    let (head, rest) = payload.split_at(FIRST_CAPACITY);
    let middles = rest.len() / MIDDLE_CAPACITY;
    let full_fragments = u8::try_from(middles + 1)
        .ok()
        .filter(|count| *count <= MAX_FRAGMENTS)
        .ok_or(PacketError::TooManyFragments { count: u8::MAX })?;

    let mut packets = Vec::with_capacity(middles + 3);
    packets.push(PhysicalPacket::First {
        full_fragments,
        payload: head.to_vec(),
        size: None,
        crc32: None,
        has_extra_packet: false,
    });

    let mut chunks = rest.chunks_exact(MIDDLE_CAPACITY);
    let mut index = PacketIndex::zero();
    for chunk in chunks.by_ref() {
        index = next_index(index)?;
        packets.push(PhysicalPacket::Middle {
            index,
            payload: chunk.to_vec(),
        });
    }

    let remainder = chunks.remainder();
    let (last, extra) = remainder.split_at(remainder.len().min(LAST_CAPACITY));
    index = next_index(index)?;
    packets.push(PhysicalPacket::Last {
        index,
        size: size_byte(PacketKind::Last, remainder.len())?,
        payload: last.to_vec(),
        crc32,
        has_extra_packet: !extra.is_empty(),
    });
    if !extra.is_empty() {
        packets.push(PhysicalPacket::LastOptionalPlusOne {
            index: next_index(index)?,
            size: size_byte(PacketKind::LastOptionalPlusOne, extra.len())?,
            payload: extra.to_vec(),
        });
    }
    Ok(packets)
}

fn next_index(index: PacketIndex) -> Result<PacketIndex, PacketError> {
    index
        .checked_increment()
        .ok_or(PacketError::TooManyFragments { count: u8::MAX })
}

/// Packets produced for a single payload, in transmission order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacketBatch {
    crc32: u32,
    packets: Vec<PhysicalPacket>,
    frames: Vec<[u8; PACKET_SIZE]>,
}

impl PacketBatch {
    /// CRC-32 of the whole payload, as advertised on the wire.
    #[must_use]
    pub const fn crc32(&self) -> u32 { self.crc32 }

    /// Return the decoded view of each packet.
    #[must_use]
    pub fn packets(&self) -> &[PhysicalPacket] { self.packets.as_slice() }

    /// Return the encoded packets.
    #[must_use]
    pub fn frames(&self) -> &[[u8; PACKET_SIZE]] { self.frames.as_slice() }

    /// Number of packets in the batch.
    #[expect(
        clippy::len_without_is_empty,
        reason = "batches always hold a first packet"
    )]
    #[must_use]
    pub fn len(&self) -> usize { self.frames.len() }

    /// Whether the payload required more than one packet.
    #[must_use]
    pub fn is_fragmented(&self) -> bool { self.len() > 1 }

    /// Consume the batch, returning the encoded packets.
    #[must_use]
    pub fn into_frames(self) -> Vec<[u8; PACKET_SIZE]> { self.frames }
}

impl IntoIterator for PacketBatch {
    type Item = [u8; PACKET_SIZE];
    type IntoIter = std::vec::IntoIter<[u8; PACKET_SIZE]>;

    fn into_iter(self) -> Self::IntoIter { self.frames.into_iter() }
}
