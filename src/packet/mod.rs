//! Codec for the 20-byte packets written to and notified by the pump.
//!
//! A payload travels as an ordered run of packets. The first packet announces
//! how many fragments follow; the last one carries the CRC-32 of the whole
//! payload. Short payloads skip the middle and last packets entirely and put
//! the checksum in the first packet instead.
//!
//! | Variant | Byte 0 | Byte 1 | Bytes 2.. |
//! |---|---|---|---|
//! | first (multi) | `0x00` | fragment count | 18 payload bytes |
//! | first (single) | `0x00` | `0x00` | CRC-32, size, up to 13 payload bytes |
//! | middle | index | 19 payload bytes | |
//! | last | index | size | CRC-32, up to 14 payload bytes |
//! | optional extra | index | size | up to 18 payload bytes |
//!
//! Unused trailing bytes are zero on encode and ignored on decode.

pub mod error;
pub mod index;

use derive_more::Display;
pub use error::PacketError;
pub use index::PacketIndex;

use crate::byte_order::{read_network_u32_at, write_network_u32};

/// Size of every packet on the wire.
pub const PACKET_SIZE: usize = 20;
/// Largest fragment count a first packet may announce.
pub const MAX_FRAGMENTS: u8 = 15;
/// Largest payload that can be fragmented within [`MAX_FRAGMENTS`].
pub const MAX_PAYLOAD_SIZE: usize = 300;

const FIRST_HEADER: usize = 2;
const FIRST_SINGLE_HEADER: usize = 7;
const MIDDLE_HEADER: usize = 1;
const LAST_HEADER: usize = 6;
const EXTRA_HEADER: usize = 2;
const CRC_OFFSET: usize = 2;

/// Payload bytes carried by a first packet that is followed by middle packets.
pub const FIRST_CAPACITY: usize = PACKET_SIZE - FIRST_HEADER;
/// Payload bytes carried by a first packet in single-fragment mode.
pub const FIRST_SINGLE_CAPACITY: usize = PACKET_SIZE - FIRST_SINGLE_HEADER;
/// Payload bytes carried by a middle packet.
pub const MIDDLE_CAPACITY: usize = PACKET_SIZE - MIDDLE_HEADER;
/// Payload bytes carried by a last packet.
pub const LAST_CAPACITY: usize = PACKET_SIZE - LAST_HEADER;
/// Payload bytes carried by the optional extra packet.
pub const EXTRA_CAPACITY: usize = PACKET_SIZE - EXTRA_HEADER;
/// Payloads up to this size use single-fragment mode (one first packet plus
/// at most one optional extra packet).
pub const SINGLE_FRAGMENT_LIMIT: usize = 18;
/// Largest size a last packet may declare; the remainder after the middle
/// packets never exceeds it.
const MAX_TRAILING_SIZE: usize = 18;

/// Layout of a packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum PacketKind {
    #[display("first")]
    First,
    #[display("middle")]
    Middle,
    #[display("last")]
    Last,
    #[display("optional extra")]
    LastOptionalPlusOne,
}

impl PacketKind {
    /// Determine which layout `index` must use inside an assembly announcing
    /// `full_fragments`, given whether an optional extra packet is pending.
    ///
    /// Returns `None` when no packet with that index belongs to the assembly.
    ///
    /// # Examples
    ///
    /// ```
    /// use pumpwire::packet::{PacketIndex, PacketKind};
    ///
    /// assert_eq!(PacketKind::classify(PacketIndex::new(1), 2, false), Some(PacketKind::Middle));
    /// assert_eq!(PacketKind::classify(PacketIndex::new(2), 2, false), Some(PacketKind::Last));
    /// assert_eq!(PacketKind::classify(PacketIndex::new(3), 2, false), None);
    /// ```
    #[must_use]
    pub fn classify(index: PacketIndex, full_fragments: u8, extra_packet: bool) -> Option<Self> {
        let index = index.get();
        if index == 0 {
            Some(Self::First)
        } else if index < full_fragments {
            Some(Self::Middle)
        } else if index == full_fragments {
            Some(Self::Last)
        } else if extra_packet && Some(index) == full_fragments.checked_add(1) {
            Some(Self::LastOptionalPlusOne)
        } else {
            None
        }
    }
}

/// Context needed to decode a packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketPosition {
    /// The packet opens a new payload.
    First,
    /// The packet continues an assembly already in progress.
    Next {
        /// Index the assembly is waiting for.
        expected: PacketIndex,
        /// Fragment count announced by the first packet.
        full_fragments: u8,
        /// Whether the optional extra packet has been announced.
        extra_packet: bool,
    },
}

/// One packet of a fragmented payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhysicalPacket {
    /// Opens a payload. `size` and `crc32` are present only in
    /// single-fragment mode (`full_fragments == 0`).
    First {
        full_fragments: u8,
        payload: Vec<u8>,
        size: Option<u8>,
        crc32: Option<u32>,
        has_extra_packet: bool,
    },
    /// Carries exactly [`MIDDLE_CAPACITY`] payload bytes.
    Middle { index: PacketIndex, payload: Vec<u8> },
    /// Closes a multi-fragment payload. `size` counts the bytes still to come,
    /// including any that spill into the optional extra packet.
    Last {
        index: PacketIndex,
        size: u8,
        payload: Vec<u8>,
        crc32: u32,
        has_extra_packet: bool,
    },
    /// Carries the bytes that did not fit the preceding first or last packet.
    LastOptionalPlusOne {
        index: PacketIndex,
        size: u8,
        payload: Vec<u8>,
    },
}

impl PhysicalPacket {
    /// Return the packet layout.
    #[must_use]
    pub const fn kind(&self) -> PacketKind {
        match self {
            Self::First { .. } => PacketKind::First,
            Self::Middle { .. } => PacketKind::Middle,
            Self::Last { .. } => PacketKind::Last,
            Self::LastOptionalPlusOne { .. } => PacketKind::LastOptionalPlusOne,
        }
    }

    /// Return the leading index byte.
    #[must_use]
    pub const fn index(&self) -> PacketIndex {
        match self {
            Self::First { .. } => PacketIndex::zero(),
            Self::Middle { index, .. }
            | Self::Last { index, .. }
            | Self::LastOptionalPlusOne { index, .. } => *index,
        }
    }

    /// Return the payload bytes carried by this packet.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        match self {
            Self::First { payload, .. }
            | Self::Middle { payload, .. }
            | Self::Last { payload, .. }
            | Self::LastOptionalPlusOne { payload, .. } => payload,
        }
    }

    /// Consume the packet, returning its payload bytes.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        match self {
            Self::First { payload, .. }
            | Self::Middle { payload, .. }
            | Self::Last { payload, .. }
            | Self::LastOptionalPlusOne { payload, .. } => payload,
        }
    }

    /// Return the CRC-32 this packet advertises for the whole payload, if any.
    #[must_use]
    pub const fn crc32(&self) -> Option<u32> {
        match self {
            Self::First { crc32, .. } => *crc32,
            Self::Last { crc32, .. } => Some(*crc32),
            Self::Middle { .. } | Self::LastOptionalPlusOne { .. } => None,
        }
    }

    /// Whether this packet announces a trailing optional extra packet.
    #[must_use]
    pub const fn has_extra_packet(&self) -> bool {
        match self {
            Self::First {
                has_extra_packet, ..
            }
            | Self::Last {
                has_extra_packet, ..
            } => *has_extra_packet,
            Self::Middle { .. } | Self::LastOptionalPlusOne { .. } => false,
        }
    }

    /// Encode the packet into its zero-padded wire form.
    ///
    /// A single-fragment first packet without `size` encodes its payload
    /// length; a missing `crc32` encodes as zero.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::WrongPacketSize`] when the payload exceeds the
    /// variant's capacity (or, for middle packets, is not exactly
    /// [`MIDDLE_CAPACITY`] bytes long), and [`PacketError::TooManyFragments`]
    /// when a first packet announces more than [`MAX_FRAGMENTS`].
    pub fn encode(&self) -> Result<[u8; PACKET_SIZE], PacketError> {
        let kind = self.kind();
        let payload = self.payload();
        let wrong_size = PacketError::WrongPacketSize {
            kind,
            actual: payload.len(),
        };
        let mut out = [0u8; PACKET_SIZE];
        let header = match self {
            Self::First {
                full_fragments: 0,
                size,
                crc32,
                ..
            } => {
                let size = match size {
                    Some(size) => *size,
                    None => u8::try_from(payload.len()).map_err(|_| wrong_size)?,
                };
                out[CRC_OFFSET..CRC_OFFSET + 4]
                    .copy_from_slice(&write_network_u32(crc32.unwrap_or_default()));
                out[6] = size;
                FIRST_SINGLE_HEADER
            }
            Self::First { full_fragments, .. } => {
                if *full_fragments > MAX_FRAGMENTS {
                    return Err(PacketError::TooManyFragments {
                        count: *full_fragments,
                    });
                }
                out[1] = *full_fragments;
                FIRST_HEADER
            }
            Self::Middle { index, .. } => {
                if payload.len() != MIDDLE_CAPACITY {
                    return Err(wrong_size);
                }
                out[0] = index.get();
                MIDDLE_HEADER
            }
            Self::Last {
                index, size, crc32, ..
            } => {
                out[0] = index.get();
                out[1] = *size;
                out[CRC_OFFSET..CRC_OFFSET + 4].copy_from_slice(&write_network_u32(*crc32));
                LAST_HEADER
            }
            Self::LastOptionalPlusOne { index, size, .. } => {
                out[0] = index.get();
                out[1] = *size;
                EXTRA_HEADER
            }
        };
        let body = out
            .get_mut(header..header + payload.len())
            .ok_or(wrong_size)?;
        body.copy_from_slice(payload);
        Ok(out)
    }

    /// Decode `bytes` as the packet expected at `position`.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::UnexpectedIndex`] when the leading byte does not
    /// match the expected index (or names no packet of the assembly), and
    /// otherwise the errors of the variant-specific parser.
    pub fn parse(bytes: &[u8], position: PacketPosition) -> Result<Self, PacketError> {
        let PacketPosition::Next {
            expected,
            full_fragments,
            extra_packet,
        } = position
        else {
            return Self::parse_first(bytes);
        };
        let kind = PacketKind::classify(expected, full_fragments, extra_packet);
        let Some(&lead) = bytes.first() else {
            return Err(PacketError::WrongPacketSize {
                kind: kind.unwrap_or(PacketKind::Middle),
                actual: 0,
            });
        };
        let received = PacketIndex::new(lead);
        match kind {
            Some(kind) if received == expected => match kind {
                PacketKind::First => Self::parse_first(bytes),
                PacketKind::Middle => Self::parse_middle(bytes),
                PacketKind::Last => Self::parse_last(bytes),
                PacketKind::LastOptionalPlusOne => Self::parse_last_optional_plus_one(bytes),
            },
            _ => Err(PacketError::UnexpectedIndex { expected, received }),
        }
    }

    /// Decode a first packet.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::UnexpectedIndex`] when the leading byte is not
    /// zero, [`PacketError::TooManyFragments`] when the announced count
    /// exceeds [`MAX_FRAGMENTS`], and [`PacketError::WrongPacketSize`] when the
    /// buffer cannot hold the header or the declared payload.
    pub fn parse_first(bytes: &[u8]) -> Result<Self, PacketError> {
        let kind = PacketKind::First;
        check_len(kind, bytes, FIRST_HEADER)?;
        let received = PacketIndex::new(bytes[0]);
        if received != PacketIndex::zero() {
            return Err(PacketError::UnexpectedIndex {
                expected: PacketIndex::zero(),
                received,
            });
        }
        let full_fragments = bytes[1];
        if full_fragments > MAX_FRAGMENTS {
            return Err(PacketError::TooManyFragments {
                count: full_fragments,
            });
        }
        if full_fragments > 0 {
            if bytes.len() != PACKET_SIZE {
                return Err(PacketError::WrongPacketSize {
                    kind,
                    actual: bytes.len(),
                });
            }
            return Ok(Self::First {
                full_fragments,
                payload: bytes[FIRST_HEADER..].to_vec(),
                size: None,
                crc32: None,
                has_extra_packet: false,
            });
        }

        check_len(kind, bytes, FIRST_SINGLE_HEADER)?;
        let crc32 = read_crc(kind, bytes)?;
        let size = bytes[6];
        let declared = usize::from(size);
        if declared > SINGLE_FRAGMENT_LIMIT {
            return Err(PacketError::WrongPacketSize {
                kind,
                actual: declared,
            });
        }
        let carried = declared.min(FIRST_SINGLE_CAPACITY);
        Ok(Self::First {
            full_fragments,
            payload: take_payload(kind, bytes, FIRST_SINGLE_HEADER, carried)?,
            size: Some(size),
            crc32: Some(crc32),
            has_extra_packet: declared > carried,
        })
    }

    /// Decode a middle packet.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::WrongPacketSize`] unless `bytes` is exactly
    /// [`PACKET_SIZE`] long.
    pub fn parse_middle(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() != PACKET_SIZE {
            return Err(PacketError::WrongPacketSize {
                kind: PacketKind::Middle,
                actual: bytes.len(),
            });
        }
        Ok(Self::Middle {
            index: PacketIndex::new(bytes[0]),
            payload: bytes[MIDDLE_HEADER..].to_vec(),
        })
    }

    /// Decode a last packet.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::WrongPacketSize`] when the buffer cannot hold
    /// the header or the declared payload, or when the declared size exceeds
    /// 18 bytes.
    pub fn parse_last(bytes: &[u8]) -> Result<Self, PacketError> {
        let kind = PacketKind::Last;
        check_len(kind, bytes, LAST_HEADER)?;
        let size = bytes[1];
        let declared = usize::from(size);
        if declared > MAX_TRAILING_SIZE {
            return Err(PacketError::WrongPacketSize {
                kind,
                actual: declared,
            });
        }
        let carried = declared.min(LAST_CAPACITY);
        Ok(Self::Last {
            index: PacketIndex::new(bytes[0]),
            size,
            payload: take_payload(kind, bytes, LAST_HEADER, carried)?,
            crc32: read_crc(kind, bytes)?,
            has_extra_packet: declared > carried,
        })
    }

    /// Decode an optional extra packet.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::WrongPacketSize`] when the buffer cannot hold
    /// the header or the declared payload.
    pub fn parse_last_optional_plus_one(bytes: &[u8]) -> Result<Self, PacketError> {
        let kind = PacketKind::LastOptionalPlusOne;
        check_len(kind, bytes, EXTRA_HEADER)?;
        let size = bytes[1];
        Ok(Self::LastOptionalPlusOne {
            index: PacketIndex::new(bytes[0]),
            size,
            payload: take_payload(kind, bytes, EXTRA_HEADER, usize::from(size))?,
        })
    }
}

fn check_len(kind: PacketKind, bytes: &[u8], header: usize) -> Result<(), PacketError> {
    if (header..=PACKET_SIZE).contains(&bytes.len()) {
        Ok(())
    } else {
        Err(PacketError::WrongPacketSize {
            kind,
            actual: bytes.len(),
        })
    }
}

fn take_payload(
    kind: PacketKind,
    bytes: &[u8],
    header: usize,
    len: usize,
) -> Result<Vec<u8>, PacketError> {
    bytes
        .get(header..header + len)
        .map(<[u8]>::to_vec)
        .ok_or(PacketError::WrongPacketSize {
            kind,
            actual: bytes.len(),
        })
}

fn read_crc(kind: PacketKind, bytes: &[u8]) -> Result<u32, PacketError> {
    read_network_u32_at(bytes, CRC_OFFSET).ok_or(PacketError::WrongPacketSize {
        kind,
        actual: bytes.len(),
    })
}
