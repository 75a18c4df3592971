//! Session frames exchanged once a pump is paired.
//!
//! ```text
//! "TW" | flags1 | flags2 | seq | ack seq | size (11 bits) | source | destination | payload
//! ```
//!
//! `flags1` holds the version (bits 7..5), SAS (bit 4), TFS (bit 3) and EQoS
//! (bits 2..0). `flags2` holds ACK (bit 7), priority (bit 6), last message
//! (bit 5), gateway (bit 4) and the message type (bits 3..0). Encrypted frames
//! carry an eight-byte authentication tag after the declared payload size.

use super::{Frame, MessageError};
use crate::byte_order::{read_network_u32_at, write_network_u32};

const MAGIC: [u8; 2] = *b"TW";
const HEADER_LEN: usize = 16;
const TAG_LEN: usize = 8;
const MAX_SIZE: usize = 0x7ff;

/// Message type carried in the low nibble of `flags2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageType {
    Clear = 0,
    Encrypted = 1,
    SessionEstablishment = 2,
    Pairing = 3,
}

impl TryFrom<u8> for MessageType {
    type Error = MessageError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Clear),
            1 => Ok(Self::Encrypted),
            2 => Ok(Self::SessionEstablishment),
            3 => Ok(Self::Pairing),
            other => Err(MessageError::UnknownMessageType(other)),
        }
    }
}

impl From<MessageType> for u8 {
    fn from(value: MessageType) -> Self { value as Self }
}

/// Header flags of a session frame.
///
/// `Default` matches what controllers send: SAS set, everything else clear.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "each flag maps to one wire bit"
)]
pub struct SessionFlags {
    pub version: u8,
    pub sas: bool,
    pub tfs: bool,
    /// Three-bit quality-of-service level.
    pub eqos: u8,
    pub ack: bool,
    pub priority: bool,
    pub last_message: bool,
    pub gateway: bool,
}

impl Default for SessionFlags {
    fn default() -> Self {
        Self {
            version: 0,
            sas: true,
            tfs: false,
            eqos: 0,
            ack: false,
            priority: false,
            last_message: false,
            gateway: false,
        }
    }
}

impl SessionFlags {
    fn first_byte(&self) -> u8 {
        ((self.version & 0b111) << 5)
            | (u8::from(self.sas) << 4)
            | (u8::from(self.tfs) << 3)
            | (self.eqos & 0b111)
    }

    fn second_byte(&self, message_type: MessageType) -> u8 {
        (u8::from(self.ack) << 7)
            | (u8::from(self.priority) << 6)
            | (u8::from(self.last_message) << 5)
            | (u8::from(self.gateway) << 4)
            | u8::from(message_type)
    }

    fn from_bytes(first: u8, second: u8) -> Self {
        Self {
            version: first >> 5,
            sas: first & 0b1_0000 != 0,
            tfs: first & 0b1000 != 0,
            eqos: first & 0b111,
            ack: second & 0b1000_0000 != 0,
            priority: second & 0b0100_0000 != 0,
            last_message: second & 0b0010_0000 != 0,
            gateway: second & 0b0001_0000 != 0,
        }
    }
}

/// One frame of the pairing and session protocol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionMessage {
    pub message_type: MessageType,
    pub source: u32,
    pub destination: u32,
    pub sequence_number: u8,
    pub ack_number: u8,
    pub flags: SessionFlags,
    /// Payload bytes; for [`MessageType::Encrypted`] frames this includes the
    /// trailing authentication tag.
    pub payload: Vec<u8>,
}

impl SessionMessage {
    /// Build a frame with default flags.
    #[must_use]
    pub fn new(
        message_type: MessageType,
        source: u32,
        destination: u32,
        sequence_number: u8,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            message_type,
            source,
            destination,
            sequence_number,
            ack_number: 0,
            flags: SessionFlags::default(),
            payload: payload.into(),
        }
    }

    /// Build the acknowledgement for `received`, sent back with sequence
    /// number `sequence_number`.
    ///
    /// # Examples
    ///
    /// ```
    /// use pumpwire::message::{MessageType, SessionMessage};
    ///
    /// let response = SessionMessage::new(MessageType::Encrypted, 0x1701, 0x0042, 255, vec![0; 8]);
    /// let ack = SessionMessage::ack_for(&response, 7);
    /// assert_eq!(ack.ack_number, 0);
    /// assert_eq!((ack.source, ack.destination), (0x0042, 0x1701));
    /// assert!(ack.flags.ack);
    /// ```
    #[must_use]
    pub fn ack_for(received: &Self, sequence_number: u8) -> Self {
        let mut ack = Self::new(
            MessageType::Encrypted,
            received.destination,
            received.source,
            sequence_number,
            Vec::new(),
        );
        ack.ack_number = received.sequence_number.wrapping_add(1);
        ack.flags.ack = true;
        ack
    }

    /// Encode the frame with the size field counting the whole payload,
    /// as authenticated by the encryption layer before the tag exists.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::PayloadTooLarge`] when the payload does not fit
    /// the eleven-bit size field.
    pub fn encode_for_encryption(&self) -> Result<Vec<u8>, MessageError> {
        self.encode_with_size(self.payload.len())
    }

    fn encode_with_size(&self, size: usize) -> Result<Vec<u8>, MessageError> {
        if size > MAX_SIZE {
            return Err(MessageError::PayloadTooLarge {
                size,
                limit: MAX_SIZE,
            });
        }
        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len());
        out.extend_from_slice(&MAGIC);
        out.push(self.flags.first_byte());
        out.push(self.flags.second_byte(self.message_type));
        out.push(self.sequence_number);
        out.push(self.ack_number);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "size is bounded to eleven bits above"
        )]
        let (size_high, size_low) = ((size >> 3) as u8, ((size << 5) & 0xff) as u8);
        out.push(size_high);
        out.push(size_low);
        out.extend_from_slice(&write_network_u32(self.source));
        out.extend_from_slice(&write_network_u32(self.destination));
        out.extend_from_slice(&self.payload);
        Ok(out)
    }

    fn tag_len(message_type: MessageType) -> usize {
        if message_type == MessageType::Encrypted {
            TAG_LEN
        } else {
            0
        }
    }
}

impl Frame for SessionMessage {
    const MIN_LEN: usize = HEADER_LEN;

    fn encode(&self) -> Result<Vec<u8>, MessageError> {
        let tag = Self::tag_len(self.message_type);
        let size = self
            .payload
            .len()
            .checked_sub(tag)
            .ok_or(MessageError::NotEnoughData {
                needed: tag,
                available: self.payload.len(),
            })?;
        self.encode_with_size(size)
    }

    fn decode(bytes: &[u8]) -> Result<Self, MessageError> {
        let available = bytes.len();
        if available < HEADER_LEN {
            return Err(MessageError::NotEnoughData {
                needed: HEADER_LEN,
                available,
            });
        }
        let found = [bytes[0], bytes[1]];
        if found != MAGIC {
            return Err(MessageError::MagicMismatch { found });
        }
        let flags = SessionFlags::from_bytes(bytes[2], bytes[3]);
        if flags.version != 0 {
            return Err(MessageError::UnsupportedVersion(flags.version));
        }
        let message_type = MessageType::try_from(bytes[3] & 0x0f)?;
        let size = (usize::from(bytes[6]) << 3) | usize::from(bytes[7] >> 5);
        let end = HEADER_LEN + size + Self::tag_len(message_type);
        let not_enough = MessageError::NotEnoughData {
            needed: end,
            available,
        };
        let payload = bytes.get(HEADER_LEN..end).ok_or(not_enough)?.to_vec();
        Ok(Self {
            message_type,
            source: read_network_u32_at(bytes, 8).ok_or(not_enough)?,
            destination: read_network_u32_at(bytes, 12).ok_or(not_enough)?,
            sequence_number: bytes[4],
            ack_number: bytes[5],
            flags,
            payload,
        })
    }
}
