//! Logical messages carried inside one fragmented payload.
//!
//! Two families share the link. [`CommandMessage`] frames address the pump
//! directly and end in a CRC-16; [`SessionMessage`] frames carry pairing,
//! session establishment and encrypted traffic behind a `TW` header.
//! [`LogicalMessage`] is the tagged union of both, keyed by
//! [`MessageFamily`].

pub mod command;
pub mod error;
pub mod keyed;
pub mod sequence;
pub mod session;

pub use command::CommandMessage;
pub use error::MessageError;
pub use sequence::SequenceNumber;
pub use session::{MessageType, SessionFlags, SessionMessage};

/// Wire framing shared by both message families.
pub trait Frame: Sized {
    /// Smallest buffer that can hold a valid frame.
    const MIN_LEN: usize;

    /// Serialise the frame.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError`] when a field does not fit its wire encoding.
    fn encode(&self) -> Result<Vec<u8>, MessageError>;

    /// Parse a frame from `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError`] when `bytes` is truncated or inconsistent.
    fn decode(bytes: &[u8]) -> Result<Self, MessageError>;
}

/// Whether a command frame's CRC-16 is verified on decode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CrcCheck {
    #[default]
    Verify,
    Skip,
}

/// Message family, which determines how a payload is framed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageFamily {
    Command,
    Session,
}

/// A decoded message of either family.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogicalMessage {
    Command(CommandMessage),
    Session(SessionMessage),
}

impl LogicalMessage {
    /// Return the family of this message.
    #[must_use]
    pub const fn family(&self) -> MessageFamily {
        match self {
            Self::Command(_) => MessageFamily::Command,
            Self::Session(_) => MessageFamily::Session,
        }
    }

    /// Serialise the message into the payload handed to the splitter.
    ///
    /// # Errors
    ///
    /// Returns the framing error of the underlying family.
    pub fn encode(&self) -> Result<Vec<u8>, MessageError> {
        match self {
            Self::Command(message) => message.encode(),
            Self::Session(message) => message.encode(),
        }
    }

    /// Parse a joined payload as a message of `family`.
    ///
    /// `crc_check` only applies to command frames.
    ///
    /// # Errors
    ///
    /// Returns the framing error of the underlying family.
    pub fn decode(
        bytes: &[u8],
        family: MessageFamily,
        crc_check: CrcCheck,
    ) -> Result<Self, MessageError> {
        match family {
            MessageFamily::Command => {
                CommandMessage::decode_with(bytes, crc_check).map(Self::Command)
            }
            MessageFamily::Session => SessionMessage::decode(bytes).map(Self::Session),
        }
    }
}

impl From<CommandMessage> for LogicalMessage {
    fn from(message: CommandMessage) -> Self { Self::Command(message) }
}

impl From<SessionMessage> for LogicalMessage {
    fn from(message: SessionMessage) -> Self { Self::Session(message) }
}
