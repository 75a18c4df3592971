#![doc(html_root_url = "https://docs.rs/pumpwire/latest")]
//! Public API for the `pumpwire` library.
//!
//! This crate implements the controller side of the BLE transport used by
//! patch insulin pumps: CRC utilities, the twenty-byte packet codec, payload
//! splitting and joining, command and session message framing, and the
//! Milenage/EAP-AKA session establishment.
//!
//! The layers stack bottom-up:
//!
//! - [`packet`] maps twenty wire bytes to a [`PhysicalPacket`].
//! - [`fragment`] splits payloads into packets and joins them back.
//! - [`codec`] drives both through `tokio_util` for byte streams.
//! - [`message`] frames commands and session messages inside payloads.
//! - [`session`] derives session keys and negotiates them with the pump.

pub mod byte_order;
pub mod codec;
pub mod config;
pub mod crc;
pub mod error;
pub mod fragment;
pub mod message;
pub mod packet;
pub mod session;

pub use codec::PacketCodec;
pub use config::TransportConfig;
pub use error::{EofError, Result, TransportError};
pub use fragment::{
    FragmentStatus,
    FragmentationError,
    Joiner,
    PacketBatch,
    ReassemblyError,
    Splitter,
};
pub use message::{
    CommandMessage,
    CrcCheck,
    Frame,
    LogicalMessage,
    MessageError,
    MessageFamily,
    MessageType,
    SequenceNumber,
    SessionFlags,
    SessionMessage,
};
pub use packet::{PacketError, PacketIndex, PacketKind, PhysicalPacket};
pub use session::{
    Milenage,
    MilenageError,
    SessionError,
    SessionKeys,
    SessionNegotiator,
    SessionOutcome,
    SessionParams,
};
