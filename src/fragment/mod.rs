//! Payload fragmentation over 20-byte packets.
//!
//! [`Splitter`] turns a payload of up to 300 bytes into an ordered
//! [`PacketBatch`]; [`Joiner`] consumes the same packets on the receiving side
//! and hands back the payload once its CRC-32 checks out.

pub mod error;
pub mod joiner;
pub mod splitter;

pub use error::{FragmentStatus, FragmentationError, ReassemblyError};
pub use joiner::Joiner;
pub use splitter::{PacketBatch, Splitter};
