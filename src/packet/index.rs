//! Position of a packet within one fragmented payload.
//!
//! Provides [`PacketIndex`], the byte that leads every packet on the wire.
//! The first packet is always index zero.

use derive_more::{Display, From};

/// Zero-based ordinal of a packet inside one fragment assembly.
///
/// # Examples
///
/// ```
/// use pumpwire::packet::PacketIndex;
/// let index = PacketIndex::new(3);
/// assert_eq!(index.get(), 3);
/// assert_eq!(index.checked_increment(), Some(PacketIndex::new(4)));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From)]
#[display("{_0}")]
pub struct PacketIndex(u8);

impl PacketIndex {
    /// Construct an index from its wire byte.
    #[must_use]
    pub const fn new(value: u8) -> Self { Self(value) }

    /// Return the index carried by every first packet.
    #[must_use]
    pub const fn zero() -> Self { Self(0) }

    /// Return the underlying wire byte.
    #[must_use]
    pub const fn get(self) -> u8 { self.0 }

    /// Increment the index, returning `None` on overflow.
    #[must_use]
    pub fn checked_increment(self) -> Option<Self> { self.0.checked_add(1).map(Self) }
}

impl From<PacketIndex> for u8 {
    fn from(value: PacketIndex) -> Self { value.0 }
}
