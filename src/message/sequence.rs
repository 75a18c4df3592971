//! Four-bit sequence numbers carried by command frames.

use derive_more::Display;

const MASK: u8 = 0x0f;

/// Command frame sequence number, wrapping modulo 16.
///
/// # Examples
///
/// ```
/// use pumpwire::message::SequenceNumber;
///
/// let seq = SequenceNumber::new(15);
/// assert_eq!(seq.next(), SequenceNumber::new(0));
/// assert_eq!(SequenceNumber::new(0x1c).get(), 12);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("{_0}")]
pub struct SequenceNumber(u8);

impl SequenceNumber {
    /// Construct a sequence number, keeping only the low four bits.
    #[must_use]
    pub const fn new(value: u8) -> Self { Self(value & MASK) }

    /// Return the four-bit value.
    #[must_use]
    pub const fn get(self) -> u8 { self.0 }

    /// Return the following sequence number, wrapping after 15.
    #[must_use]
    pub const fn next(self) -> Self { Self::new(self.0.wrapping_add(1)) }
}

impl From<SequenceNumber> for u8 {
    fn from(value: SequenceNumber) -> Self { value.0 }
}
