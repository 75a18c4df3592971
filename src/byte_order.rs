//! Network byte-order helpers for pump wire fields.
//!
//! Every multi-byte integer on the link is big-endian. The helpers keep the
//! Clippy expectation next to the conversion and read from slices at an
//! offset, returning `None` when the slice is too short instead of panicking.

/// Serialise a `u16` in network byte order.
///
/// # Examples
///
/// ```
/// use pumpwire::byte_order::write_network_u16;
///
/// assert_eq!(write_network_u16(0x8128), [0x81, 0x28]);
/// ```
#[must_use]
pub fn write_network_u16(value: u16) -> [u8; 2] {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    value.to_be_bytes()
}

/// Serialise a `u32` in network byte order.
///
/// # Examples
///
/// ```
/// use pumpwire::byte_order::write_network_u32;
///
/// assert_eq!(write_network_u32(0x1f00_ee84), [0x1f, 0x00, 0xee, 0x84]);
/// ```
#[must_use]
pub fn write_network_u32(value: u32) -> [u8; 4] {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    value.to_be_bytes()
}

/// Read a network-order `u16` starting at `offset`.
///
/// Returns `None` when fewer than two bytes remain.
///
/// # Examples
///
/// ```
/// use pumpwire::byte_order::read_network_u16_at;
///
/// assert_eq!(read_network_u16_at(&[0x00, 0x81, 0x28], 1), Some(0x8128));
/// assert_eq!(read_network_u16_at(&[0x81], 0), None);
/// ```
#[must_use]
pub fn read_network_u16_at(bytes: &[u8], offset: usize) -> Option<u16> {
    let raw: [u8; 2] = bytes.get(offset..offset.checked_add(2)?)?.try_into().ok()?;
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    Some(u16::from_be_bytes(raw))
}

/// Decode two network-order bytes.
#[must_use]
pub fn read_network_u16(bytes: [u8; 2]) -> u16 {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    u16::from_be_bytes(bytes)
}

/// Read a network-order `u32` starting at `offset`.
///
/// Returns `None` when fewer than four bytes remain.
#[must_use]
pub fn read_network_u32_at(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw: [u8; 4] = bytes.get(offset..offset.checked_add(4)?)?.try_into().ok()?;
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    Some(u32::from_be_bytes(raw))
}

/// Encode the low 48 bits of `value` as six network-order bytes.
///
/// EAP-AKA sequence numbers are 48-bit counters tracked as `u64`.
///
/// # Examples
///
/// ```
/// use pumpwire::byte_order::write_network_u48;
///
/// assert_eq!(write_network_u48(2), [0, 0, 0, 0, 0, 2]);
/// ```
#[must_use]
pub fn write_network_u48(value: u64) -> [u8; 6] {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    let wide = value.to_be_bytes();
    let mut out = [0u8; 6];
    out.copy_from_slice(&wide[2..]);
    out
}

/// Decode six network-order bytes into a `u64`.
#[must_use]
pub fn read_network_u48(bytes: [u8; 6]) -> u64 {
    let mut wide = [0u8; 8];
    wide[2..].copy_from_slice(&bytes);
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    u64::from_be_bytes(wide)
}
