//! Checksums used on the pump link.
//!
//! Two checksums appear on the wire. Fragmented payloads carry a standard
//! CRC-32 (the zlib/ISO-HDLC model) and command frames carry the firmware's
//! 16-bit checksum. The latter uses the MSB-first `0x8005` table but shifts
//! the register right, so it matches none of the catalogued CRC-16 models and
//! is computed here from its own table.

use crc::{CRC_32_ISO_HDLC, Crc};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

const CRC16_POLY: u16 = 0x8005;

const CRC16_TABLE: [u16; 256] = build_crc16_table();

const fn build_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "loop index is bounded by the table length"
        )]
        let mut value = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            value = if value & 0x8000 == 0 {
                value << 1
            } else {
                (value << 1) ^ CRC16_POLY
            };
            bit += 1;
        }
        table[i] = value;
        i += 1;
    }
    table
}

/// Compute the firmware CRC-16 over `bytes`.
///
/// The register starts at zero and no final xor is applied.
///
/// # Examples
///
/// ```
/// use pumpwire::crc::crc16;
///
/// assert_eq!(crc16(b"123456789"), 0x0265);
/// assert_eq!(crc16(&[]), 0);
/// ```
#[must_use]
pub fn crc16(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0u16, |acc, &byte| {
        let slot = usize::from((acc ^ u16::from(byte)) & 0x00ff);
        (acc >> 8) ^ CRC16_TABLE[slot]
    })
}

/// Compute the CRC-32 (zlib polynomial, reflected, `0xffff_ffff` xorout)
/// over `bytes`.
///
/// # Examples
///
/// ```
/// use pumpwire::crc::crc32;
///
/// assert_eq!(crc32(b"123456789"), 0xcbf4_3926);
/// ```
#[must_use]
pub fn crc32(bytes: &[u8]) -> u32 { CRC32.checksum(bytes) }
