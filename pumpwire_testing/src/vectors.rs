//! Captured pump traffic and key-derivation vectors.

/// Decode a hex string, panicking on malformed input.
///
/// # Panics
///
/// Panics if `hex_str` is not valid hexadecimal.
#[must_use]
pub fn from_hex(hex_str: &str) -> Vec<u8> { hex::decode(hex_str).expect("valid hex") }

/// Session frame notified by a pump, split over two packets.
pub const CAPTURED_PAYLOAD: [u8; 22] = [
    0x54, 0x57, 0x10, 0x23, 0x03, 0x00, 0x00, 0xc0, 0xff, 0xff, 0xff, 0xfe, 0x08, 0x20, 0x2e, 0xa8,
    0x50, 0x30, 0x3d, 0x00, 0x01, 0xa5,
];

/// First packet of [`CAPTURED_PAYLOAD`].
pub const CAPTURED_FIRST: [u8; 20] = [
    0x00, 0x01, 0x54, 0x57, 0x10, 0x23, 0x03, 0x00, 0x00, 0xc0, 0xff, 0xff, 0xff, 0xfe, 0x08, 0x20,
    0x2e, 0xa8, 0x50, 0x30,
];

/// Last packet of [`CAPTURED_PAYLOAD`], with the stale bytes the pump leaves
/// after the declared size.
pub const CAPTURED_LAST: [u8; 20] = [
    0x01, 0x04, 0xbc, 0x20, 0x1f, 0xf6, 0x3d, 0x00, 0x01, 0xa5, 0xff, 0xff, 0xff, 0xfe, 0x08, 0x20,
    0x2e, 0xa8, 0x50, 0x30,
];

/// Status request command frame with a valid CRC-16.
pub const STATUS_REQUEST: [u8; 18] = [
    0x1f, 0x00, 0xee, 0x84, 0x30, 0x0a, 0x1d, 0x18, 0x00, 0x3f, 0x18, 0x00, 0x00, 0x42, 0x97, 0xff,
    0x81, 0x28,
];

/// Session key derivation observed with a paired pump.
pub mod pod_session {
    pub const LTK: &str = "c0772899720972a314f557de66d571dd";
    pub const EAP_SQN: u64 = 2;
    pub const RAND: &str = "c2cd1248451103bd77a6c7ef88c441ba";
    pub const AUTN: &str = "00c55c78e8d3b9b9e935860a7259f6c0";
    pub const RES: &str = "a40bc6d13861447e";
    pub const CK: &str = "55799fd26664cbf6e476525e2dee52c6";
    /// `AUTS` sent when the pump rejects [`EAP_SQN`].
    pub const AUTS: &str = "8d83c9c9faa95312e3281ab128d6";
    /// Sequence number recovered from [`AUTS`].
    pub const SYNCHRONIZED_SQN: u64 = 7;
}
