//! Milenage (3GPP TS 35.206) key derivation for EAP-AKA.
//!
//! Controller and pump share a long-term key `K`. From `K`, a sequence number
//! and a fresh random challenge the controller derives the cipher key `CK`,
//! the authentication token `AUTN` it sends, and the `RES` it expects back.
//! When the pump rejects the sequence number it answers with `AUTS`, from
//! which the synchronised sequence number and its `MAC-S` are recovered.

use std::fmt;

use aes::{
    Aes128,
    cipher::{BlockEncrypt, KeyInit},
};
use rand::{RngCore, rngs::OsRng};
use thiserror::Error;

/// Operator variant constant shared by every pump.
pub const OP: [u8; 16] = [
    0xcd, 0xc2, 0x02, 0xd5, 0x12, 0x3e, 0x20, 0xf6, 0x2b, 0x6d, 0x67, 0x6a, 0xc7, 0x2c, 0xb3, 0x18,
];
/// Authentication management field used for regular challenges.
pub const DEFAULT_AMF: [u8; 2] = [0xb9, 0xb9];
/// Authentication management field used when verifying a resynchronisation.
pub const RESYNC_AMF: [u8; 2] = [0x00, 0x00];

pub const KEY_LEN: usize = 16;
pub const SQN_LEN: usize = 6;
pub const AMF_LEN: usize = 2;
pub const RAND_LEN: usize = 16;
pub const AUTS_LEN: usize = 14;
pub const AUTN_LEN: usize = 16;
pub const RES_LEN: usize = 8;
pub const MAC_LEN: usize = 8;

type Block = [u8; 16];

/// Errors raised while preparing Milenage inputs.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum MilenageError {
    /// An input did not have its fixed length.
    #[error("{field} must be {expected} bytes, got {actual}")]
    InvalidKeyLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The operating system could not supply random bytes.
    #[error("random number generator unavailable")]
    RandomUnavailable,
}

fn fixed<const N: usize>(field: &'static str, bytes: &[u8]) -> Result<[u8; N], MilenageError> {
    bytes
        .try_into()
        .map_err(|_| MilenageError::InvalidKeyLength {
            field,
            expected: N,
            actual: bytes.len(),
        })
}

/// Inputs of one derivation.
///
/// `Debug` output omits the long-term key.
#[derive(Clone)]
pub struct Milenage {
    k: [u8; KEY_LEN],
    sqn: [u8; SQN_LEN],
    rand: [u8; RAND_LEN],
    amf: [u8; AMF_LEN],
    auts: [u8; AUTS_LEN],
}

impl fmt::Debug for Milenage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Milenage")
            .field("k", &"<redacted>")
            .field("sqn", &self.sqn)
            .field("rand", &self.rand)
            .field("amf", &self.amf)
            .field("auts", &self.auts)
            .finish()
    }
}

impl Milenage {
    /// Prepare a derivation for key `k` and sequence number `sqn`, drawing a
    /// fresh `RAND` from the operating system.
    ///
    /// # Errors
    ///
    /// Returns [`MilenageError::InvalidKeyLength`] when `k` is not 16 bytes or
    /// `sqn` is not 6 bytes, and [`MilenageError::RandomUnavailable`] when no
    /// randomness can be obtained.
    pub fn new(k: &[u8], sqn: &[u8]) -> Result<Self, MilenageError> {
        let mut rand = [0u8; RAND_LEN];
        OsRng
            .try_fill_bytes(&mut rand)
            .map_err(|_| MilenageError::RandomUnavailable)?;
        Ok(Self {
            k: fixed("K", k)?,
            sqn: fixed("SQN", sqn)?,
            rand,
            amf: DEFAULT_AMF,
            auts: [0; AUTS_LEN],
        })
    }

    /// Replace the random challenge.
    ///
    /// # Errors
    ///
    /// Returns [`MilenageError::InvalidKeyLength`] unless `rand` is 16 bytes.
    pub fn with_rand(mut self, rand: &[u8]) -> Result<Self, MilenageError> {
        self.rand = fixed("RAND", rand)?;
        Ok(self)
    }

    /// Replace the sequence number.
    #[must_use]
    pub const fn with_sqn(mut self, sqn: [u8; SQN_LEN]) -> Self {
        self.sqn = sqn;
        self
    }

    /// Replace the authentication management field.
    ///
    /// # Errors
    ///
    /// Returns [`MilenageError::InvalidKeyLength`] unless `amf` is 2 bytes.
    pub fn with_amf(mut self, amf: &[u8]) -> Result<Self, MilenageError> {
        self.amf = fixed("AMF", amf)?;
        Ok(self)
    }

    /// Supply the `AUTS` received in a synchronisation failure.
    ///
    /// # Errors
    ///
    /// Returns [`MilenageError::InvalidKeyLength`] unless `auts` is 14 bytes.
    pub fn with_auts(mut self, auts: &[u8]) -> Result<Self, MilenageError> {
        self.auts = fixed("AUTS", auts)?;
        Ok(self)
    }

    /// Return the random challenge.
    #[must_use]
    pub const fn rand(&self) -> [u8; RAND_LEN] { self.rand }

    /// Return the sequence number.
    #[must_use]
    pub const fn sqn(&self) -> [u8; SQN_LEN] { self.sqn }

    /// Run the Milenage functions f1 to f5*.
    #[must_use]
    pub fn derive(&self) -> SessionMaterial {
        let cipher = Aes128::new((&self.k).into());
        let encrypt = |input: Block| -> Block {
            let mut block = input;
            cipher.encrypt_block((&mut block).into());
            block
        };

        let opc = xor(encrypt(OP), OP);
        let temp = encrypt(xor(self.rand, opc));
        let masked = xor(temp, opc);

        let out2 = xor(encrypt(with_constant(rotate(masked, 0), 1)), opc);
        let ck = xor(encrypt(with_constant(rotate(masked, 12), 2)), opc);
        let out5 = xor(encrypt(with_constant(rotate(masked, 4), 8)), opc);

        let mut in1 = [0u8; 16];
        in1[..6].copy_from_slice(&self.sqn);
        in1[6..8].copy_from_slice(&self.amf);
        in1[8..14].copy_from_slice(&self.sqn);
        in1[14..].copy_from_slice(&self.amf);
        let out1 = xor(encrypt(xor(rotate(xor(in1, opc), 8), temp)), opc);

        let ak: [u8; SQN_LEN] = take(&out2, 0);
        let ak_star: [u8; SQN_LEN] = take(&out5, 0);
        let mac_a: [u8; MAC_LEN] = take(&out1, 0);

        let mut autn = [0u8; AUTN_LEN];
        for (slot, (sqn, ak)) in autn.iter_mut().zip(self.sqn.iter().zip(ak.iter())) {
            *slot = sqn ^ ak;
        }
        autn[6..8].copy_from_slice(&self.amf);
        autn[8..].copy_from_slice(&mac_a);

        let mut synchronized_sqn = [0u8; SQN_LEN];
        for (slot, (ak, auts)) in synchronized_sqn
            .iter_mut()
            .zip(ak_star.iter().zip(self.auts.iter()))
        {
            *slot = ak ^ auts;
        }

        SessionMaterial {
            opc,
            ck,
            autn,
            res: take(&out2, 8),
            ak,
            ak_star,
            mac_a,
            mac_s: take(&out1, 8),
            synchronized_sqn,
            received_mac_s: take(&self.auts, SQN_LEN),
        }
    }
}

fn xor(a: Block, b: Block) -> Block {
    let mut out = a;
    for (slot, byte) in out.iter_mut().zip(b) {
        *slot ^= byte;
    }
    out
}

/// Place byte `i` of `input` at `(i + offset) % 16`.
fn rotate(input: Block, offset: usize) -> Block {
    let mut out = [0u8; 16];
    for (i, byte) in input.into_iter().enumerate() {
        out[(i + offset) % 16] = byte;
    }
    out
}

fn with_constant(mut block: Block, constant: u8) -> Block {
    block[15] ^= constant;
    block
}

fn take<const N: usize>(source: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&source[offset..offset + N]);
    out
}

/// Outputs of one Milenage derivation.
///
/// `Debug` output omits the cipher key.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionMaterial {
    opc: Block,
    ck: [u8; 16],
    autn: [u8; AUTN_LEN],
    res: [u8; RES_LEN],
    ak: [u8; SQN_LEN],
    ak_star: [u8; SQN_LEN],
    mac_a: [u8; MAC_LEN],
    mac_s: [u8; MAC_LEN],
    synchronized_sqn: [u8; SQN_LEN],
    received_mac_s: [u8; MAC_LEN],
}

impl fmt::Debug for SessionMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionMaterial")
            .field("ck", &"<redacted>")
            .field("autn", &self.autn)
            .field("res", &self.res)
            .field("synchronized_sqn", &self.synchronized_sqn)
            .finish_non_exhaustive()
    }
}

impl SessionMaterial {
    /// Operator key derived from `OP` and `K`.
    #[must_use]
    pub const fn opc(&self) -> [u8; 16] { self.opc }

    /// Cipher key for the session.
    #[must_use]
    pub const fn ck(&self) -> [u8; 16] { self.ck }

    /// Authentication token: `(SQN ^ AK) || AMF || MAC-A`.
    #[must_use]
    pub const fn autn(&self) -> [u8; AUTN_LEN] { self.autn }

    /// Response the pump must return.
    #[must_use]
    pub const fn res(&self) -> [u8; RES_LEN] { self.res }

    /// Anonymity key hiding the sequence number inside `AUTN`.
    #[must_use]
    pub const fn ak(&self) -> [u8; SQN_LEN] { self.ak }

    /// Anonymity key hiding the sequence number inside `AUTS`.
    #[must_use]
    pub const fn ak_star(&self) -> [u8; SQN_LEN] { self.ak_star }

    #[must_use]
    pub const fn mac_a(&self) -> [u8; MAC_LEN] { self.mac_a }

    #[must_use]
    pub const fn mac_s(&self) -> [u8; MAC_LEN] { self.mac_s }

    /// Sequence number recovered from `AUTS`.
    #[must_use]
    pub const fn synchronized_sqn(&self) -> [u8; SQN_LEN] { self.synchronized_sqn }

    /// `MAC-S` carried in `AUTS`.
    #[must_use]
    pub const fn received_mac_s(&self) -> [u8; MAC_LEN] { self.received_mac_s }
}
