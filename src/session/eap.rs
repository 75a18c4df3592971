//! EAP-AKA messages exchanged during session establishment.
//!
//! ```text
//! code | identifier | length (u16 BE) [| 0x17 | subtype | 0x0000 | attributes]
//! ```
//!
//! Each attribute starts with its type and its total size in four-byte words.

use thiserror::Error;

use crate::byte_order::{read_network_u16_at, write_network_u16};

const HEADER_LEN: usize = 4;
const AKA_HEADER_LEN: usize = 8;
const AKA_TYPE: u8 = 0x17;
const WORD: usize = 4;

/// Subtype of an EAP-AKA challenge.
pub const SUBTYPE_CHALLENGE: u8 = 1;
/// Subtype the pump uses when it rejects the sequence number.
pub const SUBTYPE_SYNCHRONIZATION_FAILURE: u8 = 4;

/// Bit length the firmware writes in front of `AT_RES`.
const RES_BIT_LENGTH: u16 = 0x0064;

/// Errors raised while parsing or building EAP messages.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum EapError {
    #[error("EAP message truncated: needed {needed} bytes, had {available}")]
    Truncated { needed: usize, available: usize },
    #[error("unknown EAP code {0}")]
    UnknownCode(u8),
    #[error("unexpected EAP type {0:#04x}")]
    UnexpectedType(u8),
    #[error("unknown EAP-AKA attribute type {0:#04x}")]
    UnknownAttribute(u8),
    #[error("attribute {attribute:#04x} declares {declared} bytes, expected {expected}")]
    AttributeLength {
        attribute: u8,
        declared: usize,
        expected: usize,
    },
    #[error("EAP message of {0} bytes does not fit the length field")]
    TooLong(usize),
}

/// EAP packet code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EapCode {
    Request = 1,
    Response = 2,
    Success = 3,
    Failure = 4,
}

impl TryFrom<u8> for EapCode {
    type Error = EapError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Request),
            2 => Ok(Self::Response),
            3 => Ok(Self::Success),
            4 => Ok(Self::Failure),
            other => Err(EapError::UnknownCode(other)),
        }
    }
}

/// One EAP-AKA attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EapAttribute {
    Rand([u8; 16]),
    Autn([u8; 16]),
    Res([u8; 8]),
    Auts([u8; 14]),
    ClientErrorCode([u8; 2]),
    CustomIv([u8; 4]),
}

impl EapAttribute {
    const RAND: u8 = 0x01;
    const AUTN: u8 = 0x02;
    const RES: u8 = 0x03;
    const AUTS: u8 = 0x04;
    const CLIENT_ERROR_CODE: u8 = 0x22;
    const CUSTOM_IV: u8 = 0x7e;

    /// Wire type of the attribute.
    #[must_use]
    pub const fn kind(&self) -> u8 {
        match self {
            Self::Rand(_) => Self::RAND,
            Self::Autn(_) => Self::AUTN,
            Self::Res(_) => Self::RES,
            Self::Auts(_) => Self::AUTS,
            Self::ClientErrorCode(_) => Self::CLIENT_ERROR_CODE,
            Self::CustomIv(_) => Self::CUSTOM_IV,
        }
    }

    /// Value carried by the attribute, without type, length or padding.
    #[must_use]
    pub fn value(&self) -> &[u8] {
        match self {
            Self::Rand(value) | Self::Autn(value) => value.as_slice(),
            Self::Res(value) => value.as_slice(),
            Self::Auts(value) => value.as_slice(),
            Self::ClientErrorCode(value) => value.as_slice(),
            Self::CustomIv(value) => value.as_slice(),
        }
    }

    /// Bytes between the length byte and the value.
    fn preamble(&self) -> [u8; 2] {
        match self {
            Self::Res(_) => write_network_u16(RES_BIT_LENGTH),
            _ => [0, 0],
        }
    }

    const fn preamble_len(kind: u8) -> usize {
        match kind {
            Self::AUTS | Self::CLIENT_ERROR_CODE => 0,
            _ => 2,
        }
    }

    const fn value_len(kind: u8) -> Option<usize> {
        match kind {
            Self::RAND | Self::AUTN => Some(16),
            Self::RES => Some(8),
            Self::AUTS => Some(14),
            Self::CLIENT_ERROR_CODE => Some(2),
            Self::CUSTOM_IV => Some(4),
            _ => None,
        }
    }

    /// Encoded size, always a multiple of four.
    #[must_use]
    pub fn size(&self) -> usize { 2 + Self::preamble_len(self.kind()) + self.value().len() }

    fn write(&self, out: &mut Vec<u8>) {
        let kind = self.kind();
        out.push(kind);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "attribute sizes are at most twenty bytes"
        )]
        out.push((self.size() / WORD) as u8);
        if Self::preamble_len(kind) > 0 {
            out.extend_from_slice(&self.preamble());
        }
        out.extend_from_slice(self.value());
    }

    /// Parse every attribute in `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`EapError`] when an attribute is unknown, truncated or declares
    /// a size that does not match its type.
    pub fn parse_all(mut bytes: &[u8]) -> Result<Vec<Self>, EapError> {
        let mut attributes = Vec::new();
        while !bytes.is_empty() {
            let (attribute, rest) = Self::parse_one(bytes)?;
            attributes.push(attribute);
            bytes = rest;
        }
        Ok(attributes)
    }

    fn parse_one(bytes: &[u8]) -> Result<(Self, &[u8]), EapError> {
        let available = bytes.len();
        let [kind, words, ..] = *bytes else {
            return Err(EapError::Truncated {
                needed: 2,
                available,
            });
        };
        let value_len = Self::value_len(kind).ok_or(EapError::UnknownAttribute(kind))?;
        let expected = 2 + Self::preamble_len(kind) + value_len;
        let declared = usize::from(words) * WORD;
        if declared != expected {
            return Err(EapError::AttributeLength {
                attribute: kind,
                declared,
                expected,
            });
        }
        if available < declared {
            return Err(EapError::Truncated {
                needed: declared,
                available,
            });
        }
        let (attribute, rest) = bytes.split_at(declared);
        let value = &attribute[2 + Self::preamble_len(kind)..];
        let parsed = match kind {
            Self::RAND => Self::Rand(fixed(value)),
            Self::AUTN => Self::Autn(fixed(value)),
            Self::RES => Self::Res(fixed(value)),
            Self::AUTS => Self::Auts(fixed(value)),
            Self::CLIENT_ERROR_CODE => Self::ClientErrorCode(fixed(value)),
            _ => Self::CustomIv(fixed(value)),
        };
        Ok((parsed, rest))
    }
}

/// Copy a slice whose length was already checked.
fn fixed<const N: usize>(value: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&value[..N]);
    out
}

/// An EAP packet, optionally carrying EAP-AKA attributes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EapMessage {
    pub code: EapCode,
    pub identifier: u8,
    pub subtype: u8,
    pub attributes: Vec<EapAttribute>,
}

impl EapMessage {
    /// Build an EAP-AKA challenge request.
    #[must_use]
    pub fn challenge(identifier: u8, attributes: Vec<EapAttribute>) -> Self {
        Self {
            code: EapCode::Request,
            identifier,
            subtype: SUBTYPE_CHALLENGE,
            attributes,
        }
    }

    /// Build an attribute-less message such as Success or Failure.
    #[must_use]
    pub const fn bare(code: EapCode, identifier: u8) -> Self {
        Self {
            code,
            identifier,
            subtype: SUBTYPE_CHALLENGE,
            attributes: Vec::new(),
        }
    }

    /// Serialise the message.
    ///
    /// # Errors
    ///
    /// Returns [`EapError::TooLong`] when the attributes overflow the length
    /// field.
    pub fn encode(&self) -> Result<Vec<u8>, EapError> {
        let len = if self.attributes.is_empty() {
            HEADER_LEN
        } else {
            AKA_HEADER_LEN + self.attributes.iter().map(EapAttribute::size).sum::<usize>()
        };
        let declared = u16::try_from(len).map_err(|_| EapError::TooLong(len))?;
        let mut out = Vec::with_capacity(len);
        out.push(self.code as u8);
        out.push(self.identifier);
        out.extend_from_slice(&write_network_u16(declared));
        if !self.attributes.is_empty() {
            out.extend_from_slice(&[AKA_TYPE, self.subtype, 0, 0]);
            for attribute in &self.attributes {
                attribute.write(&mut out);
            }
        }
        Ok(out)
    }

    /// Parse a message, ignoring bytes beyond its declared length.
    ///
    /// # Errors
    ///
    /// Returns [`EapError`] when the header is invalid or any attribute fails
    /// to parse.
    pub fn parse(bytes: &[u8]) -> Result<Self, EapError> {
        let available = bytes.len();
        let truncated = |needed| EapError::Truncated { needed, available };
        if available < HEADER_LEN {
            return Err(truncated(HEADER_LEN));
        }
        let code = EapCode::try_from(bytes[0])?;
        let identifier = bytes[1];
        let declared = usize::from(read_network_u16_at(bytes, 2).ok_or(truncated(HEADER_LEN))?);
        if declared < HEADER_LEN {
            return Err(EapError::Truncated {
                needed: HEADER_LEN,
                available: declared,
            });
        }
        if declared == HEADER_LEN {
            return Ok(Self::bare(code, identifier));
        }
        if declared < AKA_HEADER_LEN {
            return Err(truncated(AKA_HEADER_LEN));
        }
        let body = bytes.get(..declared).ok_or(truncated(declared))?;
        if body[4] != AKA_TYPE {
            return Err(EapError::UnexpectedType(body[4]));
        }
        Ok(Self {
            code,
            identifier,
            subtype: body[5],
            attributes: EapAttribute::parse_all(&body[AKA_HEADER_LEN..])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{EapAttribute, EapCode, EapError, EapMessage, SUBTYPE_SYNCHRONIZATION_FAILURE};

    #[rstest]
    #[case::rand(EapAttribute::Rand([0x11; 16]), 20, &[0x01, 0x05, 0x00, 0x00])]
    #[case::autn(EapAttribute::Autn([0x22; 16]), 20, &[0x02, 0x05, 0x00, 0x00])]
    #[case::res(EapAttribute::Res([0x33; 8]), 12, &[0x03, 0x03, 0x00, 0x64])]
    #[case::auts(EapAttribute::Auts([0x44; 14]), 16, &[0x04, 0x04])]
    #[case::client_error(EapAttribute::ClientErrorCode([0x00, 0x01]), 4, &[0x22, 0x01])]
    #[case::custom_iv(EapAttribute::CustomIv([0x55; 4]), 8, &[0x7e, 0x02, 0x00, 0x00])]
    fn attribute_layout(
        #[case] attribute: EapAttribute,
        #[case] size: usize,
        #[case] lead: &[u8],
    ) {
        let mut out = Vec::new();
        attribute.write(&mut out);
        assert_eq!(out.len(), size);
        assert_eq!(attribute.size(), size);
        assert!(out.starts_with(lead));
        assert!(out.ends_with(attribute.value()));
        assert_eq!(EapAttribute::parse_all(&out), Ok(vec![attribute]));
    }

    #[test]
    fn challenge_layout() {
        let message = EapMessage::challenge(
            0,
            vec![
                EapAttribute::Autn([0xaa; 16]),
                EapAttribute::Rand([0xbb; 16]),
                EapAttribute::CustomIv([1, 2, 3, 4]),
            ],
        );
        let encoded = message.encode().expect("encode");
        assert_eq!(encoded.len(), 56);
        assert_eq!(&encoded[..8], &[0x01, 0x00, 0x00, 0x38, 0x17, 0x01, 0x00, 0x00]);
        assert_eq!(EapMessage::parse(&encoded), Ok(message));
    }

    #[test]
    fn success_is_four_bytes() {
        let success = EapMessage::bare(EapCode::Success, 7);
        let encoded = success.encode().expect("encode");
        assert_eq!(encoded, vec![0x03, 0x07, 0x00, 0x04]);
        assert_eq!(EapMessage::parse(&encoded), Ok(success));
    }

    #[test]
    fn parses_synchronization_failure() {
        let mut bytes = vec![0x02, 0x00, 0x00, 0x18, 0x17, 0x04, 0x00, 0x00, 0x04, 0x04];
        bytes.extend_from_slice(&[0x5a; 14]);
        let message = EapMessage::parse(&bytes).expect("parse");
        assert_eq!(message.code, EapCode::Response);
        assert_eq!(message.subtype, SUBTYPE_SYNCHRONIZATION_FAILURE);
        assert_eq!(message.attributes, vec![EapAttribute::Auts([0x5a; 14])]);
    }

    #[rstest]
    #[case::unknown_attribute(&[0x02, 0, 0, 12, 0x17, 1, 0, 0, 0x09, 0x01, 0, 0], EapError::UnknownAttribute(0x09))]
    #[case::wrong_size(&[0x02, 0, 0, 12, 0x17, 1, 0, 0, 0x7e, 0x01, 0, 0], EapError::AttributeLength { attribute: 0x7e, declared: 4, expected: 8 })]
    #[case::truncated_attribute(&[0x02, 0, 0, 12, 0x17, 1, 0, 0, 0x7e, 0x02, 0, 0], EapError::Truncated { needed: 8, available: 4 })]
    #[case::truncated_message(&[0x02, 0, 0, 20, 0x17, 1, 0, 0], EapError::Truncated { needed: 20, available: 8 })]
    #[case::unknown_code(&[0x09, 0, 0, 4], EapError::UnknownCode(9))]
    #[case::length_below_header(&[0x03, 0, 0, 2], EapError::Truncated { needed: 4, available: 2 })]
    #[case::zero_length(&[0x03, 0, 0, 0, 0x17], EapError::Truncated { needed: 4, available: 0 })]
    #[case::not_aka(&[0x02, 0, 0, 8, 0x12, 1, 0, 0], EapError::UnexpectedType(0x12))]
    fn rejects_malformed_messages(#[case] bytes: &[u8], #[case] expected: EapError) {
        assert_eq!(EapMessage::parse(bytes), Err(expected));
    }
}
