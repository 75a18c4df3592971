//! Keyed payload encoding.
//!
//! Session payloads carry values behind ASCII keys: `KEY | u16 BE length |
//! value`. A key whose value is empty is written alone, without a length.
//! Commands travel as `S0.0=<frame>,G0.0` and responses as `0.0=<frame>`.

use super::{CommandMessage, Frame, MessageError};
use crate::{
    byte_order::{read_network_u16_at, write_network_u16},
    config::TransportConfig,
};

/// Key in front of an outbound command frame.
pub const COMMAND_PREFIX: &str = "S0.0=";
/// Key closing an outbound command.
pub const COMMAND_SUFFIX: &str = ",G0.0";
/// Key in front of an inbound response frame.
pub const RESPONSE_PREFIX: &str = "0.0=";

const LENGTH_LEN: usize = 2;

/// Concatenate `entries` as keyed values.
///
/// # Examples
///
/// ```
/// use pumpwire::message::keyed::format_keys;
///
/// let payload = format_keys(&[("SP1=", &[0xaa, 0xbb][..]), (",SP2=", &[][..])]).expect("format");
/// assert_eq!(payload, b"SP1=\x00\x02\xaa\xbb,SP2=");
/// ```
///
/// # Errors
///
/// Returns [`MessageError::PayloadTooLarge`] when a value exceeds the
/// sixteen-bit length field.
pub fn format_keys(entries: &[(&str, &[u8])]) -> Result<Vec<u8>, MessageError> {
    let mut out = Vec::new();
    for (key, value) in entries {
        out.extend_from_slice(key.as_bytes());
        if value.is_empty() {
            continue;
        }
        let len = u16::try_from(value.len()).map_err(|_| MessageError::PayloadTooLarge {
            size: value.len(),
            limit: usize::from(u16::MAX),
        })?;
        out.extend_from_slice(&write_network_u16(len));
        out.extend_from_slice(value);
    }
    Ok(out)
}

/// Split `payload` into the values behind `keys`, in order.
///
/// A key at the very end of the payload yields an empty value.
///
/// # Errors
///
/// Returns [`MessageError::KeyMismatch`] when a key is missing or out of
/// order and [`MessageError::NotEnoughData`] when a value is truncated.
pub fn parse_keys<'a>(
    keys: &[&'static str],
    payload: &'a [u8],
) -> Result<Vec<&'a [u8]>, MessageError> {
    let mut rest = payload;
    let mut values = Vec::with_capacity(keys.len());
    for &key in keys {
        rest = rest
            .strip_prefix(key.as_bytes())
            .ok_or(MessageError::KeyMismatch { expected: key })?;
        if rest.is_empty() {
            values.push(rest);
            continue;
        }
        let available = rest.len();
        let len = usize::from(read_network_u16_at(rest, 0).ok_or(MessageError::NotEnoughData {
            needed: LENGTH_LEN,
            available,
        })?);
        let end = LENGTH_LEN + len;
        let value = rest.get(LENGTH_LEN..end).ok_or(MessageError::NotEnoughData {
            needed: end,
            available,
        })?;
        values.push(value);
        rest = &rest[end..];
    }
    Ok(values)
}

/// Wrap an encoded command for transmission inside a session payload.
///
/// # Errors
///
/// Returns any [`MessageError`] raised while encoding `command`.
pub fn wrap_command(command: &CommandMessage) -> Result<Vec<u8>, MessageError> {
    let encoded = command.encode()?;
    format_keys(&[(COMMAND_PREFIX, &encoded), (COMMAND_SUFFIX, &[])])
}

/// Extract and decode the response frame from a decrypted session payload,
/// applying the CRC policy of `config`.
///
/// # Errors
///
/// Returns [`MessageError::KeyMismatch`] when the response key is absent and
/// any error raised while decoding the command frame.
pub fn unwrap_response(
    payload: &[u8],
    config: &TransportConfig,
) -> Result<CommandMessage, MessageError> {
    let values = parse_keys(&[RESPONSE_PREFIX], payload)?;
    let frame = values.first().copied().unwrap_or_default();
    CommandMessage::decode_with(frame, config.command_crc)
}
