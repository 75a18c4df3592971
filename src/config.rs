//! Configuration shared by the splitter, the stream codec, and the framer.

use std::num::NonZeroUsize;

use crate::{message::CrcCheck, packet::MAX_PAYLOAD_SIZE};

/// Payload limits and checksum policy for one pump link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransportConfig {
    /// Largest payload the splitter accepts. Never above
    /// [`MAX_PAYLOAD_SIZE`], which keeps fragment counts within the wire limit.
    pub max_payload_size: NonZeroUsize,
    /// Whether command frames unwrapped from responses have their CRC-16
    /// verified.
    pub command_crc: CrcCheck,
}

const DEFAULT_PAYLOAD_LIMIT: NonZeroUsize = NonZeroUsize::MIN.saturating_add(MAX_PAYLOAD_SIZE - 1);

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_PAYLOAD_LIMIT,
            command_crc: CrcCheck::Verify,
        }
    }
}

impl TransportConfig {
    /// Build a configuration capping payloads at `limit` bytes.
    ///
    /// Returns `None` when `limit` is zero or above [`MAX_PAYLOAD_SIZE`].
    ///
    /// # Examples
    ///
    /// ```
    /// use pumpwire::config::TransportConfig;
    ///
    /// assert!(TransportConfig::with_payload_limit(64).is_some());
    /// assert!(TransportConfig::with_payload_limit(301).is_none());
    /// ```
    #[must_use]
    pub fn with_payload_limit(limit: usize) -> Option<Self> {
        if limit > MAX_PAYLOAD_SIZE {
            return None;
        }
        Some(Self {
            max_payload_size: NonZeroUsize::new(limit)?,
            ..Self::default()
        })
    }

    /// Replace the command checksum policy.
    #[must_use]
    pub const fn with_command_crc(mut self, command_crc: CrcCheck) -> Self {
        self.command_crc = command_crc;
        self
    }
}
