//! Stream codec over twenty-byte BLE packets.
//!
//! [`PacketCodec`] plugs the splitter and joiner into `tokio_util`'s
//! [`Decoder`] and [`Encoder`] traits so a byte stream of concatenated packets
//! can be wrapped in `FramedRead`/`FramedWrite`. Each decoded item is one
//! complete, CRC-verified payload.
//!
//! A reassembly error discards the payload in progress; decoding resumes with
//! the next packet, which must be a first packet.

use std::io;

use bytes::{BufMut, Bytes, BytesMut};
use log::debug;
use tokio_util::codec::{Decoder, Encoder};

use crate::{
    config::TransportConfig,
    error::{EofError, TransportError},
    fragment::{FragmentStatus, Joiner, Splitter},
    packet::PACKET_SIZE,
};

/// Splits outbound payloads into packets and joins inbound packets.
#[derive(Debug, Default)]
pub struct PacketCodec {
    splitter: Splitter,
    joiner: Option<Joiner>,
}

impl PacketCodec {
    /// Construct a codec honouring the payload limit of `config`.
    #[must_use]
    pub fn new(config: &TransportConfig) -> Self {
        Self {
            splitter: Splitter::from_config(config),
            joiner: None,
        }
    }

    /// Whether a payload is partially received.
    #[must_use]
    pub const fn is_assembling(&self) -> bool { self.joiner.is_some() }

    fn accept(&mut self, packet: &[u8]) -> Result<Option<Bytes>, TransportError> {
        let joiner = match self.joiner.take() {
            None => Joiner::new(packet)?,
            Some(mut joiner) => {
                if joiner.accumulate(packet)? == FragmentStatus::Incomplete {
                    self.joiner = Some(joiner);
                    return Ok(None);
                }
                joiner
            }
        };
        if !joiner.is_complete() {
            self.joiner = Some(joiner);
            return Ok(None);
        }
        let payload = joiner.finalize()?;
        debug!("payload joined: len={}", payload.len());
        Ok(Some(Bytes::from(payload)))
    }

    fn write(&self, payload: &[u8], dst: &mut BytesMut) -> Result<(), TransportError> {
        let batch = self.splitter.split(payload)?;
        dst.reserve(batch.len() * PACKET_SIZE);
        for frame in batch {
            dst.put_slice(&frame);
        }
        Ok(())
    }
}

impl Decoder for PacketCodec {
    type Item = Bytes;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while src.len() >= PACKET_SIZE {
            let packet = src.split_to(PACKET_SIZE);
            if let Some(payload) = self.accept(&packet)? {
                return Ok(Some(payload));
            }
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload) = self.decode(src)? {
            return Ok(Some(payload));
        }
        if !src.is_empty() {
            let bytes_received = src.len();
            src.clear();
            self.joiner = None;
            return Err(TransportError::from(EofError::MidPacket { bytes_received }).into());
        }
        match self.joiner.take() {
            Some(joiner) => Err(TransportError::from(EofError::MidPayload {
                expected_index: joiner.expected_index(),
            })
            .into()),
            None => Ok(None),
        }
    }
}

impl Encoder<Bytes> for PacketCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.write(&item, dst).map_err(io::Error::from)
    }
}

impl<'a> Encoder<&'a [u8]> for PacketCodec {
    type Error = io::Error;

    fn encode(&mut self, item: &'a [u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.write(item, dst).map_err(io::Error::from)
    }
}
