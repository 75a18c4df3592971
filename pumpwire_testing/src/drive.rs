//! In-memory drivers for exercising [`PacketCodec`] over a byte stream.

use std::io;

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use pumpwire::{codec::PacketCodec, config::TransportConfig};
use tokio::io::{DuplexStream, duplex};
use tokio_util::codec::{Decoder, Encoder, Framed, FramedRead, FramedWrite};

/// Duplex buffer size; small enough to force partial reads of packets.
const DEFAULT_CAPACITY: usize = 64;

/// Run `pump_fn` on the pump half of a duplex stream while the controller
/// half sends `payloads` and collects every payload the pump writes back.
///
/// The controller shuts down its write half after the last payload, so the
/// pump sees a clean end of stream. If the pump task panics, the panic
/// message is surfaced as an `io::Error` beginning with `"pump task failed"`.
///
/// # Errors
///
/// Returns any I/O or transport error raised on the controller side and the
/// panic of the pump task.
pub async fn drive_pump<F, Fut>(
    pump_fn: F,
    payloads: Vec<Vec<u8>>,
    config: TransportConfig,
) -> io::Result<Vec<Vec<u8>>>
where
    F: FnOnce(DuplexStream) -> Fut,
    Fut: Future<Output = ()> + Send,
{
    let (controller, pump) = duplex(DEFAULT_CAPACITY);

    let pump_fut = async {
        use futures::FutureExt as _;
        std::panic::AssertUnwindSafe(pump_fn(pump))
            .catch_unwind()
            .await
            .map_err(|panic| {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_owned());
                io::Error::other(format!("pump task failed: {message}"))
            })
    };

    let controller_fut = async {
        let (reader, writer) = tokio::io::split(controller);
        let send = async {
            let mut sink = FramedWrite::new(writer, PacketCodec::new(&config));
            for payload in payloads {
                sink.send(Bytes::from(payload)).await?;
            }
            SinkExt::<Bytes>::close(&mut sink).await
        };
        let receive = async {
            let mut stream = FramedRead::new(reader, PacketCodec::new(&config));
            let mut replies = Vec::new();
            while let Some(reply) = stream.next().await {
                replies.push(reply?.to_vec());
            }
            io::Result::Ok(replies)
        };
        let ((), replies) = tokio::try_join!(send, receive)?;
        io::Result::Ok(replies)
    };

    let ((), replies) = tokio::try_join!(pump_fut, controller_fut)?;
    Ok(replies)
}

/// Pump handler that sends every payload it receives straight back.
///
/// Stops at end of stream or on the first transport error.
pub async fn echo_pump(stream: DuplexStream) {
    let mut framed = Framed::new(stream, PacketCodec::default());
    while let Some(Ok(payload)) = framed.next().await {
        if framed.send(payload).await.is_err() {
            break;
        }
    }
}

/// Encode every payload into one contiguous packet stream.
///
/// # Errors
///
/// Returns an error if the codec rejects a payload.
pub fn encode_payloads(config: &TransportConfig, payloads: &[&[u8]]) -> io::Result<BytesMut> {
    let mut codec = PacketCodec::new(config);
    let mut buf = BytesMut::new();
    for payload in payloads {
        codec.encode(*payload, &mut buf)?;
    }
    Ok(buf)
}

/// Decode every complete payload from `bytes`, treating the end of the buffer
/// as the end of the stream.
///
/// # Errors
///
/// Returns the first decoding error, including a premature end of stream.
pub fn decode_packets(config: &TransportConfig, bytes: &[u8]) -> io::Result<Vec<Bytes>> {
    let mut codec = PacketCodec::new(config);
    let mut buf = BytesMut::from(bytes);
    let mut payloads = Vec::new();
    while let Some(payload) = codec.decode_eof(&mut buf)? {
        payloads.push(payload);
    }
    Ok(payloads)
}
