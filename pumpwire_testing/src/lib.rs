//! Test utilities for the `pumpwire` transport.
//!
//! [`drive_pump`] runs a pump-side handler on one half of an in-memory
//! `tokio::io::duplex` stream while the controller side writes payloads
//! through [`PacketCodec`](pumpwire::codec::PacketCodec) and collects the
//! payloads sent back. The [`vectors`] module holds captured firmware traffic
//! and key-derivation vectors shared by the test suites.
//!
//! ```rust
//! use pumpwire::config::TransportConfig;
//! use pumpwire_testing::{drive_pump, echo_pump};
//!
//! # async fn demo() -> std::io::Result<()> {
//! let replies = drive_pump(echo_pump, vec![b"ping".to_vec()], TransportConfig::default()).await?;
//! assert_eq!(replies, vec![b"ping".to_vec()]);
//! # Ok(())
//! # }
//! ```

pub mod drive;
pub mod logging;
pub mod vectors;

pub use drive::{decode_packets, drive_pump, echo_pump, encode_payloads};
pub use logging::{LoggerHandle, logger};
pub use vectors::from_hex;
