//! Session establishment: Milenage key derivation, EAP-AKA messages and the
//! negotiation that ties them together.

pub mod eap;
pub mod milenage;
pub mod negotiator;

pub use eap::{EapAttribute, EapCode, EapError, EapMessage};
pub use milenage::{Milenage, MilenageError, SessionMaterial};
pub use negotiator::{SessionError, SessionKeys, SessionNegotiator, SessionOutcome, SessionParams};
