//! OPAQUE asymmetric password-authenticated key exchange protocol core.
//!
//! This crate implements the protocol engine only: the oblivious PRF, the
//! authenticated envelope, the triple Diffie-Hellman key schedule, the
//! transcript-driven mutual authentication, and the registration/login
//! state machines built from them. Transport, persistence of the resulting
//! user record, and identity policy are the caller's responsibility.

pub mod config;
pub mod envelope;
pub mod error;
pub mod group;
pub mod keyschedule;
pub mod login;
pub mod oprf;
pub mod primitives;
pub mod record;
pub mod registration;
pub mod secret;
pub mod transcript;

pub use config::{Identities, KdfParams, ProtocolInfo};
pub use error::{OpaqueError, Result};
pub use record::UserRecord;
