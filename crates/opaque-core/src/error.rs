use thiserror::Error;

/// Every way an OPAQUE operation can abort. Variants are terminal: callers
/// must restart the handshake from message 1 rather than retry in place.
#[derive(Debug, Error)]
pub enum OpaqueError {
    #[error("received group element is not a valid point")]
    InvalidPoint,

    #[error("scalar is zero or otherwise invalid")]
    InvalidScalar,

    #[error("envelope authentication failed")]
    EnvelopeAuthFailed,

    #[error("server authenticator did not verify")]
    ServerAuthFailed,

    #[error("client authenticator did not verify")]
    ClientAuthFailed,

    #[error("memory-hard key derivation failed: {0}")]
    KdfFailure(String),

    #[error("failed to lock secret memory")]
    LockFailure,

    #[error("buffer length invalid: expected {expected}, got {actual}")]
    LengthError { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, OpaqueError>;
