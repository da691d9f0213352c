//! Canonical protocol transcript: a running SHA-256 over every message
//! field in a fixed order, used to produce and verify the two explicit
//! authenticators.
//!
//! The server needs the transcript twice: once to MAC its own response
//! (`auth`, covering everything up to `einfo2`), and once more, later, to
//! verify the client's `auth_u` (covering the rest, `info3`/`einfo3`). It
//! saves the hasher state after the first use instead of replaying the
//! whole transcript from scratch.

use sha2::{Digest, Sha256};

/// Hasher state snapshotted right before the optional `info3`/`einfo3` tail.
pub struct Transcript(Sha256);

#[allow(clippy::too_many_arguments)]
pub fn build_through_einfo2(
    alpha: &[u8],
    nonce_u: &[u8],
    info1: &[u8],
    x_u: &[u8],
    beta: &[u8],
    envelope: &[u8],
    nonce_s: &[u8],
    info2: &[u8],
    x_s: &[u8],
    einfo2: &[u8],
) -> Transcript {
    let mut h = Sha256::new();
    h.update(alpha);
    h.update(nonce_u);
    h.update(info1);
    h.update(x_u);
    h.update(beta);
    h.update(envelope);
    h.update(nonce_s);
    h.update(info2);
    h.update(x_s);
    h.update(einfo2);
    Transcript(h)
}

impl Transcript {
    /// Finalize without the optional client-info tail: this is what the
    /// server authenticator (`auth`, keyed by `Km2`) covers.
    pub fn finalize_server_auth(&self) -> [u8; 32] {
        self.0.clone().finalize().into()
    }

    /// Consume the snapshot, append `info3`/`einfo3`, and finalize: this is
    /// what the client authenticator (`auth_u`, keyed by `Km3`) covers.
    pub fn finalize_client_auth(self, info3: &[u8], einfo3: &[u8]) -> [u8; 32] {
        let mut h = self.0;
        h.update(info3);
        h.update(einfo3);
        h.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_auth_ignores_client_info_tail() {
        let t1 = build_through_einfo2(b"a", b"b", b"", b"c", b"d", b"e", b"f", b"", b"g", b"");
        let t2 = build_through_einfo2(b"a", b"b", b"", b"c", b"d", b"e", b"f", b"", b"g", b"");
        assert_eq!(t1.finalize_server_auth(), t2.finalize_server_auth());
    }

    #[test]
    fn client_auth_changes_with_info3() {
        let t1 = build_through_einfo2(b"a", b"b", b"", b"c", b"d", b"e", b"f", b"", b"g", b"");
        let t2 = build_through_einfo2(b"a", b"b", b"", b"c", b"d", b"e", b"f", b"", b"g", b"");
        let h1 = t1.finalize_client_auth(b"info3", b"");
        let h2 = t2.finalize_client_auth(b"different", b"");
        assert_ne!(h1, h2);
    }
}
