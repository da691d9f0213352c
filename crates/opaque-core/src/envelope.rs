//! Authenticated envelope: seals the client's long-term secrets under the
//! password-derived key `rw`, with an additional caller-chosen cleartext
//! associated-data region.

use crate::error::{OpaqueError, Result};
use crate::primitives::{self, HASH_LEN};
use crate::secret::Locked;

const NONCE_LEN: usize = 32;
const TAG_LEN: usize = HASH_LEN;
const EXPORT_KEY_LEN: usize = 32;

pub struct Sealed {
    pub envelope: Vec<u8>,
    pub export_key: [u8; EXPORT_KEY_LEN],
}

pub struct Opened {
    pub sec_env: Vec<u8>,
    pub clr_env: Vec<u8>,
    pub export_key: [u8; EXPORT_KEY_LEN],
}

/// The expanded pad/HMAC-key/export-key buffer carries the same sensitivity
/// as `rw` itself, so it is held locked for the span of seal/open.
///
/// `rw` is used directly as the HKDF PRK (Expand-only, no Extract): it is
/// already uniform output of the memory-hard KDF, and re-extracting it
/// would derive a different keystream than any spec-conformant peer.
fn expand_keys(rw: &[u8], nonce: &[u8], sec_env_len: usize) -> Result<Locked<Vec<u8>>> {
    let mut info = Vec::with_capacity(nonce.len() + 4);
    info.extend_from_slice(nonce);
    info.extend_from_slice(b"EnvU");
    let mut keys = vec![0u8; sec_env_len + HASH_LEN + EXPORT_KEY_LEN];
    primitives::hkdf_expand_from_prk(rw, &info, &mut keys)?;
    Locked::new(keys)
}

/// `Seal`: produce `nonce || ciphertext || clr_env || tag` and the
/// accompanying `export_key`.
pub fn seal(rw: &[u8], sec_env: &[u8], clr_env: &[u8]) -> Result<Sealed> {
    let nonce: [u8; NONCE_LEN] = crate::group::random_bytes(NONCE_LEN).try_into().unwrap();
    let keys = expand_keys(rw, &nonce, sec_env.len())?;

    let pad = &keys[..sec_env.len()];
    let hmac_key = &keys[sec_env.len()..sec_env.len() + HASH_LEN];
    let export_key: [u8; EXPORT_KEY_LEN] = keys[sec_env.len() + HASH_LEN..].try_into().unwrap();

    let ciphertext: Vec<u8> = sec_env.iter().zip(pad.iter()).map(|(a, b)| a ^ b).collect();

    let mut authed = Vec::with_capacity(NONCE_LEN + ciphertext.len() + clr_env.len());
    authed.extend_from_slice(&nonce);
    authed.extend_from_slice(&ciphertext);
    authed.extend_from_slice(clr_env);
    let tag = primitives::hmac_sha256(hmac_key, &authed)?;

    let mut envelope = authed;
    envelope.extend_from_slice(&tag);

    Ok(Sealed { envelope, export_key })
}

/// `Open`: verify and unseal. `sec_env_len`/`clr_env_len` must be known by
/// the caller (they are carried as metadata alongside the envelope).
pub fn open(rw: &[u8], envelope: &[u8], sec_env_len: usize, clr_env_len: usize) -> Result<Opened> {
    let expected_len = NONCE_LEN + sec_env_len + clr_env_len + TAG_LEN;
    if envelope.len() != expected_len {
        return Err(OpaqueError::LengthError { expected: expected_len, actual: envelope.len() });
    }

    let nonce = &envelope[..NONCE_LEN];
    let ciphertext = &envelope[NONCE_LEN..NONCE_LEN + sec_env_len];
    let clr_env = &envelope[NONCE_LEN + sec_env_len..NONCE_LEN + sec_env_len + clr_env_len];
    let tag = &envelope[NONCE_LEN + sec_env_len + clr_env_len..];
    let authed = &envelope[..NONCE_LEN + sec_env_len + clr_env_len];

    let keys = expand_keys(rw, nonce, sec_env_len)?;
    let pad = &keys[..sec_env_len];
    let hmac_key = &keys[sec_env_len..sec_env_len + HASH_LEN];
    let export_key: [u8; EXPORT_KEY_LEN] = keys[sec_env_len + HASH_LEN..].try_into().unwrap();

    primitives::hmac_sha256_verify(hmac_key, authed, tag).map_err(|_| OpaqueError::EnvelopeAuthFailed)?;

    let sec_env: Vec<u8> = ciphertext.iter().zip(pad.iter()).map(|(a, b)| a ^ b).collect();

    Ok(Opened { sec_env, clr_env: clr_env.to_vec(), export_key })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_then_open_roundtrips() {
        let rw = [9u8; 32];
        let sec_env = b"p_u || P_u || P_s secret bytes..".to_vec();
        let clr_env = b"ClrEnv\0".to_vec();
        let sealed = seal(&rw, &sec_env, &clr_env).unwrap();
        let opened = open(&rw, &sealed.envelope, sec_env.len(), clr_env.len()).unwrap();
        assert_eq!(opened.sec_env, sec_env);
        assert_eq!(opened.clr_env, clr_env);
        assert_eq!(opened.export_key, sealed.export_key);
    }

    #[test]
    fn wrong_rw_fails_to_open() {
        let rw = [9u8; 32];
        let sec_env = b"long term secret key material..".to_vec();
        let sealed = seal(&rw, &sec_env, b"").unwrap();
        let wrong_rw = [8u8; 32];
        assert!(open(&wrong_rw, &sealed.envelope, sec_env.len(), 0).is_err());
    }

    #[test]
    fn tampered_envelope_fails_to_open() {
        let rw = [9u8; 32];
        let sec_env = b"long term secret key material..".to_vec();
        let sealed = seal(&rw, &sec_env, b"").unwrap();
        let mut tampered = sealed.envelope.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 1;
        assert!(open(&rw, &tampered, sec_env.len(), 0).is_err());
    }
}
