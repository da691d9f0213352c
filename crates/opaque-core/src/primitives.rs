//! Hash, MAC, KDF building blocks composed by the OPRF and envelope layers.

use argon2::{Algorithm, Argon2, Params, Version};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::KdfParams;
use crate::error::{OpaqueError, Result};

pub const HASH_LEN: usize = 32;

/// "Interactive" cost profile: the same order of magnitude libsodium uses
/// for `crypto_pwhash` with `OPSLIMIT_INTERACTIVE`/`MEMLIMIT_INTERACTIVE`.
pub const KDF_MEMORY_COST_KIB: u32 = 65536;
pub const KDF_TIME_COST: u32 = 2;
pub const KDF_PARALLELISM: u32 = 1;

type HmacSha256 = Hmac<Sha256>;

/// `rw0 = keyed_hash(key, pw || h, 32)`.
///
/// `blake3::keyed_hash` requires an exact 32-byte key; an absent or
/// variable-length caller key is first folded down with an unkeyed hash.
pub fn keyed_hash(key: Option<&[u8]>, message: &[u8]) -> [u8; HASH_LEN] {
    let fixed_key = match key {
        Some(k) if !k.is_empty() => *blake3::hash(k).as_bytes(),
        _ => [0u8; HASH_LEN],
    };
    *blake3::keyed_hash(&fixed_key, message).as_bytes()
}

/// Memory-hard password hash (`rw = memory_hard_kdf(rw0, ...)`). Cost
/// parameters are caller-tunable via `KdfParams` rather than hardcoded, so a
/// deployment can raise the memory cost above the "interactive" default.
pub fn memory_hard_kdf(input: &[u8], salt: &[u8], params: KdfParams) -> Result<[u8; HASH_LEN]> {
    let argon_params = Params::new(params.m_cost_kib, params.t_cost, params.p_cost, Some(HASH_LEN))
        .map_err(|e| OpaqueError::KdfFailure(e.to_string()))?;
    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);
    let mut out = [0u8; HASH_LEN];
    argon
        .hash_password_into(input, salt, &mut out)
        .map_err(|e| OpaqueError::KdfFailure(e.to_string()))?;
    Ok(out)
}

/// `HKDF-Extract` then `HKDF-Expand` in one call, for the 3-DH key schedule
/// where the input is a raw DH product rather than an already-uniform key.
pub fn hkdf_expand(ikm: &[u8], salt: Option<&[u8]>, info: &[u8], out: &mut [u8]) -> Result<()> {
    let hk = Hkdf::<Sha256>::new(salt, ikm);
    hk.expand(info, out)
        .map_err(|_| OpaqueError::LengthError { expected: out.len(), actual: 0 })
}

/// `HKDF-Expand` only, with `prk` used directly as the pseudorandom key.
/// The envelope derivation's PRK is `rw`, which is already uniform output
/// of the memory-hard KDF, so it must not be re-extracted.
pub fn hkdf_expand_from_prk(prk: &[u8], info: &[u8], out: &mut [u8]) -> Result<()> {
    let hk = Hkdf::<Sha256>::from_prk(prk).map_err(|_| OpaqueError::LengthError {
        expected: HASH_LEN,
        actual: prk.len(),
    })?;
    hk.expand(info, out).map_err(|_| OpaqueError::LengthError { expected: out.len(), actual: 0 })
}

pub fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<[u8; HASH_LEN]> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|_| OpaqueError::LengthError { expected: HASH_LEN, actual: key.len() })?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().into())
}

/// Constant-time HMAC verification. Recomputes the tag and compares with
/// `subtle` rather than `mac.verify_slice` directly, so the no-short-circuit
/// requirement on this path is explicit rather than inherited incidentally.
pub fn hmac_sha256_verify(key: &[u8], message: &[u8], tag: &[u8]) -> Result<()> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|_| OpaqueError::LengthError { expected: HASH_LEN, actual: key.len() })?;
    mac.update(message);
    let expected = mac.finalize().into_bytes();
    let ok: bool = expected.as_slice().ct_eq(tag).into();
    if ok {
        Ok(())
    } else {
        Err(OpaqueError::EnvelopeAuthFailed)
    }
}

pub fn sha256(message: &[u8]) -> [u8; HASH_LEN] {
    use sha2::Digest;
    Sha256::digest(message).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_hash_is_deterministic_and_key_sensitive() {
        let a = keyed_hash(Some(b"pepper"), b"message");
        let b = keyed_hash(Some(b"pepper"), b"message");
        let c = keyed_hash(Some(b"different"), b"message");
        let d = keyed_hash(None, b"message");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn memory_hard_kdf_is_deterministic() {
        let salt = [0u8; 32];
        let params = KdfParams::default();
        let a = memory_hard_kdf(b"rw0 bytes", &salt, params).unwrap();
        let b = memory_hard_kdf(b"rw0 bytes", &salt, params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn memory_hard_kdf_respects_custom_cost_params() {
        let salt = [0u8; 32];
        let low_cost = KdfParams { m_cost_kib: 8 * 1024, t_cost: 1, p_cost: 1 };
        let default_cost = KdfParams::default();
        let a = memory_hard_kdf(b"rw0 bytes", &salt, low_cost).unwrap();
        let b = memory_hard_kdf(b"rw0 bytes", &salt, default_cost).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn hmac_verify_rejects_tamper() {
        let key = [7u8; 32];
        let tag = hmac_sha256(&key, b"transcript").unwrap();
        assert!(hmac_sha256_verify(&key, b"transcript", &tag).is_ok());
        let mut bad = tag;
        bad[0] ^= 1;
        assert!(hmac_sha256_verify(&key, b"transcript", &bad).is_err());
    }
}
