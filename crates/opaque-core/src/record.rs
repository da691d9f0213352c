//! Packed, explicit byte layouts for every record that crosses the core's
//! boundary: no padding, no host struct alignment, little-endian length
//! fields. Mirrors the manual byte-offset `to_bytes`/`from_bytes` pattern
//! used for the encrypted vault header this crate was built out of.

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;

use crate::error::{OpaqueError, Result};
use crate::group::{self, POINT_LEN, SCALAR_LEN};
use crate::secret::Locked;

const LEN_FIELD: usize = 8;

fn read_len(buf: &[u8]) -> Result<u64> {
    let arr: [u8; LEN_FIELD] =
        buf.try_into().map_err(|_| OpaqueError::LengthError { expected: LEN_FIELD, actual: buf.len() })?;
    Ok(u64::from_le_bytes(arr))
}

/// The sealed-blob byte string produced by `envelope::seal`, carried
/// opaquely by every record below.
pub type EnvelopeBytes = Vec<u8>;

/// Persisted once per user at registration, read on every login. `k_s`/`p_s`
/// are the server's long-term OPRF key and long-term DH scalar: scoped
/// secrets for as long as this record is held in memory.
pub struct UserRecord {
    pub k_s: Locked<Scalar>,
    pub p_s: Locked<Scalar>,
    pub p_u_pub: RistrettoPoint,
    pub p_s_pub: RistrettoPoint,
    pub extra_len: u64,
    pub envelope: EnvelopeBytes,
}

impl UserRecord {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SCALAR_LEN * 2 + POINT_LEN * 2 + LEN_FIELD + self.envelope.len());
        out.extend_from_slice(&group::scalar_to_bytes(&self.k_s));
        out.extend_from_slice(&group::scalar_to_bytes(&self.p_s));
        out.extend_from_slice(&group::point_to_bytes(&self.p_u_pub));
        out.extend_from_slice(&group::point_to_bytes(&self.p_s_pub));
        out.extend_from_slice(&self.extra_len.to_le_bytes());
        out.extend_from_slice(&self.envelope);
        out
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let header_len = SCALAR_LEN * 2 + POINT_LEN * 2 + LEN_FIELD;
        if buf.len() < header_len {
            return Err(OpaqueError::LengthError { expected: header_len, actual: buf.len() });
        }
        let mut offset = 0;
        let k_s = group::scalar_from_bytes(&buf[offset..offset + SCALAR_LEN])?;
        offset += SCALAR_LEN;
        let p_s = group::scalar_from_bytes(&buf[offset..offset + SCALAR_LEN])?;
        offset += SCALAR_LEN;
        let p_u_pub = group::decode_point(&buf[offset..offset + POINT_LEN])?;
        offset += POINT_LEN;
        let p_s_pub = group::decode_point(&buf[offset..offset + POINT_LEN])?;
        offset += POINT_LEN;
        let extra_len = read_len(&buf[offset..offset + LEN_FIELD])?;
        offset += LEN_FIELD;
        Ok(Self {
            k_s: Locked::new(k_s)?,
            p_s: Locked::new(p_s)?,
            p_u_pub,
            p_s_pub,
            extra_len,
            envelope: buf[offset..].to_vec(),
        })
    }
}

/// Login message 1 (client -> server), public half.
pub struct UserSessionPublic {
    pub alpha: RistrettoPoint,
    pub x_u: RistrettoPoint,
    pub nonce_u: [u8; 32],
}

impl UserSessionPublic {
    pub const LEN: usize = POINT_LEN * 2 + 32;

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[..32].copy_from_slice(&group::point_to_bytes(&self.alpha));
        out[32..64].copy_from_slice(&group::point_to_bytes(&self.x_u));
        out[64..96].copy_from_slice(&self.nonce_u);
        out
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() != Self::LEN {
            return Err(OpaqueError::LengthError { expected: Self::LEN, actual: buf.len() });
        }
        Ok(Self {
            alpha: group::decode_point(&buf[..32])?,
            x_u: group::decode_point(&buf[32..64])?,
            nonce_u: buf[64..96].try_into().unwrap(),
        })
    }
}

/// Login message 2 (server -> client).
pub struct ServerSessionResponse {
    pub beta: RistrettoPoint,
    pub x_s: RistrettoPoint,
    pub nonce_s: [u8; 32],
    pub auth: [u8; 32],
    pub extra_len: u64,
    pub envelope: EnvelopeBytes,
}

impl ServerSessionResponse {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(POINT_LEN * 2 + 32 + 32 + LEN_FIELD + self.envelope.len());
        out.extend_from_slice(&group::point_to_bytes(&self.beta));
        out.extend_from_slice(&group::point_to_bytes(&self.x_s));
        out.extend_from_slice(&self.nonce_s);
        out.extend_from_slice(&self.auth);
        out.extend_from_slice(&self.extra_len.to_le_bytes());
        out.extend_from_slice(&self.envelope);
        out
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let header_len = POINT_LEN * 2 + 32 + 32 + LEN_FIELD;
        if buf.len() < header_len {
            return Err(OpaqueError::LengthError { expected: header_len, actual: buf.len() });
        }
        let mut offset = 0;
        let beta = group::decode_point(&buf[offset..offset + POINT_LEN])?;
        offset += POINT_LEN;
        let x_s = group::decode_point(&buf[offset..offset + POINT_LEN])?;
        offset += POINT_LEN;
        let nonce_s: [u8; 32] = buf[offset..offset + 32].try_into().unwrap();
        offset += 32;
        let auth: [u8; 32] = buf[offset..offset + 32].try_into().unwrap();
        offset += 32;
        let extra_len = read_len(&buf[offset..offset + LEN_FIELD])?;
        offset += LEN_FIELD;
        Ok(Self { beta, x_s, nonce_s, auth, extra_len, envelope: buf[offset..].to_vec() })
    }
}

/// Private-registration step 2 (server -> client), public half.
pub struct RegistrationPublic {
    pub beta: RistrettoPoint,
    pub p_s_pub: RistrettoPoint,
}

impl RegistrationPublic {
    pub const LEN: usize = POINT_LEN * 2;

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[..32].copy_from_slice(&group::point_to_bytes(&self.beta));
        out[32..64].copy_from_slice(&group::point_to_bytes(&self.p_s_pub));
        out
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() != Self::LEN {
            return Err(OpaqueError::LengthError { expected: Self::LEN, actual: buf.len() });
        }
        Ok(Self { beta: group::decode_point(&buf[..32])?, p_s_pub: group::decode_point(&buf[32..64])? })
    }
}

/// Private-registration step 2 (server-held secret, fed back in at step 4).
pub struct RegistrationSecret {
    pub k_s: Locked<Scalar>,
    pub p_s: Locked<Scalar>,
}

/// Private-registration step 3 (client -> server): the not-yet-complete
/// user record, missing `k_s`/`p_s`/`p_s_pub` which the server fills in.
pub struct RegistrationUpload {
    pub p_u_pub: RistrettoPoint,
    pub extra_len: u64,
    pub envelope: EnvelopeBytes,
}

impl RegistrationUpload {
    pub fn into_user_record(self, secret: RegistrationSecret) -> UserRecord {
        let p_s_pub = group::base_mul(&secret.p_s);
        UserRecord {
            k_s: secret.k_s,
            p_s: secret.p_s,
            p_u_pub: self.p_u_pub,
            p_s_pub,
            extra_len: self.extra_len,
            envelope: self.envelope,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{base_mul, scalar_random};

    #[test]
    fn user_record_roundtrips() {
        let record = UserRecord {
            k_s: Locked::new(scalar_random()).unwrap(),
            p_s: Locked::new(scalar_random()).unwrap(),
            p_u_pub: base_mul(&scalar_random()),
            p_s_pub: base_mul(&scalar_random()),
            extra_len: 5,
            envelope: vec![0xAB; 40],
        };
        let bytes = record.to_bytes();
        let parsed = UserRecord::from_bytes(&bytes).unwrap();
        assert_eq!(group::scalar_to_bytes(&record.k_s), group::scalar_to_bytes(&parsed.k_s));
        assert_eq!(parsed.extra_len, 5);
        assert_eq!(parsed.envelope, vec![0xAB; 40]);
    }

    #[test]
    fn user_session_public_roundtrips() {
        let public = UserSessionPublic {
            alpha: base_mul(&scalar_random()),
            x_u: base_mul(&scalar_random()),
            nonce_u: [7u8; 32],
        };
        let bytes = public.to_bytes();
        let parsed = UserSessionPublic::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.nonce_u, [7u8; 32]);
    }

    #[test]
    fn rejects_short_buffers() {
        assert!(UserSessionPublic::from_bytes(&[0u8; 10]).is_err());
    }
}
