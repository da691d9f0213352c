//! Triple Diffie-Hellman: each party combines its long-term and ephemeral
//! scalars with the peer's long-term and ephemeral points into a shared
//! secret, then stretches that secret into the session's key bundle.

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::Result;
use crate::group;
use crate::primitives;
use crate::secret::Locked;

pub const KEY_LEN: usize = 32;

/// The session key plus the four sub-keys HKDF stretches it into. All five
/// are zeroized both explicitly (by callers, once consumed) and on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeyBundle {
    pub sk: [u8; KEY_LEN],
    pub km2: [u8; KEY_LEN],
    pub km3: [u8; KEY_LEN],
    pub ke2: [u8; KEY_LEN],
    pub ke3: [u8; KEY_LEN],
}

/// `sec` (the 96-byte concatenation of the three DH products) and the raw
/// HKDF output both carry key material and are held in locked memory for
/// the span of this call; only the typed, zeroize-on-drop `KeyBundle`
/// escapes to the caller.
fn derive_keys(sec: &Locked<[u8; 96]>, info: &[u8; 32]) -> Result<KeyBundle> {
    let mut out = Locked::new([0u8; KEY_LEN * 5])?;
    primitives::hkdf_expand(&**sec, None, info, &mut *out)?;
    Ok(KeyBundle {
        sk: out[0..32].try_into().unwrap(),
        km2: out[32..64].try_into().unwrap(),
        km3: out[64..96].try_into().unwrap(),
        ke2: out[96..128].try_into().unwrap(),
        ke3: out[128..160].try_into().unwrap(),
    })
}

/// Server side: `ix = p_s` (server long-term), `ex = x_s` (server
/// ephemeral), `Ip = P_u` (client long-term public), `Ep = X_u` (client
/// ephemeral public).
pub fn server_3dh(
    ix: &Scalar,
    ex: &Scalar,
    ip: &RistrettoPoint,
    ep: &RistrettoPoint,
    info: &[u8; 32],
) -> Result<KeyBundle> {
    let mut sec = [0u8; 96];
    sec[0..32].copy_from_slice(&group::point_to_bytes(&group::point_mul(ix, ep)?));
    sec[32..64].copy_from_slice(&group::point_to_bytes(&group::point_mul(ex, ip)?));
    sec[64..96].copy_from_slice(&group::point_to_bytes(&group::point_mul(ex, ep)?));
    derive_keys(&Locked::new(sec)?, info)
}

/// Client side: `ix = p_u` (client long-term), `ex = x_u` (client
/// ephemeral), `Ip = P_s` (server long-term public), `Ep = X_s` (server
/// ephemeral public). Note the first two terms are in swapped order
/// relative to `server_3dh`; both sides land on the same two values in the
/// same concatenation positions.
pub fn user_3dh(
    ix: &Scalar,
    ex: &Scalar,
    ip: &RistrettoPoint,
    ep: &RistrettoPoint,
    info: &[u8; 32],
) -> Result<KeyBundle> {
    let mut sec = [0u8; 96];
    sec[0..32].copy_from_slice(&group::point_to_bytes(&group::point_mul(ex, ip)?));
    sec[32..64].copy_from_slice(&group::point_to_bytes(&group::point_mul(ix, ep)?));
    sec[64..96].copy_from_slice(&group::point_to_bytes(&group::point_mul(ex, ep)?));
    derive_keys(&Locked::new(sec)?, info)
}

/// `info = SHA-256(nonceU || nonceS || idU || idS)`.
pub fn calc_info(nonce_u: &[u8; 32], nonce_s: &[u8; 32], id_u: &[u8], id_s: &[u8]) -> [u8; 32] {
    let mut message = Vec::with_capacity(64 + id_u.len() + id_s.len());
    message.extend_from_slice(nonce_u);
    message.extend_from_slice(nonce_s);
    message.extend_from_slice(id_u);
    message.extend_from_slice(id_s);
    primitives::sha256(&message)
}
