//! Thin wrappers over the Ristretto255 prime-order group: the only place in
//! this crate that touches `curve25519_dalek` directly.

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;
use rand_core::OsRng;
use sha2::{Digest, Sha512};

use crate::error::{OpaqueError, Result};

pub const SCALAR_LEN: usize = 32;
pub const POINT_LEN: usize = 32;

/// Sample a uniformly random, guaranteed-nonzero scalar.
pub fn scalar_random() -> Scalar {
    loop {
        let s = Scalar::random(&mut OsRng);
        if s != Scalar::ZERO {
            return s;
        }
    }
}

pub fn scalar_invert(s: &Scalar) -> Result<Scalar> {
    if *s == Scalar::ZERO {
        return Err(OpaqueError::InvalidScalar);
    }
    Ok(s.invert())
}

pub fn scalar_from_bytes(bytes: &[u8]) -> Result<Scalar> {
    let arr: [u8; SCALAR_LEN] = bytes
        .try_into()
        .map_err(|_| OpaqueError::LengthError { expected: SCALAR_LEN, actual: bytes.len() })?;
    Option::<Scalar>::from(Scalar::from_canonical_bytes(arr)).ok_or(OpaqueError::InvalidScalar)
}

/// Multiply a point by a scalar, rejecting results that collapse to the
/// identity (a non-generic, and therefore suspicious, outcome).
pub fn point_mul(s: &Scalar, p: &RistrettoPoint) -> Result<RistrettoPoint> {
    let result = p * s;
    if result == RistrettoPoint::identity() {
        return Err(OpaqueError::InvalidPoint);
    }
    Ok(result)
}

pub fn base_mul(s: &Scalar) -> RistrettoPoint {
    RISTRETTO_BASEPOINT_POINT * s
}

pub fn is_valid_point(bytes: &[u8]) -> bool {
    decode_point(bytes).is_ok()
}

/// Decode and validate a compressed Ristretto point, rejecting the identity.
pub fn decode_point(bytes: &[u8]) -> Result<RistrettoPoint> {
    let arr: [u8; POINT_LEN] = bytes
        .try_into()
        .map_err(|_| OpaqueError::LengthError { expected: POINT_LEN, actual: bytes.len() })?;
    let compressed = CompressedRistretto(arr);
    let point = compressed.decompress().ok_or(OpaqueError::InvalidPoint)?;
    if point == RistrettoPoint::identity() {
        return Err(OpaqueError::InvalidPoint);
    }
    Ok(point)
}

pub fn point_to_bytes(p: &RistrettoPoint) -> [u8; POINT_LEN] {
    p.compress().to_bytes()
}

pub fn scalar_to_bytes(s: &Scalar) -> [u8; SCALAR_LEN] {
    s.to_bytes()
}

/// Hash arbitrary bytes onto the group via the uniform-bytes construction:
/// SHA-512 the input to 64 bytes, then map with wide reduction.
pub fn hash_to_group(bytes: &[u8]) -> RistrettoPoint {
    let digest: [u8; 64] = Sha512::digest(bytes).into();
    RistrettoPoint::from_uniform_bytes(&digest)
}

pub fn random_bytes(n: usize) -> Vec<u8> {
    use rand_core::RngCore;
    let mut buf = vec![0u8; n];
    OsRng.fill_bytes(&mut buf);
    buf
}
