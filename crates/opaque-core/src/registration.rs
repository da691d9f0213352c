//! The two registration state machines: server-knows-everything (one
//! server-side call) and the private, server-never-sees-secrets variant
//! spread over four messages.

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use zeroize::Zeroize;

use crate::config::{KdfParams, MAX_EXTRA_LEN};
use crate::envelope;
use crate::error::{OpaqueError, Result};
use crate::group;
use crate::oprf;
use crate::record::{RegistrationPublic, RegistrationSecret, RegistrationUpload, UserRecord};
use crate::secret::Locked;

pub const EXPORT_KEY_LEN: usize = 32;

fn check_extra_len(extra: &[u8]) -> Result<()> {
    if extra.len() > MAX_EXTRA_LEN {
        return Err(OpaqueError::LengthError { expected: MAX_EXTRA_LEN, actual: extra.len() });
    }
    Ok(())
}

fn build_sec_env(p_u: &Scalar, p_u_pub: &RistrettoPoint, p_s_pub: &RistrettoPoint, extra: &[u8]) -> Vec<u8> {
    let mut sec_env = Vec::with_capacity(96 + extra.len());
    sec_env.extend_from_slice(&group::scalar_to_bytes(p_u));
    sec_env.extend_from_slice(&group::point_to_bytes(p_u_pub));
    sec_env.extend_from_slice(&group::point_to_bytes(p_s_pub));
    sec_env.extend_from_slice(extra);
    sec_env
}

/// Server-knows-all registration: a single call that plays both OPRF roles
/// itself, since there is no client to protect secrets from the server in
/// this variant.
pub fn register_server_knows_all(
    password: &[u8],
    extra: &[u8],
    key: Option<&[u8]>,
    clr_env: &[u8],
) -> Result<(UserRecord, [u8; EXPORT_KEY_LEN])> {
    register_server_knows_all_with_params(password, extra, key, clr_env, KdfParams::default())
}

/// As [`register_server_knows_all`], but with explicit memory-hard KDF cost
/// parameters rather than the "interactive" default.
pub fn register_server_knows_all_with_params(
    password: &[u8],
    extra: &[u8],
    key: Option<&[u8]>,
    clr_env: &[u8],
    kdf_params: KdfParams,
) -> Result<(UserRecord, [u8; EXPORT_KEY_LEN])> {
    check_extra_len(extra)?;
    tracing::debug!("registration (server-knows-all): starting");

    let k_s = group::scalar_random();
    let blinded = oprf::blind(password)?;
    let beta = oprf::evaluate(&blinded.alpha, &k_s)?;
    let mut rw = oprf::finalize(password, &blinded.r, &beta, key, kdf_params)?;

    let p_s = group::scalar_random();
    let p_u = group::scalar_random();
    let p_s_pub = group::base_mul(&p_s);
    let p_u_pub = group::base_mul(&p_u);

    let mut sec_env = build_sec_env(&p_u, &p_u_pub, &p_s_pub, extra);
    let sealed = envelope::seal(&*rw, &sec_env, clr_env)?;
    sec_env.zeroize();
    rw.zeroize();

    let record = UserRecord {
        k_s: Locked::new(k_s)?,
        p_s: Locked::new(p_s)?,
        p_u_pub,
        p_s_pub,
        extra_len: extra.len() as u64,
        envelope: sealed.envelope,
    };

    tracing::debug!("registration (server-knows-all): record created");
    Ok((record, sealed.export_key))
}

/// Private registration, step 1 (client): blind the password.
pub struct ClientStart {
    pub r: Locked<Scalar>,
}

pub fn client_start(password: &[u8]) -> Result<(ClientStart, RistrettoPoint)> {
    let blinded = oprf::blind(password)?;
    Ok((ClientStart { r: blinded.r }, blinded.alpha))
}

/// Private registration, step 2 (server): evaluate the OPRF and mint a
/// long-term server keypair for this user, without learning the password.
pub fn server_respond(alpha: &RistrettoPoint) -> Result<(RegistrationSecret, RegistrationPublic)> {
    if !group::is_valid_point(&group::point_to_bytes(alpha)) {
        return Err(OpaqueError::InvalidPoint);
    }
    let k_s = group::scalar_random();
    let beta = oprf::evaluate(alpha, &k_s)?;
    let p_s = group::scalar_random();
    let p_s_pub = group::base_mul(&p_s);

    tracing::debug!("registration (private): server responded");
    Ok((RegistrationSecret { k_s: Locked::new(k_s)?, p_s: Locked::new(p_s)? }, RegistrationPublic { beta, p_s_pub }))
}

/// Private registration, step 3 (client): derive `rw`, mint the client's
/// own long-term keypair, and seal the envelope. The server never sees any
/// of `rw`, `p_u`, or the envelope contents.
pub fn client_respond(
    password: &[u8],
    start: ClientStart,
    public: &RegistrationPublic,
    extra: &[u8],
    key: Option<&[u8]>,
    clr_env: &[u8],
) -> Result<(RegistrationUpload, [u8; EXPORT_KEY_LEN])> {
    client_respond_with_params(password, start, public, extra, key, clr_env, KdfParams::default())
}

/// As [`client_respond`], but with explicit memory-hard KDF cost parameters.
#[allow(clippy::too_many_arguments)]
pub fn client_respond_with_params(
    password: &[u8],
    start: ClientStart,
    public: &RegistrationPublic,
    extra: &[u8],
    key: Option<&[u8]>,
    clr_env: &[u8],
    kdf_params: KdfParams,
) -> Result<(RegistrationUpload, [u8; EXPORT_KEY_LEN])> {
    check_extra_len(extra)?;
    let mut rw = oprf::finalize(password, &start.r, &public.beta, key, kdf_params)?;

    let p_u = group::scalar_random();
    let p_u_pub = group::base_mul(&p_u);

    let mut sec_env = build_sec_env(&p_u, &p_u_pub, &public.p_s_pub, extra);
    let sealed = envelope::seal(&*rw, &sec_env, clr_env)?;
    sec_env.zeroize();
    rw.zeroize();

    let upload = RegistrationUpload { p_u_pub, extra_len: extra.len() as u64, envelope: sealed.envelope };
    tracing::debug!("registration (private): client sealed envelope");
    Ok((upload, sealed.export_key))
}

/// Private registration, step 4 (server): fill the record's secret fields
/// in from what it generated in step 2.
pub fn server_finish(upload: RegistrationUpload, secret: RegistrationSecret) -> UserRecord {
    tracing::debug!("registration (private): server finished record");
    upload.into_user_record(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_knows_all_register_succeeds() {
        let (record, export_key) =
            register_server_knows_all(b"hunter2", b"extra payload", None, b"ClrEnv\0").unwrap();
        assert_eq!(record.extra_len, 13);
        assert_ne!(export_key, [0u8; 32]);
    }

    #[test]
    fn private_registration_four_message_flow_produces_consistent_record() {
        let password = b"correct horse battery staple";
        let (client_state, alpha) = client_start(password).unwrap();
        let (reg_secret, reg_public) = server_respond(&alpha).unwrap();
        let (upload, export_key_client) =
            client_respond(password, client_state, &reg_public, b"extra", None, b"").unwrap();
        let record = server_finish(upload, reg_secret);

        assert_eq!(group::point_to_bytes(&record.p_s_pub), group::point_to_bytes(&reg_public.p_s_pub));
        assert_ne!(export_key_client, [0u8; 32]);
    }

    #[test]
    fn rejects_oversized_extra() {
        let extra = vec![0u8; MAX_EXTRA_LEN + 1];
        assert!(register_server_knows_all(b"pw", &extra, None, b"").is_err());
    }
}
