//! The three-message login (credential retrieval) flow: client presents a
//! password, server answers with a sealed envelope and an authenticator,
//! client opens the envelope and authenticates back.

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use zeroize::Zeroize;

use crate::config::{Identities, KdfParams, ProtocolInfo, MAX_EXTRA_LEN};
use crate::envelope;
use crate::error::{OpaqueError, Result};
use crate::group;
use crate::keyschedule::{self, KeyBundle};
use crate::oprf;
use crate::primitives;
use crate::record::{ServerSessionResponse, UserRecord, UserSessionPublic};
use crate::secret::Locked;
use crate::transcript::{self, Transcript};

/// Held by the client between message 1 and message 3.
pub struct ClientLoginSecret {
    pub r: Locked<Scalar>,
    pub x_u: Locked<Scalar>,
    pub nonce_u: [u8; 32],
    pub alpha: RistrettoPoint,
}

/// Login message 1 (client).
pub fn client_start(password: &[u8]) -> Result<(ClientLoginSecret, UserSessionPublic)> {
    let blinded = oprf::blind(password)?;
    let x_u = group::scalar_random();
    let nonce_u: [u8; 32] = group::random_bytes(32).try_into().unwrap();
    let x_u_pub = group::base_mul(&x_u);

    let secret = ClientLoginSecret { r: blinded.r, x_u: Locked::new(x_u)?, nonce_u, alpha: blinded.alpha };
    let public = UserSessionPublic { alpha: blinded.alpha, x_u: x_u_pub, nonce_u };
    Ok((secret, public))
}

/// Held by the server between message 2 and the deferred client-auth check.
pub struct ServerLoginState {
    pub sk: [u8; 32],
    km3: [u8; 32],
    transcript: Transcript,
}

/// Login message 2 (server).
pub fn server_respond(
    public: &UserSessionPublic,
    record: &UserRecord,
    ids: &Identities,
    infos: &ProtocolInfo,
) -> Result<(ServerSessionResponse, ServerLoginState)> {
    if !group::is_valid_point(&group::point_to_bytes(&public.alpha)) {
        return Err(OpaqueError::InvalidPoint);
    }
    if !group::is_valid_point(&group::point_to_bytes(&public.x_u)) {
        return Err(OpaqueError::InvalidPoint);
    }

    let x_s = Locked::new(group::scalar_random())?;
    let nonce_s: [u8; 32] = group::random_bytes(32).try_into().unwrap();
    let beta = oprf::evaluate(&public.alpha, &record.k_s)?;
    let x_s_pub = group::base_mul(&x_s);

    let info = keyschedule::calc_info(&public.nonce_u, &nonce_s, ids.id_u, ids.id_s);
    let mut keys: KeyBundle =
        keyschedule::server_3dh(&record.p_s, &x_s, &record.p_u_pub, &public.x_u, &info)?;

    let response = ServerSessionResponse {
        beta,
        x_s: x_s_pub,
        nonce_s,
        auth: [0u8; 32],
        extra_len: record.extra_len,
        envelope: record.envelope.clone(),
    };

    let transcript = transcript::build_through_einfo2(
        &group::point_to_bytes(&public.alpha),
        &public.nonce_u,
        infos.info1,
        &group::point_to_bytes(&public.x_u),
        &group::point_to_bytes(&response.beta),
        &response.envelope,
        &response.nonce_s,
        infos.info2,
        &group::point_to_bytes(&response.x_s),
        infos.einfo2,
    );
    let auth = primitives::hmac_sha256(&keys.km2, &transcript.finalize_server_auth())?;

    let mut response = response;
    response.auth = auth;

    let state = ServerLoginState { sk: keys.sk, km3: keys.km3, transcript };
    keys.zeroize();

    tracing::debug!("login: server response emitted");
    Ok((response, state))
}

pub struct ClientLoginResult {
    pub sk: [u8; 32],
    pub extra: Vec<u8>,
    pub export_key: [u8; 32],
    pub auth_u: [u8; 32],
}

/// Login message 3 (client): verify the server, open the envelope, and
/// produce the client's own authenticator.
pub fn client_finish(
    response: &ServerSessionResponse,
    secret: ClientLoginSecret,
    password: &[u8],
    key: Option<&[u8]>,
    ids: &Identities,
    infos: &ProtocolInfo,
) -> Result<ClientLoginResult> {
    client_finish_with_params(response, secret, password, key, ids, infos, KdfParams::default())
}

/// As [`client_finish`], but with explicit memory-hard KDF cost parameters.
/// These must match whatever parameters were used at registration, or `rw`
/// will not reproduce and the envelope will fail to open.
#[allow(clippy::too_many_arguments)]
pub fn client_finish_with_params(
    response: &ServerSessionResponse,
    secret: ClientLoginSecret,
    password: &[u8],
    key: Option<&[u8]>,
    ids: &Identities,
    infos: &ProtocolInfo,
    kdf_params: KdfParams,
) -> Result<ClientLoginResult> {
    if !group::is_valid_point(&group::point_to_bytes(&response.beta)) {
        return Err(OpaqueError::InvalidPoint);
    }
    if !group::is_valid_point(&group::point_to_bytes(&response.x_s)) {
        return Err(OpaqueError::InvalidPoint);
    }
    if response.extra_len > MAX_EXTRA_LEN as u64 {
        return Err(OpaqueError::LengthError { expected: MAX_EXTRA_LEN, actual: response.extra_len as usize });
    }

    let mut rw = oprf::finalize(password, &secret.r, &response.beta, key, kdf_params)?;

    let sec_env_len = 96 + response.extra_len as usize;
    let clr_env_len = response.envelope.len().checked_sub(64 + sec_env_len).ok_or(OpaqueError::LengthError {
        expected: 64 + sec_env_len,
        actual: response.envelope.len(),
    })?;
    let opened = envelope::open(&*rw, &response.envelope, sec_env_len, clr_env_len)?;
    rw.zeroize();

    let p_u = group::scalar_from_bytes(&opened.sec_env[0..32])?;
    let p_s_pub = group::decode_point(&opened.sec_env[64..96])?;
    let extra = opened.sec_env[96..].to_vec();

    let x_u_pub = group::base_mul(&secret.x_u);
    let info = keyschedule::calc_info(&secret.nonce_u, &response.nonce_s, ids.id_u, ids.id_s);
    let mut keys = keyschedule::user_3dh(&p_u, &secret.x_u, &p_s_pub, &response.x_s, &info)?;

    let transcript = transcript::build_through_einfo2(
        &group::point_to_bytes(&secret.alpha),
        &secret.nonce_u,
        infos.info1,
        &group::point_to_bytes(&x_u_pub),
        &group::point_to_bytes(&response.beta),
        &response.envelope,
        &response.nonce_s,
        infos.info2,
        &group::point_to_bytes(&response.x_s),
        infos.einfo2,
    );
    primitives::hmac_sha256_verify(&keys.km2, &transcript.finalize_server_auth(), &response.auth)
        .map_err(|_| OpaqueError::ServerAuthFailed)?;

    let auth_u = primitives::hmac_sha256(&keys.km3, &transcript.finalize_client_auth(infos.info3, infos.einfo3))?;

    let result = ClientLoginResult { sk: keys.sk, extra, export_key: opened.export_key, auth_u };
    keys.zeroize();

    tracing::debug!("login: client finished, server authenticated");
    Ok(result)
}

/// The server's deferred step: verify the client's authenticator against
/// the transcript state saved in message 2.
pub fn server_finish_auth(state: ServerLoginState, auth_u: &[u8; 32], infos: &ProtocolInfo) -> Result<[u8; 32]> {
    let expected = state.transcript.finalize_client_auth(infos.info3, infos.einfo3);
    primitives::hmac_sha256_verify(&state.km3, &expected, auth_u).map_err(|_| OpaqueError::ClientAuthFailed)?;
    tracing::debug!("login: client authenticated");
    Ok(state.sk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::register_server_knows_all;

    #[test]
    fn full_login_roundtrip_agrees_on_session_key() {
        let password = b"correct horse battery staple";
        let (record, _export_key) =
            register_server_knows_all(password, b"some additional secret data", None, b"ClrEnv\0").unwrap();

        let ids = Identities { id_u: b"user", id_s: b"server" };
        let infos = ProtocolInfo::default();

        let (client_secret, client_public) = client_start(password).unwrap();
        let (response, server_state) = server_respond(&client_public, &record, &ids, &infos).unwrap();
        let client_result = client_finish(&response, client_secret, password, None, &ids, &infos).unwrap();
        let server_sk = server_finish_auth(server_state, &client_result.auth_u, &infos).unwrap();

        assert_eq!(client_result.sk, server_sk);
        assert_eq!(client_result.extra, b"some additional secret data");
    }

    #[test]
    fn wrong_password_fails_at_envelope_open() {
        let password = b"correct horse battery staple";
        let (record, _) = register_server_knows_all(password, b"extra", None, b"").unwrap();
        let ids = Identities::default();
        let infos = ProtocolInfo::default();

        let (client_secret, client_public) = client_start(b"wrong password entirely").unwrap();
        let (response, _server_state) = server_respond(&client_public, &record, &ids, &infos).unwrap();
        let result = client_finish(&response, client_secret, b"wrong password entirely", None, &ids, &infos);
        assert!(result.is_err());
    }

    #[test]
    fn tampered_server_auth_is_rejected_by_client() {
        let password = b"correct horse battery staple";
        let (record, _) = register_server_knows_all(password, b"extra", None, b"").unwrap();
        let ids = Identities::default();
        let infos = ProtocolInfo::default();

        let (client_secret, client_public) = client_start(password).unwrap();
        let (mut response, _server_state) = server_respond(&client_public, &record, &ids, &infos).unwrap();
        response.auth[0] ^= 1;
        let result = client_finish(&response, client_secret, password, None, &ids, &infos);
        assert!(matches!(result, Err(OpaqueError::ServerAuthFailed)));
    }

    #[test]
    fn tampered_client_auth_is_rejected_by_server() {
        let password = b"correct horse battery staple";
        let (record, _) = register_server_knows_all(password, b"extra", None, b"").unwrap();
        let ids = Identities::default();
        let infos = ProtocolInfo::default();

        let (client_secret, client_public) = client_start(password).unwrap();
        let (response, server_state) = server_respond(&client_public, &record, &ids, &infos).unwrap();
        let mut client_result = client_finish(&response, client_secret, password, None, &ids, &infos).unwrap();
        client_result.auth_u[0] ^= 1;
        let result = server_finish_auth(server_state, &client_result.auth_u, &infos);
        assert!(matches!(result, Err(OpaqueError::ClientAuthFailed)));
    }

    #[test]
    fn identity_mismatch_breaks_server_authentication() {
        let password = b"correct horse battery staple";
        let (record, _) = register_server_knows_all(password, b"extra", None, b"").unwrap();
        let infos = ProtocolInfo::default();

        let (client_secret, client_public) = client_start(password).unwrap();
        let server_ids = Identities { id_u: b"user", id_s: b"server" };
        let (response, _server_state) =
            server_respond(&client_public, &record, &server_ids, &infos).unwrap();

        let client_ids = Identities { id_u: b"user", id_s: b"Server" };
        let result = client_finish(&response, client_secret, password, None, &client_ids, &infos);
        assert!(matches!(result, Err(OpaqueError::ServerAuthFailed)));
    }
}
