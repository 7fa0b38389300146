//! Session Token
//!
//! Cookie value `"<session uuid>.<base64url(HMAC-SHA256(uuid))>"`. The
//! signature keeps forged ids away from the session store.

use hmac::{Hmac, Mac};
use kernel::id::SessionId;
use sha2::Sha256;

use crate::error::{AuthError, AuthResult};

type HmacSha256 = Hmac<Sha256>;

fn signature(secret: &[u8; 32], payload: &str) -> AuthResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AuthError::Internal(format!("HMAC key rejected: {e}")))?;
    mac.update(payload.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

pub fn sign(secret: &[u8; 32], session_id: SessionId) -> AuthResult<String> {
    let payload = session_id.to_string();
    let sig = signature(secret, &payload)?;
    Ok(format!("{payload}.{}", platform::crypto::to_base64_url(&sig)))
}

/// Check the signature and return the session id it covers
pub fn verify(secret: &[u8; 32], token: &str) -> AuthResult<SessionId> {
    let (payload, sig_b64) = token.split_once('.').ok_or(AuthError::SessionInvalid)?;

    let provided =
        platform::crypto::from_base64_url(sig_b64).map_err(|_| AuthError::SessionInvalid)?;
    let expected = signature(secret, payload)?;

    if !platform::crypto::constant_time_eq(&expected, &provided) {
        return Err(AuthError::SessionInvalid);
    }

    payload.parse().map_err(|_| AuthError::SessionInvalid)
}
