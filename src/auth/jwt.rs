use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use uuid::Uuid;

use super::{SessionClaims, SessionError};
use crate::error::AppError;

pub const SESSION_TTL_SECS: usize = 24 * 60 * 60;

#[derive(Clone)]
pub struct JwtKeys {
    pub enc: EncodingKey,
    pub dec: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            enc: EncodingKey::from_secret(secret),
            dec: DecodingKey::from_secret(secret),
        }
    }
}

pub fn now_unix() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as usize)
        .unwrap_or_default()
}

pub fn make_session_claims(user_id: &Uuid, email: &str, iat: usize, ttl_secs: usize) -> SessionClaims {
    SessionClaims {
        user_id: user_id.to_string(),
        email: email.to_string(),
        iat,
        exp: iat + ttl_secs,
    }
}

pub fn encode_token(keys: &JwtKeys, claims: &SessionClaims) -> Result<String, AppError> {
    let mut header = Header::new(Algorithm::HS256);
    header.typ = Some("JWT".into());

    encode(&header, claims, &keys.enc).map_err(|err| {
        tracing::error!(error = %err, "session token encoding failed");
        AppError::internal("Token encoding failed")
    })
}

/// Signs a 24 hour session for the given identity.
pub fn issue_session(keys: &JwtKeys, user_id: &Uuid, email: &str) -> Result<String, AppError> {
    let claims = make_session_claims(user_id, email, now_unix(), SESSION_TTL_SECS);
    encode_token(keys, &claims)
}

pub fn verify_session(keys: &JwtKeys, token: &str) -> Result<SessionClaims, SessionError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;

    decode::<SessionClaims>(token, &keys.dec, &validation)
        .map(|data| data.claims)
        .map_err(|err| match err.kind() {
            ErrorKind::ExpiredSignature => SessionError::Expired,
            _ => SessionError::Invalid,
        })
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{
        JwtKeys, SESSION_TTL_SECS, encode_token, issue_session, make_session_claims, now_unix,
        verify_session,
    };
    use crate::auth::SessionError;

    #[test]
    fn session_roundtrips_identity() {
        let keys = JwtKeys::from_secret(b"unit-test-secret");
        let user_id = Uuid::new_v4();

        let token = issue_session(&keys, &user_id, "alice@example.com").expect("should encode");
        let claims = verify_session(&keys, &token).expect("should verify");

        assert_eq!(claims.user_uuid(), Ok(user_id));
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.exp - claims.iat, SESSION_TTL_SECS);
    }

    #[test]
    fn session_older_than_a_day_is_expired() {
        let keys = JwtKeys::from_secret(b"unit-test-secret");
        let issued = now_unix() - SESSION_TTL_SECS - 60;
        let claims = make_session_claims(&Uuid::new_v4(), "a@example.com", issued, SESSION_TTL_SECS);
        let token = encode_token(&keys, &claims).expect("should encode");

        assert_eq!(verify_session(&keys, &token), Err(SessionError::Expired));
    }

    #[test]
    fn tampered_signature_is_invalid() {
        let keys = JwtKeys::from_secret(b"unit-test-secret");
        let token = issue_session(&keys, &Uuid::new_v4(), "a@example.com").expect("encode");
        let sig_start = token.rfind('.').expect("jwt has three segments") + 1;
        let replacement = if token[sig_start..].starts_with('A') { "B" } else { "A" };
        let mut tampered = token.clone();
        tampered.replace_range(sig_start..sig_start + 1, replacement);

        assert_eq!(verify_session(&keys, &tampered), Err(SessionError::Invalid));
    }

    #[test]
    fn token_from_other_secret_is_invalid() {
        let token = issue_session(&JwtKeys::from_secret(b"secret-a"), &Uuid::new_v4(), "a@example.com")
            .expect("encode");

        assert_eq!(
            verify_session(&JwtKeys::from_secret(b"secret-b"), &token),
            Err(SessionError::Invalid)
        );
    }

    #[test]
    fn garbage_is_invalid() {
        let keys = JwtKeys::from_secret(b"unit-test-secret");
        assert_eq!(verify_session(&keys, "not-a-jwt"), Err(SessionError::Invalid));
    }
}
