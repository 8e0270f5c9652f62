use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::{
    auth::{SessionClaims, SessionError, cookie::session_token, jwt::verify_session},
    error::AppError,
    state::AppState,
};

/// Identity of the caller, decoded from the session token once per request.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
}

impl FromRequestParts<Arc<AppState>> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<SessionUser>().cloned() {
            return Ok(user);
        }

        let token = session_token(&parts.headers).ok_or(SessionError::Missing)?;
        let claims: SessionClaims = verify_session(&state.jwt, &token)?;
        let user = SessionUser {
            id: claims.user_uuid()?,
            email: claims.email,
        };

        parts.extensions.insert(user.clone());
        Ok(user)
    }
}
