use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Payload of the session JWT.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub email: String,
    pub iat: usize,
    pub exp: usize,
}

impl SessionClaims {
    pub fn user_uuid(&self) -> Result<Uuid, SessionError> {
        self.user_id.parse().map_err(|_| SessionError::Invalid)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("no session token")]
    Missing,
    #[error("session token expired")]
    Expired,
    #[error("session token invalid")]
    Invalid,
}

impl SessionError {
    /// Message shown to API clients; lets the front end tell "never signed in"
    /// apart from "session lapsed".
    pub fn client_message(&self) -> &'static str {
        match self {
            SessionError::Missing => "Not authenticated",
            SessionError::Expired => "Session expired, please sign in again",
            SessionError::Invalid => "Invalid session, please sign in again",
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            SessionError::Missing => "missing",
            SessionError::Expired => "expired",
            SessionError::Invalid => "invalid",
        }
    }
}

impl From<SessionError> for crate::error::AppError {
    fn from(err: SessionError) -> Self {
        crate::error::AppError::unauthorized(err.client_message())
    }
}
