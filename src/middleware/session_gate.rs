use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    auth::{SessionError, cookie::session_token, jwt::verify_session},
    error::AppError,
    state::AppState,
};

const LOGIN_PAGE: &str = "/login";

const PUBLIC_PATHS: &[&str] = &[
    "/login",
    "/register",
    "/forgot-password",
    "/reset-password",
    "/api/v1/auth/login",
    "/api/v1/auth/register",
    "/api/v1/auth/forgot-password",
    "/api/v1/auth/reset-password",
    "/api/v1/health",
    "/favicon.ico",
    "/manifest.json",
];

const PUBLIC_PREFIXES: &[&str] = &["/logos/", "/static/", "/icons/"];

/// Rejects requests without a valid session cookie. API calls get a 401
/// envelope; page loads are redirected to the login page.
pub async fn session_gate(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path();
    if is_public_path(path) {
        return next.run(req).await;
    }

    let checked = match session_token(req.headers()) {
        Some(token) => verify_session(&state.jwt, &token).and_then(|claims| claims.user_uuid()),
        None => Err(SessionError::Missing),
    };

    match checked {
        Ok(_) => next.run(req).await,
        Err(err) => {
            tracing::debug!(path, reason = err.reason(), "session rejected");
            if is_api_path(path) {
                AppError::from(err).into_response()
            } else {
                login_redirect(err).into_response()
            }
        }
    }
}

pub fn is_public_path(path: &str) -> bool {
    let path = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };

    PUBLIC_PATHS.contains(&path)
        || PUBLIC_PREFIXES
            .iter()
            .any(|prefix| path.starts_with(prefix))
}

fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

fn login_redirect(err: SessionError) -> Redirect {
    match err {
        SessionError::Missing => Redirect::to(LOGIN_PAGE),
        other => Redirect::to(&format!("{LOGIN_PAGE}?reason={}", other.reason())),
    }
}
