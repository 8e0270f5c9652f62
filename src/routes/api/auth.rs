use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::{delete, get, post, put},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    auth::cookie::{expired_session_cookie, session_cookie},
    error::AppError,
    middleware::SessionUser,
    response::{ApiResult, JsonApiResponse},
    services::{
        ServiceContext,
        account_service::{FORGOT_PASSWORD_REPLY, Profile, ProfileChanges, Registration},
    },
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: Profile,
}

type CookieResult<T> = Result<(CookieJar, JsonApiResponse<T>), AppError>;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/update-profile", put(update_profile))
        .route("/delete-account", delete(delete_account))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .with_state(state)
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<MessageResponse> {
    ServiceContext::from_state(state.as_ref())
        .account()
        .register(Registration {
            email: body.email.as_deref(),
            password: body.password.as_deref(),
            first_name: body.first_name.as_deref(),
            last_name: body.last_name.as_deref(),
        })
        .await?;
    JsonApiResponse::ok(MessageResponse {
        message: "Registration successful",
    })
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> CookieResult<UserResponse> {
    let logged_in = ServiceContext::from_state(state.as_ref())
        .account()
        .login(body.email.as_deref(), body.password.as_deref())
        .await?;

    let jar = jar.add(session_cookie(logged_in.token, state.secure_cookies()));
    Ok((jar, JsonApiResponse::ok(UserResponse { user: logged_in.profile })?))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    user: SessionUser,
) -> CookieResult<MessageResponse> {
    tracing::info!(user_id = %user.id, "user logged out");
    let jar = jar.add(expired_session_cookie(state.secure_cookies()));
    Ok((jar, JsonApiResponse::ok(MessageResponse { message: "Logged out" })?))
}

async fn me(State(state): State<Arc<AppState>>, user: SessionUser) -> ApiResult<UserResponse> {
    let profile = ServiceContext::from_state(state.as_ref())
        .account()
        .me(&user.id)
        .await?;
    JsonApiResponse::ok(UserResponse { user: profile })
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    user: SessionUser,
    Json(body): Json<UpdateProfileRequest>,
) -> CookieResult<UserResponse> {
    let updated = ServiceContext::from_state(state.as_ref())
        .account()
        .update_profile(
            &user.id,
            ProfileChanges {
                email: body.email.as_deref(),
                first_name: body.first_name.as_deref(),
                last_name: body.last_name.as_deref(),
            },
        )
        .await?;

    let jar = match updated.token {
        Some(token) => jar.add(session_cookie(token, state.secure_cookies())),
        None => jar,
    };
    Ok((jar, JsonApiResponse::ok(UserResponse { user: updated.profile })?))
}

async fn delete_account(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    user: SessionUser,
) -> CookieResult<MessageResponse> {
    ServiceContext::from_state(state.as_ref())
        .account()
        .delete_account(&user.id)
        .await?;

    let jar = jar.add(expired_session_cookie(state.secure_cookies()));
    Ok((jar, JsonApiResponse::ok(MessageResponse { message: "Account deleted" })?))
}

async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ForgotPasswordRequest>,
) -> ApiResult<MessageResponse> {
    ServiceContext::from_state(state.as_ref())
        .account()
        .forgot_password(body.email.as_deref())
        .await?;
    JsonApiResponse::ok(MessageResponse {
        message: FORGOT_PASSWORD_REPLY,
    })
}

async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResetPasswordRequest>,
) -> ApiResult<MessageResponse> {
    ServiceContext::from_state(state.as_ref())
        .account()
        .reset_password(body.token.as_deref(), body.new_password.as_deref())
        .await?;
    JsonApiResponse::ok(MessageResponse {
        message: "Password updated",
    })
}
