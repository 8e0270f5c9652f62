use std::{sync::Arc, time::Duration};

use axum::{Router, middleware};
use chrono::{DateTime, FixedOffset, TimeZone};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::{
    auth::{cookie::SESSION_COOKIE, jwt::issue_session, password::hash_password},
    config::AppConfig,
    db::entities::{card_share, loyalty_card, user},
    middleware::{catch_panic_layer, json_error_middleware},
    notify::{Notifier, RecordingMailer, RetryPolicy},
    routes::router,
    services::ServiceContext,
    state::AppState,
};

pub const TEST_SECRET: &str = "test-secret-test-secret-test-secret";

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.auth.jwt_secret = TEST_SECRET.to_string();
    cfg.auth.secure_cookies = false;
    cfg.mail.retry_backoff_ms = 0;
    cfg
}

/// State over `db` whose outgoing mail lands in `mailer`. Needs a running
/// tokio runtime for the mail worker.
pub fn test_state(db: DatabaseConnection, mailer: RecordingMailer) -> Arc<AppState> {
    let cfg = test_config();
    let notifier = Notifier::spawn(
        Arc::new(mailer),
        RetryPolicy {
            max_attempts: cfg.mail.max_attempts,
            backoff: Duration::ZERO,
        },
        cfg.mail.queue_size,
    );
    AppState::new(cfg, db, notifier)
}

pub fn test_services(db: DatabaseConnection, mailer: RecordingMailer) -> ServiceContext {
    ServiceContext::from_state(test_state(db, mailer).as_ref())
}

pub fn test_app(state: Arc<AppState>) -> Router {
    router(state)
        .layer(middleware::from_fn(json_error_middleware))
        .layer(catch_panic_layer())
}

/// `Cookie` header value carrying a valid session for `user_id`.
pub fn session_cookie_for(state: &AppState, user_id: &Uuid, email: &str) -> String {
    let token = issue_session(&state.jwt, user_id, email).expect("session should encode");
    format!("{SESSION_COOKIE}={token}")
}

pub fn fixed_time() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .expect("offset should be valid")
        .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
        .single()
        .expect("timestamp should be valid")
}

pub fn user_row(id: Uuid, email: &str) -> user::Model {
    user::Model {
        id,
        created_at: fixed_time(),
        updated_at: fixed_time(),
        email: email.to_string(),
        password_hash: "unusable-hash".to_string(),
        first_name: Some("Test".to_string()),
        last_name: Some("User".to_string()),
        is_active: true,
        reset_token: None,
        reset_token_expiry: None,
        last_login_at: None,
    }
}

pub fn user_row_with_password(id: Uuid, email: &str, password: &str) -> user::Model {
    user::Model {
        password_hash: hash_password(password).expect("hash should succeed"),
        ..user_row(id, email)
    }
}

pub fn card_row(id: Uuid, owner: Uuid, shop_name: &str) -> loyalty_card::Model {
    loyalty_card::Model {
        id,
        created_at: fixed_time(),
        updated_at: fixed_time(),
        shop_name: shop_name.to_string(),
        card_type: "BARCODE".to_string(),
        card_code: "123456".to_string(),
        notes: None,
        logo_url: crate::logos::logo_for(shop_name).to_string(),
        user_id: owner,
    }
}

pub fn share_row(card_id: Uuid, shared_with: Uuid, shared_by: Uuid) -> card_share::Model {
    card_share::Model {
        id: Uuid::new_v4(),
        created_at: fixed_time(),
        updated_at: fixed_time(),
        card_id,
        shared_with,
        shared_by,
    }
}

/// Waits for the mail worker to hand `count` messages to the mailer.
pub async fn wait_for_mail(mailer: &RecordingMailer, count: usize) {
    for _ in 0..200 {
        if mailer.sent().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
