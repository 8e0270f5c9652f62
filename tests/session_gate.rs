use axum::{
    body::{self, Body},
    http::{Request, StatusCode, header},
};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use tower::ServiceExt; // for `oneshot`
use uuid::Uuid;

use loyalty_vault::{
    auth::jwt::{SESSION_TTL_SECS, encode_token, make_session_claims, now_unix},
    db::entities::{card_share, loyalty_card},
    notify::RecordingMailer,
    routes::API_PREFIX,
    test_helpers::{session_cookie_for, test_app, test_state},
};

fn api_path(path: &str) -> String {
    format!("{API_PREFIX}{path}")
}

fn empty_db() -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres).into_connection()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    serde_json::from_slice(&bytes).expect("body should be json")
}

fn expired_cookie(state: &loyalty_vault::state::AppState) -> String {
    let issued = now_unix() - 2 * SESSION_TTL_SECS;
    let claims = make_session_claims(&Uuid::new_v4(), "alice@example.com", issued, SESSION_TTL_SECS);
    let token = encode_token(&state.jwt, &claims).expect("encode token");
    format!("auth-token={token}")
}

#[tokio::test]
async fn api_without_cookie_gets_401_envelope() {
    let app = test_app(test_state(empty_db(), RecordingMailer::new()));

    let response = app
        .oneshot(
            Request::builder()
                .uri(api_path("/cards"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(response).await;
    assert_eq!(json["status"], 401);
    assert_eq!(json["message"], "Not authenticated");
}

#[tokio::test]
async fn api_with_expired_session_says_so() {
    let state = test_state(empty_db(), RecordingMailer::new());
    let cookie = expired_cookie(&state);

    let response = test_app(state)
        .oneshot(
            Request::builder()
                .uri(api_path("/auth/me"))
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(response).await;
    assert_eq!(json["message"], "Session expired, please sign in again");
}

#[tokio::test]
async fn api_with_garbage_token_is_invalid() {
    let app = test_app(test_state(empty_db(), RecordingMailer::new()));

    let response = app
        .oneshot(
            Request::builder()
                .uri(api_path("/cards"))
                .header(header::COOKIE, "auth-token=not.a.jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(response).await;
    assert_eq!(json["message"], "Invalid session, please sign in again");
}

#[tokio::test]
async fn pages_redirect_to_login() {
    let state = test_state(empty_db(), RecordingMailer::new());
    let expired = expired_cookie(&state);
    let app = test_app(state);

    let missing = app
        .clone()
        .oneshot(Request::builder().uri("/cards").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::SEE_OTHER);
    assert_eq!(missing.headers()[header::LOCATION], "/login");

    let lapsed = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::COOKIE, expired)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(lapsed.status(), StatusCode::SEE_OTHER);
    assert_eq!(lapsed.headers()[header::LOCATION], "/login?reason=expired");
}

#[tokio::test]
async fn health_is_public() {
    let app = test_app(test_state(empty_db(), RecordingMailer::new()));

    let response = app
        .oneshot(
            Request::builder()
                .uri(api_path("/health"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["database"], "up");
}

#[tokio::test]
async fn bearer_header_is_accepted_as_fallback() {
    let user_id = Uuid::new_v4();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<loyalty_card::Model>::new()])
        .append_query_results([Vec::<card_share::Model>::new()])
        .into_connection();
    let state = test_state(db, RecordingMailer::new());
    let cookie = session_cookie_for(&state, &user_id, "alice@example.com");
    let token = cookie.trim_start_matches("auth-token=").to_string();

    let response = test_app(state)
        .oneshot(
            Request::builder()
                .uri(api_path("/cards"))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["owned"], serde_json::json!([]));
    assert_eq!(json["data"]["shared"], serde_json::json!([]));
}

#[tokio::test]
async fn unknown_api_route_is_a_json_404() {
    let state = test_state(empty_db(), RecordingMailer::new());
    let cookie = session_cookie_for(&state, &Uuid::new_v4(), "alice@example.com");

    let response = test_app(state)
        .oneshot(
            Request::builder()
                .uri(api_path("/nope"))
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = json_body(response).await;
    assert_eq!(json["status"], 404);
}
