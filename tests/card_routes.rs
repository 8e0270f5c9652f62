use axum::{
    body::{self, Body},
    http::{Request, StatusCode, header},
    response::Response,
};
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
use serde_json::json;
use tower::ServiceExt; // for `oneshot`
use uuid::Uuid;

use loyalty_vault::{
    db::entities::{card_share, loyalty_card, user},
    notify::RecordingMailer,
    routes::API_PREFIX,
    test_helpers::{card_row, session_cookie_for, share_row, test_app, test_state, user_row},
};

fn api_path(path: &str) -> String {
    format!("{API_PREFIX}{path}")
}

async fn json_body(response: Response) -> serde_json::Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    serde_json::from_slice(&bytes).expect("body should be json")
}

fn exec(rows_affected: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected,
    }
}

fn authed(method: &str, path: &str, cookie: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(api_path(path))
        .header(header::COOKIE, cookie);
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn create_card_returns_201_with_logo() {
    let owner = Uuid::new_v4();
    let card_id = Uuid::new_v4();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[card_row(card_id, owner, "Carrefour")]])
        .into_connection();
    let state = test_state(db, RecordingMailer::new());
    let cookie = session_cookie_for(&state, &owner, "owner@example.com");

    let response = test_app(state)
        .oneshot(authed(
            "POST",
            "/cards",
            &cookie,
            Some(json!({
                "shopName": "Carrefour",
                "cardType": "barcode",
                "cardCode": "123456"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = json_body(response).await;
    assert_eq!(json["data"]["id"], card_id.to_string());
    assert_eq!(json["data"]["logoUrl"], "/logos/carrefour.png");
    assert_eq!(json["data"]["cardType"], "BARCODE");
}

#[tokio::test]
async fn create_card_rejects_unknown_type() {
    let state = test_state(
        MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        RecordingMailer::new(),
    );
    let cookie = session_cookie_for(&state, &Uuid::new_v4(), "owner@example.com");

    let response = test_app(state)
        .oneshot(authed(
            "POST",
            "/cards",
            &cookie,
            Some(json!({
                "shopName": "Carrefour",
                "cardType": "NFC",
                "cardCode": "123456"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["message"],
        "Card type must be BARCODE or QRCODE"
    );
}

#[tokio::test]
async fn get_card_hides_cards_not_shared_with_caller() {
    let stranger = Uuid::new_v4();
    let card_id = Uuid::new_v4();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[card_row(card_id, Uuid::new_v4(), "Fnac")]])
        .append_query_results([Vec::<card_share::Model>::new()])
        .into_connection();
    let state = test_state(db, RecordingMailer::new());
    let cookie = session_cookie_for(&state, &stranger, "stranger@example.com");

    let response = test_app(state)
        .oneshot(authed("GET", &format!("/cards/{card_id}"), &cookie, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["message"], "Card not found");
}

#[tokio::test]
async fn malformed_card_id_is_reported_as_missing_card() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let state = test_state(db, RecordingMailer::new());
    let cookie = session_cookie_for(&state, &Uuid::new_v4(), "someone@example.com");
    let app = test_app(state);

    for method in ["GET", "DELETE"] {
        let response = app
            .clone()
            .oneshot(authed(method, "/cards/not-a-uuid", &cookie, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method}");
        assert_eq!(json_body(response).await["message"], "Card not found");
    }
}

#[tokio::test]
async fn get_card_shows_recipient_who_shared_it() {
    let owner = Uuid::new_v4();
    let recipient = Uuid::new_v4();
    let card_id = Uuid::new_v4();
    let share = share_row(card_id, recipient, owner);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[card_row(card_id, owner, "Fnac")]])
        .append_query_results([[share.clone()]])
        .append_query_results([[user_row(owner, "owner@example.com")]])
        .into_connection();
    let state = test_state(db, RecordingMailer::new());
    let cookie = session_cookie_for(&state, &recipient, "friend@example.com");

    let response = test_app(state)
        .oneshot(authed("GET", &format!("/cards/{card_id}"), &cookie, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["access"], "shared");
    assert_eq!(json["data"]["shareId"], share.id.to_string());
    assert_eq!(json["data"]["sharedBy"]["email"], "owner@example.com");
}

#[tokio::test]
async fn update_by_non_owner_is_404() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<loyalty_card::Model>::new()])
        .into_connection();
    let state = test_state(db, RecordingMailer::new());
    let cookie = session_cookie_for(&state, &Uuid::new_v4(), "friend@example.com");

    let response = test_app(state)
        .oneshot(authed(
            "PUT",
            &format!("/cards/{}", Uuid::new_v4()),
            &cookie,
            Some(json!({ "cardCode": "999" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_without_fields_is_400() {
    let state = test_state(
        MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        RecordingMailer::new(),
    );
    let cookie = session_cookie_for(&state, &Uuid::new_v4(), "owner@example.com");

    let response = test_app(state)
        .oneshot(authed(
            "PUT",
            &format!("/cards/{}", Uuid::new_v4()),
            &cookie,
            Some(json!({})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["message"], "No fields to update");
}

#[tokio::test]
async fn delete_card_removes_owned_card() {
    let owner = Uuid::new_v4();
    let card_id = Uuid::new_v4();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[card_row(card_id, owner, "Lidl")]])
        .append_exec_results([exec(1), exec(1)])
        .into_connection();
    let state = test_state(db, RecordingMailer::new());
    let cookie = session_cookie_for(&state, &owner, "owner@example.com");

    let response = test_app(state)
        .oneshot(authed("DELETE", &format!("/cards/{card_id}"), &cookie, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"]["id"], card_id.to_string());
}

#[tokio::test]
async fn sharing_with_unknown_email_provisions_account_and_sends_invitation() {
    let owner = Uuid::new_v4();
    let card_id = Uuid::new_v4();
    let recipient = Uuid::new_v4();
    let card = card_row(card_id, owner, "Decathlon");
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[card.clone()]])
        .append_query_results([Vec::<user::Model>::new()])
        .append_query_results([[card]])
        .append_query_results([Vec::<user::Model>::new()])
        .append_query_results([[user_row(recipient, "friend@example.com")]])
        .append_exec_results([exec(1), exec(1)])
        .into_connection();
    let mailer = RecordingMailer::new();
    let state = test_state(db, mailer.clone());
    let cookie = session_cookie_for(&state, &owner, "owner@example.com");

    let response = test_app(state)
        .oneshot(authed(
            "POST",
            "/cards/share",
            &cookie,
            Some(json!({ "email": "friend@example.com", "cardIds": [card_id] })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["success"], true);
    assert_eq!(json["data"]["isNewUser"], true);
    assert_eq!(json["data"]["shared"], 1);
    assert!(json["data"].get("warning").is_none());

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "friend@example.com");
    assert_eq!(sent[0].subject, "Invitation to join Loyalty App");
    assert!(sent[0].html.contains("Temporary password"));
}

#[tokio::test]
async fn sharing_reports_warning_when_invitation_fails() {
    let owner = Uuid::new_v4();
    let card_id = Uuid::new_v4();
    let card = card_row(card_id, owner, "Decathlon");
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[card.clone()]])
        .append_query_results([Vec::<user::Model>::new()])
        .append_query_results([[card]])
        .append_query_results([Vec::<user::Model>::new()])
        .append_query_results([[user_row(Uuid::new_v4(), "friend@example.com")]])
        .append_exec_results([exec(1), exec(1)])
        .into_connection();
    let state = test_state(db, RecordingMailer::failing(10));
    let cookie = session_cookie_for(&state, &owner, "owner@example.com");

    let response = test_app(state)
        .oneshot(authed(
            "POST",
            "/cards/share",
            &cookie,
            Some(json!({ "email": "friend@example.com", "cardIds": [card_id] })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["success"], true);
    assert!(json["data"]["warning"].is_string());
}

#[tokio::test]
async fn revoke_without_target_is_400() {
    let state = test_state(
        MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        RecordingMailer::new(),
    );
    let cookie = session_cookie_for(&state, &Uuid::new_v4(), "owner@example.com");

    let response = test_app(state)
        .oneshot(authed("DELETE", "/cards/share", &cookie, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn revoke_by_share_id_query() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([exec(1)])
        .into_connection();
    let state = test_state(db, RecordingMailer::new());
    let cookie = session_cookie_for(&state, &Uuid::new_v4(), "owner@example.com");

    let response = test_app(state)
        .oneshot(authed(
            "DELETE",
            &format!("/cards/share?shareId={}", Uuid::new_v4()),
            &cookie,
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"]["revoked"], 1);
}
