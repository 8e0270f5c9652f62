use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::SessionUser,
    response::{ApiResult, JsonApiResponse},
    services::{
        ServiceContext,
        share_service::{RevokeOutcome, RevokeTarget, ShareOutcome},
        views::ShareView,
    },
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub email: Option<String>,
    #[serde(default)]
    pub card_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSharesQuery {
    pub card_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeQuery {
    pub share_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeRequest {
    pub share_id: Option<Uuid>,
    #[serde(default)]
    pub card_ids: Vec<Uuid>,
    pub email: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/share",
            get(list_shares).post(share_cards).delete(revoke_shares),
        )
        .with_state(state)
}

async fn share_cards(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Json(body): Json<ShareRequest>,
) -> ApiResult<ShareOutcome> {
    let outcome = ServiceContext::from_state(state.as_ref())
        .share()
        .share_cards(&user.id, body.email.as_deref(), &body.card_ids)
        .await?;
    JsonApiResponse::ok(outcome)
}

async fn list_shares(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Query(query): Query<ListSharesQuery>,
) -> ApiResult<Vec<ShareView>> {
    let shares = ServiceContext::from_state(state.as_ref())
        .share()
        .list_shares(&user.id, query.card_id)
        .await?;
    JsonApiResponse::ok(shares)
}

/// Accepts `?shareId=` or a JSON body with either `shareId` or `{cardIds, email}`.
async fn revoke_shares(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Query(query): Query<RevokeQuery>,
    body: Option<Json<RevokeRequest>>,
) -> ApiResult<RevokeOutcome> {
    let body = body.map(|Json(body)| body).unwrap_or_default();

    let target = match query.share_id.or(body.share_id) {
        Some(share_id) => RevokeTarget::Share(share_id),
        None if !body.card_ids.is_empty() || body.email.is_some() => RevokeTarget::Recipient {
            card_ids: &body.card_ids,
            email: body.email.as_deref(),
        },
        None => {
            return Err(AppError::bad_request(
                "Provide a shareId or both cardIds and email",
            ));
        }
    };

    let outcome = ServiceContext::from_state(state.as_ref())
        .share()
        .revoke(&user.id, target)
        .await?;
    JsonApiResponse::ok(outcome)
}
