use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::SessionUser,
    response::{ApiResult, JsonApiResponse},
    services::{
        ServiceContext,
        card_service::{CARD_NOT_FOUND, CardDetail, CardInput, CardListing},
        views::CardView,
    },
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRequest {
    pub shop_name: Option<String>,
    pub card_type: Option<String>,
    pub card_code: Option<String>,
    pub notes: Option<String>,
}

impl CardRequest {
    fn as_input(&self) -> CardInput<'_> {
        CardInput {
            shop_name: self.shop_name.as_deref(),
            card_type: self.card_type.as_deref(),
            card_code: self.card_code.as_deref(),
            notes: self.notes.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub id: Uuid,
}

/// A malformed id cannot name any card, so it gets the same 404.
fn parse_card_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found(CARD_NOT_FOUND))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(list_cards).post(create_card))
        .route("/{id}", get(get_card).put(update_card).delete(delete_card))
        .with_state(state)
}

async fn list_cards(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
) -> ApiResult<CardListing> {
    let listing = ServiceContext::from_state(state.as_ref())
        .card()
        .list_cards(&user.id)
        .await?;
    JsonApiResponse::ok(listing)
}

async fn create_card(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Json(body): Json<CardRequest>,
) -> ApiResult<CardView> {
    let card = ServiceContext::from_state(state.as_ref())
        .card()
        .create_card(&user.id, body.as_input())
        .await?;
    JsonApiResponse::with_status(StatusCode::CREATED, "created", card)
}

async fn get_card(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Path(id): Path<String>,
) -> ApiResult<CardDetail> {
    let id = parse_card_id(&id)?;
    let card = ServiceContext::from_state(state.as_ref())
        .card()
        .get_card(&user.id, &id)
        .await?;
    JsonApiResponse::ok(card)
}

async fn update_card(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Path(id): Path<String>,
    Json(body): Json<CardRequest>,
) -> ApiResult<CardView> {
    let id = parse_card_id(&id)?;
    let card = ServiceContext::from_state(state.as_ref())
        .card()
        .update_card(&user.id, &id, body.as_input())
        .await?;
    JsonApiResponse::ok(card)
}

async fn delete_card(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Path(id): Path<String>,
) -> ApiResult<DeletedResponse> {
    let id = parse_card_id(&id)?;
    ServiceContext::from_state(state.as_ref())
        .card()
        .delete_card(&user.id, &id)
        .await?;
    JsonApiResponse::ok(DeletedResponse { id })
}
