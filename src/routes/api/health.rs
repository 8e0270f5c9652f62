use std::sync::Arc;

use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;

use crate::{
    db::connection::ping,
    response::{ApiResult, JsonApiResponse},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub database: &'static str,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> ApiResult<HealthResponse> {
    match ping(&state.db).await {
        Ok(()) => JsonApiResponse::ok(HealthResponse { database: "up" }),
        Err(err) => {
            tracing::warn!(error = %err, "health check: database unreachable");
            JsonApiResponse::with_status(
                StatusCode::SERVICE_UNAVAILABLE,
                "database unavailable",
                HealthResponse { database: "down" },
            )
        }
    }
}
