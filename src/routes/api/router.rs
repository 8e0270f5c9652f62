use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

use super::{auth, cards, health, share};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router(state.clone()))
        .nest("/auth", auth::router(state.clone()))
        .nest("/cards", share::router(state.clone()).merge(cards::router(state)))
}
