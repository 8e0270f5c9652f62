use std::sync::Arc;

use axum::{Router, middleware};
use tower_http::services::ServeDir;

use crate::{middleware::session_gate, state::AppState};

use super::api;

pub const API_PREFIX: &str = "/api/v1";

/// JSON API under `API_PREFIX`, the front-end bundle (if configured) for
/// everything else, all behind the session gate.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new().nest(API_PREFIX, api::router(state.clone()));

    if let Some(dir) = &state.config.general.static_dir {
        app = app.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }

    app.layer(middleware::from_fn_with_state(state, session_gate))
}
