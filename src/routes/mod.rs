pub mod api;

use axum::{Router, routing::get};
use std::sync::Arc;

use crate::handlers::api::health_check;
use crate::state::AppState;

/// Full application router: public health check plus the `/api` routes.
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .nest("/api", api::create_api_router())
        .fallback(api::not_found)
        .with_state(state)
}
