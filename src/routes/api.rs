use axum::{
    Router,
    http::Uri,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::handlers::{speak, voices};
use crate::state::AppState;
use std::sync::Arc;

pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/voices", get(voices::list_voices))
        .route("/synthesize", post(speak::synthesize_handler))
        .layer(TraceLayer::new_for_http())
}

/// Fallback for unmatched paths
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
