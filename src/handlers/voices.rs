use axum::{extract::State, response::Json};
use serde::Serialize;
use std::sync::Arc;

use crate::core::tts::VoiceDescriptor;
use crate::state::AppState;

/// Response body for the voice listing endpoint
#[derive(Debug, Serialize)]
pub struct VoicesResponse {
    pub voices: Vec<VoiceDescriptor>,
}

/// Handler for `GET /api/voices`.
///
/// Built-in voices are listed first, followed by whatever the upstream
/// catalog returned. A catalog failure only shrinks the list.
pub async fn list_voices(State(state): State<Arc<AppState>>) -> Json<VoicesResponse> {
    let voices = state.core_state.voice_catalog.list_voices().await;
    Json(VoicesResponse { voices })
}
