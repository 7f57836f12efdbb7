use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::core::tts::{AzureAudioEncoding, validate_synthesis_payload};
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Download name for a synthesized file, e.g. `tts_20240501_093000.mp3`.
pub fn attachment_filename(format: AzureAudioEncoding) -> String {
    format!(
        "tts_{}.{}",
        chrono::Local::now().format("%Y%m%d_%H%M%S"),
        format.file_extension()
    )
}

/// Handler for `POST /api/synthesize`.
///
/// The body is parsed leniently: anything that is not a JSON object ends up
/// as a validation error rather than an extractor rejection, so every
/// failure uses the same error shape.
pub async fn synthesize_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> AppResult<Response> {
    let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let request = validate_synthesis_payload(&payload, &state.config.synthesis_defaults())?;

    info!(
        voice = %request.voice_name,
        rate = request.rate,
        pitch = request.pitch,
        chars = request.text.chars().count(),
        "Synthesis request received"
    );

    // Cancelled when the client goes away and this future is dropped.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let audio = state
        .core_state
        .pipeline
        .synthesize_with_cancel(&request, state.config.max_chars_per_chunk, &cancel)
        .await?;

    info!(bytes = audio.len(), "Synthesis completed");

    let format = request.output_format;
    let disposition = format!("attachment; filename=\"{}\"", attachment_filename(format));
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(format.content_type())),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        audio,
    )
        .into_response())
}
