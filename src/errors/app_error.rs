use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::core::tts::TTSError;

/// Error codes for structured error responses
pub mod error_codes {
    pub const INVALID_REQUEST: &str = "invalid_request";
    pub const SYNTHESIS_FAILED: &str = "synthesis_failed";
    pub const CREDENTIAL_FAILED: &str = "credential_failed";
    pub const VOICE_LIST_FAILED: &str = "voice_list_failed";
    pub const CANCELLED: &str = "cancelled";
    pub const CONFIG_ERROR: &str = "config_error";
    pub const NOT_FOUND: &str = "not_found";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No route matched
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unexpected failure outside the synthesis pipeline
    #[error("Internal server error: {0}")]
    InternalServerError(String),

    /// Failure reported by the synthesis pipeline
    #[error(transparent)]
    Tts(#[from] TTSError),
}

impl AppError {
    /// Get the error code for structured error responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => error_codes::NOT_FOUND,
            AppError::InternalServerError(_) => error_codes::INTERNAL_ERROR,
            AppError::Tts(err) => match err {
                TTSError::Validation(_) | TTSError::EmptyInput => error_codes::INVALID_REQUEST,
                TTSError::CredentialAcquisition(_) => error_codes::CREDENTIAL_FAILED,
                TTSError::UpstreamRequest { .. }
                | TTSError::MarkupEncoding(_)
                | TTSError::NetworkError(_)
                | TTSError::TimeoutError(_) => error_codes::SYNTHESIS_FAILED,
                TTSError::CatalogFetch(_) => error_codes::VOICE_LIST_FAILED,
                TTSError::Cancelled => error_codes::CANCELLED,
                TTSError::InvalidConfiguration(_) => error_codes::CONFIG_ERROR,
            },
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Tts(err) => match err {
                TTSError::Validation(_) | TTSError::EmptyInput => StatusCode::BAD_REQUEST,
                TTSError::CredentialAcquisition(_)
                | TTSError::UpstreamRequest { .. }
                | TTSError::NetworkError(_)
                | TTSError::CatalogFetch(_) => StatusCode::BAD_GATEWAY,
                TTSError::TimeoutError(_) => StatusCode::GATEWAY_TIMEOUT,
                TTSError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                TTSError::MarkupEncoding(_) | TTSError::InvalidConfiguration(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Log the error at the appropriate level
    pub fn log(&self) {
        match self {
            // Debug level for caller mistakes
            AppError::NotFound(msg) => tracing::debug!("Not found: {}", msg),
            AppError::Tts(TTSError::Validation(msg)) => tracing::debug!("Invalid request: {}", msg),
            AppError::Tts(TTSError::EmptyInput) => tracing::debug!("{}", self),
            AppError::Tts(TTSError::Cancelled) => tracing::info!("Synthesis cancelled"),
            // Warn level for upstream trouble
            AppError::Tts(
                err @ (TTSError::CredentialAcquisition(_)
                | TTSError::UpstreamRequest { .. }
                | TTSError::NetworkError(_)
                | TTSError::TimeoutError(_)
                | TTSError::CatalogFetch(_)),
            ) => tracing::warn!("Upstream failure: {}", err),
            // Error level for bugs and misconfiguration
            AppError::Tts(err) => tracing::error!("{}", err),
            AppError::InternalServerError(msg) => tracing::error!("Internal server error: {}", msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.status_code();

        // Response format: {"error_code": "...", "message": "human readable message"}
        let body = Json(json!({
            "error_code": self.error_code(),
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
