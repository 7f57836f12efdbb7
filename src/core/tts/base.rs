//! # Synthesis request model and error taxonomy
//!
//! Types shared by every stage of the synthesis pipeline: the validated
//! [`SynthesisRequest`], the [`TTSError`] taxonomy and the request validator
//! that turns an untrusted JSON payload into a request.
//!
//! ```rust
//! use voxrelay::core::tts::{SynthesisDefaults, validate_synthesis_payload};
//!
//! let payload = serde_json::json!({ "text": "你好。", "rate": "10" });
//! let request = validate_synthesis_payload(&payload, &SynthesisDefaults::default()).unwrap();
//! assert_eq!(request.rate, 10);
//! assert_eq!(request.voice_name, "zh-CN-XiaoxiaoNeural");
//! ```

use serde_json::Value;

use super::azure::AzureAudioEncoding;
use super::chunker::normalize_text;

/// Voice used when the caller does not name one.
pub const DEFAULT_VOICE_NAME: &str = "zh-CN-XiaoxiaoNeural";

/// Speaking style used when the caller does not name one.
pub const DEFAULT_STYLE: &str = "narration-relaxed";

/// Lower and upper bound for the rate and pitch percentage modifiers.
pub const PROSODY_RANGE: std::ops::RangeInclusive<i32> = -100..=100;

/// Longest upstream error body (in characters) carried inside an error.
pub const MAX_ERROR_BODY_CHARS: usize = 200;

/// TTS-specific error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum TTSError {
    #[error("{0}")]
    Validation(String),

    #[error("No text left to synthesize after chunking")]
    EmptyInput,

    #[error("Credential acquisition failed: {0}")]
    CredentialAcquisition(String),

    #[error("Upstream synthesis request failed ({status}): {body}")]
    UpstreamRequest { status: u16, body: String },

    #[error("Markup encoding failed: {0}")]
    MarkupEncoding(String),

    #[error("Voice catalog fetch failed: {0}")]
    CatalogFetch(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("Synthesis cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl TTSError {
    /// Whether another attempt of the same operation could succeed.
    ///
    /// Caller mistakes, configuration problems and cancellation are final.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TTSError::CredentialAcquisition(_)
                | TTSError::UpstreamRequest { .. }
                | TTSError::NetworkError(_)
                | TTSError::TimeoutError(_)
        )
    }

    /// Build an error from a transport-level reqwest failure.
    pub fn from_reqwest(context: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TTSError::TimeoutError(format!("{context}: {err}"))
        } else {
            TTSError::NetworkError(format!("{context}: {err}"))
        }
    }
}

/// Result type for TTS operations
pub type TTSResult<T> = Result<T, TTSError>;

/// Cut an upstream error body down to [`MAX_ERROR_BODY_CHARS`] characters.
pub fn truncate_error_body(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// One synthesis call as requested by a caller.
///
/// Chunk-specific copies made with [`SynthesisRequest::with_text`] share every
/// field except `text`.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    /// Text to speak
    pub text: String,
    /// Upstream voice short name, e.g. `zh-CN-XiaoxiaoNeural`
    pub voice_name: String,
    /// Speaking rate modifier in percent, within [`PROSODY_RANGE`]
    pub rate: i32,
    /// Pitch modifier in percent, within [`PROSODY_RANGE`]
    pub pitch: i32,
    /// Expressive style passed to `mstts:express-as`
    pub style: String,
    /// Audio format requested from the upstream service
    pub output_format: AzureAudioEncoding,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..SynthesisDefaults::default().request_template()
        }
    }

    /// Copy of this request carrying different text.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice_name: self.voice_name.clone(),
            rate: self.rate,
            pitch: self.pitch,
            style: self.style.clone(),
            output_format: self.output_format,
        }
    }
}

/// Values filled in for fields a caller leaves out.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisDefaults {
    pub voice_name: String,
    pub style: String,
    pub output_format: AzureAudioEncoding,
}

impl Default for SynthesisDefaults {
    fn default() -> Self {
        Self {
            voice_name: DEFAULT_VOICE_NAME.to_string(),
            style: DEFAULT_STYLE.to_string(),
            output_format: AzureAudioEncoding::default(),
        }
    }
}

impl SynthesisDefaults {
    fn request_template(&self) -> SynthesisRequest {
        SynthesisRequest {
            text: String::new(),
            voice_name: self.voice_name.clone(),
            rate: 0,
            pitch: 0,
            style: self.style.clone(),
            output_format: self.output_format,
        }
    }
}

/// Validate an untrusted JSON payload and build a [`SynthesisRequest`].
///
/// Rules:
/// - the payload must be a JSON object
/// - `text` is CRLF-normalized and must contain something besides whitespace
/// - `voice_name` and `style` fall back to `defaults` when missing or blank
/// - `rate` and `pitch` accept integers or integer strings within [-100, 100]
///   and default to `0`
pub fn validate_synthesis_payload(
    payload: &Value,
    defaults: &SynthesisDefaults,
) -> TTSResult<SynthesisRequest> {
    let object = payload
        .as_object()
        .ok_or_else(|| TTSError::Validation("Request body must be a JSON object.".to_string()))?;

    let text = object.get("text").map(value_to_string).unwrap_or_default();
    let text = normalize_text(&text);
    if text.trim().is_empty() {
        return Err(TTSError::Validation(
            "Please provide the text to synthesize.".to_string(),
        ));
    }

    let voice_name = non_blank(object.get("voice_name")).unwrap_or_else(|| defaults.voice_name.clone());
    let style = non_blank(object.get("style")).unwrap_or_else(|| defaults.style.clone());
    let rate = parse_prosody(object.get("rate"), "rate")?;
    let pitch = parse_prosody(object.get("pitch"), "pitch")?;

    Ok(SynthesisRequest {
        text,
        voice_name,
        rate,
        pitch,
        style,
        output_format: defaults.output_format,
    })
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn non_blank(value: Option<&Value>) -> Option<String> {
    value
        .map(value_to_string)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_prosody(value: Option<&Value>, name: &str) -> TTSResult<i32> {
    let Some(raw) = non_blank(value) else {
        return Ok(0);
    };

    let digits = raw.strip_prefix(['+', '-']).unwrap_or(&raw);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(TTSError::Validation(format!(
            "{name} must be an integer between -100 and 100."
        )));
    }

    let number = raw
        .parse::<i32>()
        .ok()
        .filter(|n| PROSODY_RANGE.contains(n));

    match number {
        Some(n) => Ok(n),
        None => Err(TTSError::Validation(format!(
            "{name} is out of range, use a value between -100 and 100."
        ))),
    }
}
