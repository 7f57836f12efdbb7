pub mod azure;
mod base;
pub mod chunker;
pub mod retry;
pub mod voices;

pub use azure::{AzureAudioEncoding, SynthesisPipeline};
pub use base::{
    DEFAULT_STYLE, DEFAULT_VOICE_NAME, MAX_ERROR_BODY_CHARS, PROSODY_RANGE, SynthesisDefaults,
    SynthesisRequest, TTSError, TTSResult, truncate_error_body, validate_synthesis_payload,
};
pub use chunker::{DEFAULT_MAX_CHARS, chunk_text, normalize_text};
pub use retry::RetryPolicy;
pub use voices::{VoiceCatalog, VoiceDescriptor, builtin_voices};
