pub mod providers;
pub mod state;
pub mod tts;

// Re-export commonly used types for convenience
pub use tts::{SynthesisPipeline, SynthesisRequest, TTSError, TTSResult, VoiceCatalog};

// Re-export CoreState for external use
pub use state::CoreState;
