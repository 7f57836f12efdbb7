//! Microsoft Azure Text-to-Speech synthesis.
//!
//! - **config**: output formats (`AzureAudioEncoding`) and SSML generation
//! - **provider**: `AzureRequestBuilder` and the chunked `SynthesisPipeline`

mod config;
mod provider;

// Re-export configuration types
pub use config::{
    AZURE_OUTPUT_FORMAT_HEADER, AzureAudioEncoding, SSML_CONTENT_TYPE, SSML_LANGUAGE, build_ssml,
    escape_xml,
};

// Re-export provider types
pub use provider::{AzureRequestBuilder, SynthesisPipeline};
