//! Configuration module for the voxrelay server
//!
//! This module handles server configuration from various sources: YAML files and
//! environment variables. The configuration is split into logical submodules.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `utils`: Utility functions for configuration parsing
//!
//! # Example
//! ```rust,no_run
//! use voxrelay::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file, environment filling the gaps
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use crate::core::providers::azure::AzureEndpoints;
use crate::core::tts::{AzureAudioEncoding, RetryPolicy, SynthesisDefaults};
use crate::utils::req_manager::ReqManagerConfig;

mod env;
mod merge;
mod utils;
mod validation;
mod yaml;

/// Server configuration
///
/// Contains everything needed to run the server:
/// - Server settings (host, port)
/// - Upstream endpoints and HTTP client limits
/// - Chunking, retry and credential refresh settings
/// - Defaults applied to synthesis requests
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // Upstream endpoints
    pub bootstrap_url: String,
    pub synthesis_url_template: String,
    pub voices_list_url: String,

    // Outbound HTTP
    pub request_timeout_secs: u64,
    pub max_concurrent_requests: usize,
    pub token_refresh_margin_secs: u64,

    // Synthesis
    pub max_chars_per_chunk: usize,
    pub chunk_concurrency: usize,
    pub output_format: AzureAudioEncoding,
    pub default_voice: String,
    pub default_style: String,

    // Retry
    pub retry_max_attempts: u32,
    pub retry_initial_backoff_ms: u64,
    pub retry_max_backoff_ms: u64,

    // Voice catalog
    pub prefetch_voices: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let endpoints = AzureEndpoints::default();
        let retry = RetryPolicy::default();
        let defaults = SynthesisDefaults::default();
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            bootstrap_url: endpoints.bootstrap_url,
            synthesis_url_template: endpoints.synthesis_url_template,
            voices_list_url: endpoints.voices_list_url,
            request_timeout_secs: 30,
            max_concurrent_requests: 8,
            token_refresh_margin_secs: 60,
            max_chars_per_chunk: crate::core::tts::DEFAULT_MAX_CHARS,
            chunk_concurrency: 1,
            output_format: defaults.output_format,
            default_voice: defaults.voice_name,
            default_style: defaults.style,
            retry_max_attempts: retry.max_attempts,
            retry_initial_backoff_ms: retry.initial_backoff.as_millis() as u64,
            retry_max_backoff_ms: retry.max_backoff.as_millis() as u64,
            prefetch_voices: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable fallbacks
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables
    /// 3. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        // .env is not loaded here; the YAML file is the source of truth and only
        // real environment variables fill its gaps.
        let yaml_config = yaml::YamlConfig::from_file(path)?;

        let config = merge::merge_config(Some(yaml_config))?;

        validation::validate_config(&config)?;

        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Upstream URLs
    pub fn endpoints(&self) -> AzureEndpoints {
        AzureEndpoints {
            bootstrap_url: self.bootstrap_url.clone(),
            synthesis_url_template: self.synthesis_url_template.clone(),
            voices_list_url: self.voices_list_url.clone(),
        }
    }

    /// Per-chunk retry schedule
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts,
            initial_backoff: Duration::from_millis(self.retry_initial_backoff_ms),
            max_backoff: Duration::from_millis(self.retry_max_backoff_ms),
        }
    }

    /// Values used for fields a synthesis request leaves out
    pub fn synthesis_defaults(&self) -> SynthesisDefaults {
        SynthesisDefaults {
            voice_name: self.default_voice.clone(),
            style: self.default_style.clone(),
            output_format: self.output_format,
        }
    }

    /// Settings for the shared outbound HTTP client
    pub fn req_manager_config(&self) -> ReqManagerConfig {
        ReqManagerConfig {
            max_concurrent_requests: self.max_concurrent_requests,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..Default::default()
        }
    }
}
