use std::env;

use super::ServerConfig;
use super::utils::{parse_bool, parse_number};
use super::yaml::YamlConfig;
use crate::core::providers::azure::endpoints::{
    DEFAULT_BOOTSTRAP_URL, DEFAULT_SYNTHESIS_URL_TEMPLATE, DEFAULT_VOICES_LIST_URL,
};
use crate::core::tts::{AzureAudioEncoding, DEFAULT_MAX_CHARS, DEFAULT_STYLE, DEFAULT_VOICE_NAME};

/// Merge YAML configuration with environment variables
///
/// Priority order (highest to lowest):
/// 1. YAML configuration values
/// 2. Environment variables
/// 3. Default values
///
/// # Arguments
/// * `yaml_config` - Optional YAML configuration to use as overrides
///
/// # Returns
/// * `Result<ServerConfig, Box<dyn std::error::Error>>` - The merged configuration or an error
pub fn merge_config(
    yaml_config: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let yaml = yaml_config.unwrap_or_default();

    // Helper macro to get value with priority: YAML > ENV > Default
    macro_rules! get_value {
        ($env_var:expr, $yaml_value:expr, $default:expr) => {
            $yaml_value
                .or_else(|| env::var($env_var).ok())
                .unwrap_or_else(|| $default.to_string())
        };
    }

    // Numeric variant: YAML > parsed ENV > Default
    macro_rules! get_number {
        ($env_var:expr, $yaml_value:expr, $default:expr) => {
            match $yaml_value {
                Some(value) => value,
                None => match env::var($env_var) {
                    Ok(raw) => parse_number($env_var, &raw)?,
                    Err(_) => $default,
                },
            }
        };
    }

    let server = yaml.server.unwrap_or_default();
    let upstream = yaml.upstream.unwrap_or_default();
    let synthesis = yaml.synthesis.unwrap_or_default();
    let retry = yaml.retry.unwrap_or_default();
    let voices = yaml.voices.unwrap_or_default();

    // Server configuration
    let host = get_value!("HOST", server.host, "127.0.0.1");
    let port: u16 = get_number!("PORT", server.port, 5000);

    // Upstream endpoints
    let bootstrap_url = get_value!(
        "TTS_BOOTSTRAP_URL",
        upstream.bootstrap_url,
        DEFAULT_BOOTSTRAP_URL
    );
    let synthesis_url_template = get_value!(
        "TTS_SYNTHESIS_URL_TEMPLATE",
        upstream.synthesis_url_template,
        DEFAULT_SYNTHESIS_URL_TEMPLATE
    );
    let voices_list_url = get_value!(
        "TTS_VOICES_LIST_URL",
        upstream.voices_list_url,
        DEFAULT_VOICES_LIST_URL
    );

    // HTTP client and token settings
    let request_timeout_secs: u64 = get_number!(
        "TTS_REQUEST_TIMEOUT_SECONDS",
        upstream.request_timeout_seconds,
        30
    );
    let max_concurrent_requests: usize = get_number!(
        "TTS_MAX_CONCURRENT_REQUESTS",
        upstream.max_concurrent_requests,
        8
    );
    let token_refresh_margin_secs: u64 = get_number!(
        "TTS_TOKEN_REFRESH_MARGIN_SECONDS",
        upstream.token_refresh_margin_seconds,
        60
    );

    // Synthesis settings
    let max_chars_per_chunk: usize = get_number!(
        "TTS_MAX_CHARS_PER_CHUNK",
        synthesis.max_chars_per_chunk,
        DEFAULT_MAX_CHARS
    );
    let chunk_concurrency: usize =
        get_number!("TTS_CHUNK_CONCURRENCY", synthesis.chunk_concurrency, 1);
    let output_format = get_value!(
        "TTS_OUTPUT_FORMAT",
        synthesis.output_format,
        AzureAudioEncoding::default().as_str()
    );
    let output_format = output_format
        .parse::<AzureAudioEncoding>()
        .map_err(|e| format!("Invalid TTS_OUTPUT_FORMAT: {e}"))?;
    let default_voice = get_value!(
        "TTS_DEFAULT_VOICE",
        synthesis.default_voice,
        DEFAULT_VOICE_NAME
    );
    let default_style = get_value!(
        "TTS_DEFAULT_STYLE",
        synthesis.default_style,
        DEFAULT_STYLE
    );

    // Retry settings
    let retry_max_attempts: u32 =
        get_number!("TTS_RETRY_MAX_ATTEMPTS", retry.max_attempts, 3);
    let retry_initial_backoff_ms: u64 = get_number!(
        "TTS_RETRY_INITIAL_BACKOFF_MS",
        retry.initial_backoff_ms,
        2000
    );
    let retry_max_backoff_ms: u64 =
        get_number!("TTS_RETRY_MAX_BACKOFF_MS", retry.max_backoff_ms, 5000);

    // Voice catalog
    let prefetch_voices = match voices.prefetch {
        Some(value) => value,
        None => match env::var("TTS_PREFETCH_VOICES") {
            Ok(raw) => parse_bool(&raw)
                .ok_or_else(|| format!("Invalid TTS_PREFETCH_VOICES value '{raw}'"))?,
            Err(_) => false,
        },
    };

    Ok(ServerConfig {
        host,
        port,
        bootstrap_url,
        synthesis_url_template,
        voices_list_url,
        request_timeout_secs,
        max_concurrent_requests,
        token_refresh_margin_secs,
        max_chars_per_chunk,
        chunk_concurrency,
        output_format,
        default_voice,
        default_style,
        retry_max_attempts,
        retry_initial_backoff_ms,
        retry_max_backoff_ms,
        prefetch_voices,
    })
}
