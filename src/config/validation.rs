use super::ServerConfig;
use crate::core::providers::azure::MIN_REFRESH_MARGIN_SECS;
use crate::core::providers::azure::endpoints::REGION_PLACEHOLDER;

/// Run every configuration check
pub fn validate_config(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    validate_chunking(config.max_chars_per_chunk, config.chunk_concurrency)?;
    validate_retry(
        config.retry_max_attempts,
        config.retry_initial_backoff_ms,
        config.retry_max_backoff_ms,
    )?;
    validate_token_margin(config.token_refresh_margin_secs)?;
    validate_http(config.max_concurrent_requests, config.request_timeout_secs)?;
    validate_synthesis_template(&config.synthesis_url_template)?;
    Ok(())
}

/// Validate chunk size and chunk fetch concurrency
pub fn validate_chunking(
    max_chars_per_chunk: usize,
    chunk_concurrency: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    if max_chars_per_chunk == 0 {
        return Err("TTS_MAX_CHARS_PER_CHUNK must be greater than 0".into());
    }
    if chunk_concurrency == 0 {
        return Err("TTS_CHUNK_CONCURRENCY must be greater than 0".into());
    }
    Ok(())
}

/// Validate the retry schedule
///
/// At least one attempt is required and the first back-off may not exceed the cap.
pub fn validate_retry(
    max_attempts: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    if max_attempts == 0 {
        return Err("TTS_RETRY_MAX_ATTEMPTS must be at least 1".into());
    }
    if initial_backoff_ms > max_backoff_ms {
        return Err(format!(
            "TTS_RETRY_INITIAL_BACKOFF_MS ({initial_backoff_ms}) must not exceed TTS_RETRY_MAX_BACKOFF_MS ({max_backoff_ms})"
        )
        .into());
    }
    Ok(())
}

/// Validate the credential refresh margin
pub fn validate_token_margin(margin_secs: u64) -> Result<(), Box<dyn std::error::Error>> {
    if margin_secs < MIN_REFRESH_MARGIN_SECS {
        return Err(format!(
            "TTS_TOKEN_REFRESH_MARGIN_SECONDS must be at least {MIN_REFRESH_MARGIN_SECS}, got {margin_secs}"
        )
        .into());
    }
    Ok(())
}

/// Validate outbound HTTP limits
pub fn validate_http(
    max_concurrent_requests: usize,
    request_timeout_secs: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    if max_concurrent_requests == 0 || max_concurrent_requests > 1000 {
        return Err("TTS_MAX_CONCURRENT_REQUESTS must be between 1 and 1000".into());
    }
    if request_timeout_secs == 0 {
        return Err("TTS_REQUEST_TIMEOUT_SECONDS must be greater than 0".into());
    }
    Ok(())
}

/// Validate that the synthesis URL template can be filled with a region
pub fn validate_synthesis_template(template: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !template.contains(REGION_PLACEHOLDER) {
        return Err(format!(
            "TTS_SYNTHESIS_URL_TEMPLATE must contain {REGION_PLACEHOLDER}: {template}"
        )
        .into());
    }
    Ok(())
}
