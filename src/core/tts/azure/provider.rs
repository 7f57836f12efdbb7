//! Chunked synthesis against the Azure Text-to-Speech REST endpoint.
//!
//! [`SynthesisPipeline`] turns one [`SynthesisRequest`] into one audio buffer:
//!
//! 1. The text is split into chunks ([`chunk_text`])
//! 2. Every chunk is fetched with its own retry envelope ([`RetryPolicy`]).
//!    Each attempt asks the [`TokenCache`] for a credential, renders SSML and
//!    POSTs it to the regional synthesis endpoint
//! 3. Chunk audio is concatenated in input order
//!
//! A chunk that exhausts its attempts fails the whole call and no partial
//! audio is returned.
//!
//! # Request Format
//!
//! - **URL**: `https://{region}.tts.speech.microsoft.com/cognitiveservices/v1`
//! - **Method**: POST
//! - **Headers**: `Authorization: Bearer <token>`,
//!   `Content-Type: application/ssml+xml`, `X-Microsoft-OutputFormat`,
//!   `User-Agent`
//! - **Body**: SSML document from [`build_ssml`]
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! use std::sync::Arc;
//! use voxrelay::core::providers::azure::{AzureEndpoints, TokenCache};
//! use voxrelay::core::tts::{RetryPolicy, SynthesisRequest};
//! use voxrelay::core::tts::azure::SynthesisPipeline;
//! use voxrelay::utils::req_manager::ReqManager;
//!
//! let endpoints = AzureEndpoints::default();
//! let manager = Arc::new(ReqManager::new(8)?);
//! let tokens = Arc::new(TokenCache::new(endpoints.bootstrap_url.clone(), manager.clone(), 60));
//! let pipeline = SynthesisPipeline::new(tokens, manager, endpoints, RetryPolicy::default());
//!
//! let audio = pipeline.synthesize(&SynthesisRequest::new("你好，世界。"), 1200).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Instant;

use futures::{StreamExt, TryStreamExt, stream};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::{AZURE_OUTPUT_FORMAT_HEADER, SSML_CONTENT_TYPE, build_ssml};
use crate::core::providers::azure::auth::CLIENT_USER_AGENT;
use crate::core::providers::azure::{AzureEndpoints, Credential, TokenCache, build_bearer_token_header};
use crate::core::tts::base::{SynthesisRequest, TTSError, TTSResult, truncate_error_body};
use crate::core::tts::chunker::chunk_text;
use crate::core::tts::retry::RetryPolicy;
use crate::utils::req_manager::ReqManager;

// =============================================================================
// AzureRequestBuilder
// =============================================================================

/// Builds synthesis HTTP requests for a credential and a chunk.
#[derive(Debug, Clone)]
pub struct AzureRequestBuilder {
    endpoints: AzureEndpoints,
}

impl AzureRequestBuilder {
    pub fn new(endpoints: AzureEndpoints) -> Self {
        Self { endpoints }
    }

    /// Build the synthesis request for `request` authorized by `credential`.
    ///
    /// # Errors
    ///
    /// [`TTSError::CredentialAcquisition`] if the credential names an unusable
    /// region, [`TTSError::MarkupEncoding`] if the request cannot be encoded.
    pub fn build_http_request(
        &self,
        client: &reqwest::Client,
        credential: &Credential,
        request: &SynthesisRequest,
    ) -> TTSResult<reqwest::Request> {
        let url = self.endpoints.synthesis_url(&credential.region)?;
        let ssml = build_ssml(request);

        client
            .post(url)
            .header(AUTHORIZATION, build_bearer_token_header(&credential.token))
            .header(CONTENT_TYPE, SSML_CONTENT_TYPE)
            .header(AZURE_OUTPUT_FORMAT_HEADER, request.output_format.as_str())
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .body(ssml)
            .build()
            .map_err(|e| TTSError::MarkupEncoding(format!("Failed to encode synthesis request: {e}")))
    }
}

// =============================================================================
// SynthesisPipeline
// =============================================================================

/// Turns text into audio through the chunk, fetch, concatenate pipeline.
pub struct SynthesisPipeline {
    token_cache: Arc<TokenCache>,
    req_manager: Arc<ReqManager>,
    request_builder: AzureRequestBuilder,
    retry: RetryPolicy,
    chunk_concurrency: usize,
}

impl SynthesisPipeline {
    pub fn new(
        token_cache: Arc<TokenCache>,
        req_manager: Arc<ReqManager>,
        endpoints: AzureEndpoints,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            token_cache,
            req_manager,
            request_builder: AzureRequestBuilder::new(endpoints),
            retry,
            chunk_concurrency: 1,
        }
    }

    /// Allow up to `concurrency` chunk fetches in flight at once.
    ///
    /// Output order is unaffected. Values below one are treated as one.
    pub fn with_chunk_concurrency(mut self, concurrency: usize) -> Self {
        self.chunk_concurrency = concurrency.max(1);
        self
    }

    /// Synthesize `request.text` split into chunks of at most `max_chars`
    /// characters and return the concatenated audio.
    ///
    /// # Errors
    ///
    /// - [`TTSError::EmptyInput`] if the text yields nothing to speak
    /// - the last error of the first chunk that exhausted its attempts
    pub async fn synthesize(&self, request: &SynthesisRequest, max_chars: usize) -> TTSResult<Vec<u8>> {
        let chunks = chunk_text(&request.text, max_chars);
        if chunks.iter().all(|chunk| chunk.trim().is_empty()) {
            return Err(TTSError::EmptyInput);
        }

        let total = chunks.len();
        if total > 1 && !request.output_format.is_concatenable() {
            warn!(
                format = %request.output_format,
                chunks = total,
                "Output format carries a container header per chunk"
            );
        }

        info!(
            chunks = total,
            voice = %request.voice_name,
            format = %request.output_format,
            "Starting synthesis"
        );
        let started = Instant::now();

        let parts: Vec<Vec<u8>> = stream::iter(chunks.into_iter().enumerate())
            .map(|(index, text)| {
                let chunk_request = request.with_text(text);
                async move { self.fetch_chunk_with_retry(index, total, &chunk_request).await }
            })
            .buffered(self.chunk_concurrency)
            .try_collect()
            .await?;

        let audio = parts.concat();
        info!(
            chunks = total,
            bytes = audio.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Synthesis complete"
        );
        debug!("{}", self.req_manager.metrics().summary());
        Ok(audio)
    }

    /// Like [`SynthesisPipeline::synthesize`], aborting with
    /// [`TTSError::Cancelled`] as soon as `cancel` fires.
    ///
    /// In-flight requests and retry delays are dropped on cancellation.
    pub async fn synthesize_with_cancel(
        &self,
        request: &SynthesisRequest,
        max_chars: usize,
        cancel: &CancellationToken,
    ) -> TTSResult<Vec<u8>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Synthesis cancelled");
                Err(TTSError::Cancelled)
            }
            result = self.synthesize(request, max_chars) => result,
        }
    }

    async fn fetch_chunk_with_retry(
        &self,
        index: usize,
        total: usize,
        request: &SynthesisRequest,
    ) -> TTSResult<Vec<u8>> {
        let result = self
            .retry
            .run(
                |attempt| {
                    debug!(chunk = index + 1, total, attempt, "Fetching chunk");
                    self.fetch_chunk(request)
                },
                TTSError::is_retryable,
            )
            .await;

        if let Err(e) = &result {
            error!(chunk = index + 1, total, "Chunk synthesis failed: {}", e);
        }
        result
    }

    /// One attempt at one chunk.
    async fn fetch_chunk(&self, request: &SynthesisRequest) -> TTSResult<Vec<u8>> {
        // Credential first: a refresh needs a client permit of its own.
        let credential = self.token_cache.get_valid_credential().await?;

        let guard = self
            .req_manager
            .acquire()
            .await
            .map_err(|e| TTSError::NetworkError(format!("HTTP client unavailable: {e}")))?;

        let http_request = self
            .request_builder
            .build_http_request(guard.client(), &credential, request)?;

        let response = guard
            .execute(http_request)
            .await
            .map_err(|e| TTSError::from_reqwest("Synthesis request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            drop(guard);
            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
                self.token_cache.invalidate(&credential).await;
            }
            return Err(TTSError::UpstreamRequest {
                status: status.as_u16(),
                body: truncate_error_body(&body),
            });
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| TTSError::from_reqwest("Failed to read synthesis audio", e))?;

        debug!(bytes = audio.len(), "Chunk audio received");
        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tts::azure::AzureAudioEncoding;

    fn credential() -> Credential {
        Credential {
            token: "tok".to_string(),
            region: "westus2".to_string(),
            expires_at: i64::MAX,
        }
    }

    #[test]
    fn test_build_http_request() {
        let builder = AzureRequestBuilder::new(AzureEndpoints::default());
        let client = reqwest::Client::new();
        let request = SynthesisRequest {
            output_format: AzureAudioEncoding::Riff24Khz16BitMonoPcm,
            ..SynthesisRequest::new("hi & bye")
        };

        let http = builder.build_http_request(&client, &credential(), &request).unwrap();

        assert_eq!(http.method(), reqwest::Method::POST);
        assert_eq!(
            http.url().as_str(),
            "https://westus2.tts.speech.microsoft.com/cognitiveservices/v1"
        );
        let headers = http.headers();
        assert_eq!(headers[AUTHORIZATION], "Bearer tok");
        assert_eq!(headers[CONTENT_TYPE], "application/ssml+xml");
        assert_eq!(headers[AZURE_OUTPUT_FORMAT_HEADER], "riff-24khz-16bit-mono-pcm");

        let body = http.body().and_then(|b| b.as_bytes()).unwrap();
        let body = std::str::from_utf8(body).unwrap();
        assert!(body.contains("hi &amp; bye"));
    }

    #[test]
    fn test_build_http_request_rejects_bad_region() {
        let builder = AzureRequestBuilder::new(AzureEndpoints::default());
        let bad = Credential {
            region: "x/y".to_string(),
            ..credential()
        };
        let err = builder
            .build_http_request(&reqwest::Client::new(), &bad, &SynthesisRequest::new("x"))
            .unwrap_err();
        assert!(matches!(err, TTSError::CredentialAcquisition(_)));
    }

    #[test]
    fn test_build_http_request_rejects_unencodable_token() {
        let builder = AzureRequestBuilder::new(AzureEndpoints::default());
        let bad = Credential {
            token: "line\nbreak".to_string(),
            ..credential()
        };
        let err = builder
            .build_http_request(&reqwest::Client::new(), &bad, &SynthesisRequest::new("x"))
            .unwrap_err();
        assert!(matches!(err, TTSError::MarkupEncoding(_)));
    }
}
