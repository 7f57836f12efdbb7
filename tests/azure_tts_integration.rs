//! End-to-end tests for the synthesis pipeline.
//!
//! A `wiremock` server stands in for both the token bootstrap endpoint and
//! the regional synthesis endpoint, so the whole chain runs: signed bootstrap,
//! token caching, chunking, per-chunk retry and ordered concatenation.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voxrelay::core::providers::azure::{AzureEndpoints, TokenCache};
use voxrelay::core::tts::retry::RetryPolicy;
use voxrelay::core::tts::{SynthesisPipeline, SynthesisRequest, TTSError};
use voxrelay::utils::req_manager::ReqManager;

// ============================================================================
// Test Helpers
// ============================================================================

const REGION: &str = "eastus";
const SYNTHESIS_PATH: &str = "/eastus/cognitiveservices/v1";

/// A token whose payload carries `exp` one hour from now.
fn fake_token() -> String {
    let exp = chrono::Utc::now().timestamp() + 3600;
    let payload = URL_SAFE_NO_PAD.encode(json!({ "exp": exp }).to_string());
    format!("eyJhbGciOiJIUzI1NiJ9.{payload}.c2ln")
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(20),
    }
}

fn endpoints_for(server: &MockServer) -> AzureEndpoints {
    AzureEndpoints {
        bootstrap_url: format!("{}/apps/endpoint", server.uri()),
        synthesis_url_template: format!("{}/{{region}}/cognitiveservices/v1", server.uri()),
        voices_list_url: format!("{}/voices/list", server.uri()),
    }
}

fn pipeline_for(server: &MockServer) -> SynthesisPipeline {
    let manager = Arc::new(ReqManager::new(4).unwrap());
    let endpoints = endpoints_for(server);
    let tokens = Arc::new(TokenCache::new(
        endpoints.bootstrap_url.clone(),
        manager.clone(),
        60,
    ));
    SynthesisPipeline::new(tokens, manager, endpoints, fast_retry())
}

async fn mount_bootstrap(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/apps/endpoint"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "t": token, "r": REGION })))
        .mount(server)
        .await;
}

// ============================================================================
// Ordering and assembly
// ============================================================================

#[tokio::test]
async fn test_chunks_are_concatenated_in_input_order() {
    let server = MockServer::start().await;
    mount_bootstrap(&server, &fake_token()).await;

    for (marker, bytes) in [("一二三", vec![1u8, 1]), ("四五六", vec![2u8]), ("七八九", vec![3u8, 3, 3])] {
        Mock::given(method("POST"))
            .and(path(SYNTHESIS_PATH))
            .and(body_string_contains(marker))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes))
            .expect(1)
            .mount(&server)
            .await;
    }

    let pipeline = pipeline_for(&server);
    let request = SynthesisRequest::new("一二三。四五六。七八九。");

    let audio = pipeline.synthesize(&request, 4).await.unwrap();
    assert_eq!(audio, vec![1, 1, 2, 3, 3, 3]);
}

#[tokio::test]
async fn test_concurrent_chunks_keep_input_order() {
    let server = MockServer::start().await;
    mount_bootstrap(&server, &fake_token()).await;

    // The first chunk answers last.
    Mock::given(method("POST"))
        .and(path(SYNTHESIS_PATH))
        .and(body_string_contains("一二三"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![1u8])
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SYNTHESIS_PATH))
        .and(body_string_contains("四五六"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![2u8]))
        .mount(&server)
        .await;

    let pipeline = pipeline_for(&server).with_chunk_concurrency(2);
    let request = SynthesisRequest::new("一二三。四五六。");

    let audio = pipeline.synthesize(&request, 4).await.unwrap();
    assert_eq!(audio, vec![1, 2]);
}

#[tokio::test]
async fn test_blank_text_is_rejected_without_network() {
    let server = MockServer::start().await;
    let pipeline = pipeline_for(&server);

    let result = pipeline.synthesize(&SynthesisRequest::new(" \n\n "), 1200).await;
    assert!(matches!(result, Err(TTSError::EmptyInput)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

// ============================================================================
// Retry behaviour
// ============================================================================

#[tokio::test]
async fn test_chunk_succeeds_after_two_failures() {
    let server = MockServer::start().await;
    mount_bootstrap(&server, &fake_token()).await;

    Mock::given(method("POST"))
        .and(path(SYNTHESIS_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("busy"))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SYNTHESIS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8, 7]))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = pipeline_for(&server);
    let audio = pipeline
        .synthesize(&SynthesisRequest::new("你好。"), 1200)
        .await
        .unwrap();
    assert_eq!(audio, vec![7, 7]);
}

#[tokio::test]
async fn test_exhausted_chunk_fails_whole_call() {
    let server = MockServer::start().await;
    mount_bootstrap(&server, &fake_token()).await;

    Mock::given(method("POST"))
        .and(path(SYNTHESIS_PATH))
        .and(body_string_contains("一二三"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8]))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SYNTHESIS_PATH))
        .and(body_string_contains("四五六"))
        .respond_with(ResponseTemplate::new(500).set_body_string("x".repeat(500)))
        .expect(3)
        .mount(&server)
        .await;

    let pipeline = pipeline_for(&server);
    let result = pipeline
        .synthesize(&SynthesisRequest::new("一二三。四五六。"), 4)
        .await;

    match result {
        Err(TTSError::UpstreamRequest { status, body }) => {
            assert_eq!(status, 500);
            assert!(body.chars().count() <= 203);
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

// ============================================================================
// Credential handling
// ============================================================================

#[tokio::test]
async fn test_token_is_bootstrapped_once_across_chunks() {
    let server = MockServer::start().await;
    let token = fake_token();

    Mock::given(method("POST"))
        .and(path("/apps/endpoint"))
        .and(header_exists("X-MT-Signature"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "t": token, "r": REGION })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SYNTHESIS_PATH))
        .and(header("Authorization", format!("Bearer {token}").as_str()))
        .and(header("Content-Type", "application/ssml+xml"))
        .and(header("X-Microsoft-OutputFormat", "audio-24khz-48kbitrate-mono-mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8]))
        .expect(3)
        .mount(&server)
        .await;

    let pipeline = pipeline_for(&server);
    let audio = pipeline
        .synthesize(&SynthesisRequest::new("一二三。四五六。七八九。"), 4)
        .await
        .unwrap();
    assert_eq!(audio.len(), 3);
}

#[tokio::test]
async fn test_bootstrap_failure_is_not_cached() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/apps/endpoint"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(3)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_bootstrap(&server, &fake_token()).await;
    Mock::given(method("POST"))
        .and(path(SYNTHESIS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![9u8]))
        .mount(&server)
        .await;

    let pipeline = pipeline_for(&server);
    let request = SynthesisRequest::new("你好。");

    let first = pipeline.synthesize(&request, 1200).await;
    assert!(matches!(first, Err(TTSError::CredentialAcquisition(_))));

    let second = pipeline.synthesize(&request, 1200).await.unwrap();
    assert_eq!(second, vec![9]);
}

#[tokio::test]
async fn test_unusable_region_is_refetched_on_next_call() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/apps/endpoint"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "t": fake_token(), "r": "bad/region" })),
        )
        .up_to_n_times(3)
        .with_priority(1)
        .expect(3)
        .mount(&server)
        .await;
    mount_bootstrap(&server, &fake_token()).await;
    Mock::given(method("POST"))
        .and(path(SYNTHESIS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![5u8]))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = pipeline_for(&server);
    let request = SynthesisRequest::new("你好。");

    let first = pipeline.synthesize(&request, 1200).await;
    assert!(matches!(first, Err(TTSError::CredentialAcquisition(_))));

    let second = pipeline.synthesize(&request, 1200).await.unwrap();
    assert_eq!(second, vec![5]);
}

#[tokio::test]
async fn test_rejected_token_is_refreshed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/apps/endpoint"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "t": fake_token(), "r": REGION })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SYNTHESIS_PATH))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SYNTHESIS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![4u8]))
        .mount(&server)
        .await;

    let pipeline = pipeline_for(&server);
    let audio = pipeline
        .synthesize(&SynthesisRequest::new("你好。"), 1200)
        .await
        .unwrap();
    assert_eq!(audio, vec![4]);
}

// ============================================================================
// Markup and cancellation
// ============================================================================

#[tokio::test]
async fn test_markup_escapes_user_text() {
    let server = MockServer::start().await;
    mount_bootstrap(&server, &fake_token()).await;

    Mock::given(method("POST"))
        .and(path(SYNTHESIS_PATH))
        .and(body_string_contains("a &lt; b &amp;&amp; c &gt; d"))
        .and(body_string_contains("<prosody rate=\"10%\" pitch=\"-5%\">"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8]))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = pipeline_for(&server);
    let mut request = SynthesisRequest::new("a < b && c > d");
    request.rate = 10;
    request.pitch = -5;

    assert_eq!(pipeline.synthesize(&request, 1200).await.unwrap(), vec![1]);
}

#[tokio::test]
async fn test_cancellation_aborts_in_flight_synthesis() {
    let server = MockServer::start().await;
    mount_bootstrap(&server, &fake_token()).await;

    Mock::given(method("POST"))
        .and(path(SYNTHESIS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![1u8])
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let pipeline = pipeline_for(&server);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let result = pipeline
        .synthesize_with_cancel(&SynthesisRequest::new("你好。"), 1200, &cancel)
        .await;

    assert!(matches!(result, Err(TTSError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(5));
}
