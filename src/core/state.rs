use std::sync::Arc;

use tracing::info;

use crate::config::ServerConfig;
use crate::core::providers::azure::TokenCache;
use crate::core::tts::{SynthesisPipeline, VoiceCatalog};
use crate::utils::req_manager::ReqManager;

/// Core-specific shared state for the application.
///
/// Owns the long-lived upstream resources: the outbound HTTP client, the
/// credential cache, the synthesis pipeline and the voice catalog. Built once
/// at startup and shared by every request.
#[derive(Clone)]
pub struct CoreState {
    /// Shared outbound HTTP client and concurrency limit
    pub req_manager: Arc<ReqManager>,
    /// Cached synthesis credential
    pub token_cache: Arc<TokenCache>,
    /// Chunked synthesis pipeline
    pub pipeline: Arc<SynthesisPipeline>,
    /// Process-lifetime voice catalog
    pub voice_catalog: Arc<VoiceCatalog>,
}

impl CoreState {
    /// Initialize core state from the server configuration.
    pub fn new(
        config: &ServerConfig,
    ) -> Result<Arc<Self>, Box<dyn std::error::Error + Send + Sync>> {
        let req_manager = Arc::new(ReqManager::with_config(config.req_manager_config())?);
        info!(
            "Initialized ReqManager with {} concurrent connections",
            req_manager.max_concurrent_requests()
        );

        let endpoints = config.endpoints();

        let token_cache = Arc::new(TokenCache::new(
            endpoints.bootstrap_url.clone(),
            req_manager.clone(),
            config.token_refresh_margin_secs,
        ));

        let voice_catalog = Arc::new(VoiceCatalog::new(
            endpoints.voices_list_url.clone(),
            req_manager.clone(),
        ));

        let pipeline = Arc::new(
            SynthesisPipeline::new(
                token_cache.clone(),
                req_manager.clone(),
                endpoints,
                config.retry_policy(),
            )
            .with_chunk_concurrency(config.chunk_concurrency),
        );

        Ok(Arc::new(Self {
            req_manager,
            token_cache,
            pipeline,
            voice_catalog,
        }))
    }
}
