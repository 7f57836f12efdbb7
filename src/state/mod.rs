use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::CoreState;

/// Application state that can be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    /// Core layer state that holds the upstream resources
    pub core_state: Arc<CoreState>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Arc<Self>, Box<dyn std::error::Error + Send + Sync>> {
        let core_state = CoreState::new(&config)?;
        Ok(Arc::new(Self { config, core_state }))
    }

    /// Warm the voice catalog in the background.
    pub fn spawn_voice_prefetch(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let catalog = self.core_state.voice_catalog.clone();
        tokio::spawn(async move {
            let voices = catalog.list_voices().await;
            tracing::info!(count = voices.len(), "Voice catalog prefetched");
        })
    }
}
