//! Application state.

use std::path::PathBuf;
use std::sync::Arc;

use rsend_render::{RenderConfig, RenderOrchestrator};
use rsend_storage::LocalCacheStore;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub orchestrator: Arc<RenderOrchestrator>,
    /// Canonical form of `config.source_root`
    pub source_root: Arc<PathBuf>,
}

impl AppState {
    /// Create state around an existing orchestrator.
    pub fn new(config: ApiConfig, orchestrator: RenderOrchestrator) -> std::io::Result<Self> {
        let source_root = std::fs::canonicalize(&config.source_root)?;
        Ok(Self {
            config,
            orchestrator: Arc::new(orchestrator),
            source_root: Arc::new(source_root),
        })
    }

    /// Initialize the cache root and wire the default engines.
    pub async fn from_config(
        config: ApiConfig,
        render: &RenderConfig,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let store = LocalCacheStore::init(&render.cache_root).await?;
        let orchestrator = RenderOrchestrator::with_default_engines(render, Arc::new(store));
        Ok(Self::new(config, orchestrator)?)
    }
}
