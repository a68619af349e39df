//! The per-process application container.
//!
//! Everything a handler touches lives here explicitly (store handle, both
//! cache pools, catalog), so tests can spin up an isolated container per
//! case instead of sharing process globals.

use std::sync::Arc;
use std::time::Duration;

use propscope_cache::ResponseCache;
use propscope_core::catalog::DatasetCatalog;
use propscope_core::error::Result;
use propscope_store::ReadPool;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ReadPool>,
    pub api_cache: Arc<ResponseCache>,
    pub stats_cache: Arc<ResponseCache>,
    pub catalog: Arc<DatasetCatalog>,
    pub query_budget: Duration,
}

impl AppState {
    /// Open the store and catalog per the configuration.
    pub fn initialize(config: &Config) -> Result<Self> {
        let store = ReadPool::open(&config.store_path(), config.read_pool_size)?;
        let catalog = DatasetCatalog::load(&config.processed_dir())?;
        Ok(Self::assemble(store, catalog, config.query_budget))
    }

    /// Assemble a container from already-built parts (the test seam).
    pub fn assemble(store: ReadPool, catalog: DatasetCatalog, query_budget: Duration) -> Self {
        Self {
            store: Arc::new(store),
            api_cache: Arc::new(ResponseCache::api_pool()),
            stats_cache: Arc::new(ResponseCache::stats_pool()),
            catalog: Arc::new(catalog),
            query_budget,
        }
    }
}
