#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::ServerArgs;
pub use toml_config::{AppConfig, StorageBackend};

use crate::adapters::{file_store::JsonFileStore, memory_store::MemoryStore};
use crate::core::engine::RankingEngine;
use crate::core::milestones::MilestoneObserver;
use crate::domain::ports::RankingStore;
use crate::utils::error::Result;
use std::sync::Arc;

/// Opens the configured store.
pub async fn build_store(config: &AppConfig) -> Result<Arc<dyn RankingStore>> {
    let store: Arc<dyn RankingStore> = match config.storage.backend {
        StorageBackend::Memory => {
            tracing::info!("💾 Using in-memory store");
            Arc::new(MemoryStore::new())
        }
        StorageBackend::File => {
            tracing::info!("💾 Using JSON file store at {}", config.storage.data_dir);
            Arc::new(JsonFileStore::open(&config.storage.data_dir).await?)
        }
    };
    Ok(store)
}

pub async fn build_engine(config: &AppConfig) -> Result<RankingEngine> {
    let store = build_store(config).await?;
    Ok(RankingEngine::new(store)
        .with_observer(Arc::new(MilestoneObserver::new(config.ranking.milestones.clone())))
        .with_commit_retries(config.ranking.commit_retries))
}
