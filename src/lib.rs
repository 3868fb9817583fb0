pub mod adapters;
pub mod api;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::ServerArgs;
pub use config::{build_engine, AppConfig};

pub use adapters::{file_store::JsonFileStore, http_client::RankClient, memory_store::MemoryStore};
pub use api::{router, AppState};
pub use core::{
    engine::RankingEngine,
    resolver::{resolve, Resolution},
    session::{ComparisonSession, Preference, SessionState},
};
pub use utils::error::{RankError, Result};
