// Adapters layer: concrete implementations for external systems (storage, http client, export).

pub mod csv_export;
pub mod file_store;
pub mod http_client;
pub mod memory_store;
