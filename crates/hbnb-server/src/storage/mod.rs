//! Storage backends
//!
//! `file` keeps every object in memory and snapshots to one JSON file.
//! `db` uses SQLite (embedded) with one table per kind.

pub mod db;
pub mod file;

pub use db::DbStorage;
pub use file::FileStorage;

use crate::config::{Settings, StorageType};
use hbnb_core::{Result, Storage};
use std::sync::Arc;
use tracing::info;

/// Construct the backend `settings` select and load its durable state
pub async fn open(settings: &Settings) -> Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match settings.type_storage {
        StorageType::File => {
            info!("Using file storage at {}", settings.file_path.display());
            Arc::new(FileStorage::new(&settings.file_path))
        }
        StorageType::Db => {
            info!("Using database storage at {}", settings.db_path.display());
            Arc::new(DbStorage::connect(&settings.db_path).await?)
        }
    };
    storage.reload().await?;
    Ok(storage)
}
