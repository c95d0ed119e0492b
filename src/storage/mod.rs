//! Text-by-key persistence behind the store.
//!
//! The store only ever needs `get`/`set` of one serialized blob; backends
//! decide where that blob lives. External change notification is optional.

mod file;
mod sqlite;

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;

use crate::watch::{ChangeCallback, ChangeWatcher};

pub use file::FileStorage;
pub use sqlite::SqliteStorage;

/// Key holding the whole idea collection.
pub const STORAGE_KEY: &str = "ideas-stack-data";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),
    #[error("invalid storage path: {}", .0.display())]
    InvalidPath(PathBuf),
}

pub trait Storage {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Calls `on_change` whenever the value under `key` is replaced by another
    /// process. Backends without a way to observe that return `Ok(None)`.
    fn watch(
        &self,
        _key: &str,
        _on_change: ChangeCallback,
    ) -> Result<Option<ChangeWatcher>, StorageError> {
        Ok(None)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Backend chosen at runtime by the command line.
pub enum AnyStorage {
    File(FileStorage),
    Sqlite(SqliteStorage),
}

impl Storage for AnyStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self {
            AnyStorage::File(storage) => storage.get(key).await,
            AnyStorage::Sqlite(storage) => storage.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        match self {
            AnyStorage::File(storage) => storage.set(key, value).await,
            AnyStorage::Sqlite(storage) => storage.set(key, value).await,
        }
    }

    fn watch(
        &self,
        key: &str,
        on_change: ChangeCallback,
    ) -> Result<Option<ChangeWatcher>, StorageError> {
        match self {
            AnyStorage::File(storage) => storage.watch(key, on_change),
            AnyStorage::Sqlite(storage) => storage.watch(key, on_change),
        }
    }
}
