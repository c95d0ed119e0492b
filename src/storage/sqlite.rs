use std::path::Path;

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};

use super::{Storage, StorageError};
use crate::db;
use crate::entities::kv_entry;

/// Key/value rows in a single SQLite table.
pub struct SqliteStorage {
    db: DatabaseConnection,
}

impl SqliteStorage {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        db::ensure_parent_dir(path)?;
        let db = db::connect(path).await?;
        db::ensure_schema(&db).await?;
        tracing::debug!(
            target: "storage::sqlite",
            path = %path.display(),
            "Opened sqlite storage"
        );
        Ok(Self::new(db))
    }
}

impl Storage for SqliteStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entry = kv_entry::Entity::find_by_id(key.to_string())
            .one(&self.db)
            .await?;
        Ok(entry.map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let active = kv_entry::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            updated_at: Set(Utc::now()),
        };
        kv_entry::Entity::insert(active)
            .on_conflict(
                OnConflict::column(kv_entry::Column::Key)
                    .update_columns([kv_entry::Column::Value, kv_entry::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }
}
