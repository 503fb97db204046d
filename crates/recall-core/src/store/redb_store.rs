// ============================================================================
// RedbStore — embedded structured store (redb)
// ============================================================================
// Persistent local storage for memory entries.
// Default path: ~/.recall/memories.redb (override via RECALL_DB_PATH env var)
// ============================================================================

use async_trait::async_trait;
use redb::{Database, TableDefinition};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use super::StructuredStore;
use crate::error::{MemoryError, Result};
use crate::types::{MemoryEntry, MemoryType};

const MEMORIES: TableDefinition<&str, &[u8]> = TableDefinition::new("memories");

/// Embedded structured store backed by redb
pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

impl RedbStore {
    /// Open (or create) the database at the given path.
    /// If `path` is None, uses RECALL_DB_PATH env var or ~/.recall/memories.redb
    pub fn open(path: Option<&str>) -> Result<Self> {
        let db_path = if let Some(p) = path {
            PathBuf::from(p)
        } else if let Ok(env_path) = std::env::var("RECALL_DB_PATH") {
            PathBuf::from(env_path)
        } else {
            let home = dirs::home_dir()
                .ok_or_else(|| MemoryError::Transient("cannot determine home directory".into()))?;
            let recall_dir = home.join(".recall");
            std::fs::create_dir_all(&recall_dir).map_err(|e| {
                MemoryError::Transient(format!("failed to create .recall directory: {}", e))
            })?;
            recall_dir.join("memories.redb")
        };

        info!("Opening memory database at: {}", db_path.display());

        let db = Database::create(&db_path)
            .map_err(|e| MemoryError::Transient(format!("failed to open database: {}", e)))?;

        // Ensure the table exists by doing a write transaction
        let write_txn = db
            .begin_write()
            .map_err(|e| MemoryError::Transient(format!("failed to begin write: {}", e)))?;
        {
            let _ = write_txn
                .open_table(MEMORIES)
                .map_err(|e| MemoryError::Transient(format!("failed to create table: {}", e)))?;
        }
        write_txn
            .commit()
            .map_err(|e| MemoryError::Transient(format!("failed to commit init: {}", e)))?;

        Ok(Self { db, path: db_path })
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_entry(&self, entry: &MemoryEntry) -> Result<()> {
        let key = entry_key(entry.id);
        let value = bincode::serialize(entry)
            .map_err(|e| MemoryError::Transient(format!("failed to serialize entry: {}", e)))?;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| MemoryError::Transient(format!("failed to begin write: {}", e)))?;
        {
            let mut table = write_txn
                .open_table(MEMORIES)
                .map_err(|e| MemoryError::Transient(format!("failed to open table: {}", e)))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(|e| MemoryError::Transient(format!("failed to insert entry: {}", e)))?;
        }
        write_txn
            .commit()
            .map_err(|e| MemoryError::Transient(format!("failed to commit: {}", e)))?;

        debug!("Stored entry: {}", entry.id);
        Ok(())
    }

    fn read_entry(&self, id: Uuid) -> Result<Option<MemoryEntry>> {
        let key = entry_key(id);

        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| MemoryError::Transient(format!("failed to begin read: {}", e)))?;
        let table = read_txn
            .open_table(MEMORIES)
            .map_err(|e| MemoryError::Transient(format!("failed to open table: {}", e)))?;

        match table
            .get(key.as_str())
            .map_err(|e| MemoryError::Transient(format!("failed to get entry: {}", e)))?
        {
            Some(value) => {
                let entry: MemoryEntry = bincode::deserialize(value.value()).map_err(|e| {
                    MemoryError::Transient(format!("failed to deserialize entry: {}", e))
                })?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl StructuredStore for RedbStore {
    async fn insert(&self, entry: &MemoryEntry) -> Result<()> {
        self.write_entry(entry)
    }

    async fn update(&self, entry: &MemoryEntry) -> Result<()> {
        if self.read_entry(entry.id)?.is_none() {
            return Err(MemoryError::NotFound(entry.id));
        }
        self.write_entry(entry)
    }

    async fn delete(&self, id: Uuid) -> Result<MemoryEntry> {
        let key = entry_key(id);

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| MemoryError::Transient(format!("failed to begin write: {}", e)))?;
        let removed: Option<MemoryEntry>;
        {
            let mut table = write_txn
                .open_table(MEMORIES)
                .map_err(|e| MemoryError::Transient(format!("failed to open table: {}", e)))?;
            removed = match table
                .remove(key.as_str())
                .map_err(|e| MemoryError::Transient(format!("failed to remove entry: {}", e)))?
            {
                Some(value) => Some(bincode::deserialize(value.value()).map_err(|e| {
                    MemoryError::Transient(format!("failed to deserialize entry: {}", e))
                })?),
                None => None,
            };
        }
        write_txn
            .commit()
            .map_err(|e| MemoryError::Transient(format!("failed to commit delete: {}", e)))?;

        match removed {
            Some(entry) => {
                debug!("Deleted entry: {}", id);
                Ok(entry)
            }
            None => Err(MemoryError::NotFound(id)),
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<MemoryEntry>> {
        self.read_entry(id)
    }

    async fn list_by_user(
        &self,
        user_id: &str,
        type_filter: Option<MemoryType>,
    ) -> Result<Vec<MemoryEntry>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| MemoryError::Transient(format!("failed to begin read: {}", e)))?;
        let table = read_txn
            .open_table(MEMORIES)
            .map_err(|e| MemoryError::Transient(format!("failed to open table: {}", e)))?;

        let mut results = Vec::new();
        let iter = table
            .range::<&str>(..)
            .map_err(|e| MemoryError::Transient(format!("failed to iterate entries: {}", e)))?;
        for item in iter {
            let (_key, value) = item
                .map_err(|e| MemoryError::Transient(format!("failed to read entry: {}", e)))?;
            let entry: MemoryEntry = bincode::deserialize(value.value()).map_err(|e| {
                MemoryError::Transient(format!("failed to deserialize entry: {}", e))
            })?;

            if entry.user_id != user_id {
                continue;
            }
            if let Some(filter) = type_filter {
                if entry.memory_type != filter {
                    continue;
                }
            }
            results.push(entry);
        }
        Ok(results)
    }
}

fn entry_key(id: Uuid) -> String {
    format!("memories:{}", id)
}
