// ============================================================================
// InMemoryStore — map-backed structured store
// ============================================================================
// Test double and scratch deployment backend with the same NotFound
// semantics as the durable store.
// ============================================================================

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use super::StructuredStore;
use crate::error::{MemoryError, Result};
use crate::types::{MemoryEntry, MemoryType};

/// Structured store over an in-memory map
#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<Uuid, MemoryEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StructuredStore for InMemoryStore {
    async fn insert(&self, entry: &MemoryEntry) -> Result<()> {
        self.entries
            .write()
            .expect("store lock poisoned")
            .insert(entry.id, entry.clone());
        Ok(())
    }

    async fn update(&self, entry: &MemoryEntry) -> Result<()> {
        let mut entries = self.entries.write().expect("store lock poisoned");
        if !entries.contains_key(&entry.id) {
            return Err(MemoryError::NotFound(entry.id));
        }
        entries.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<MemoryEntry> {
        self.entries
            .write()
            .expect("store lock poisoned")
            .remove(&id)
            .ok_or(MemoryError::NotFound(id))
    }

    async fn get(&self, id: Uuid) -> Result<Option<MemoryEntry>> {
        Ok(self
            .entries
            .read()
            .expect("store lock poisoned")
            .get(&id)
            .cloned())
    }

    async fn list_by_user(
        &self,
        user_id: &str,
        type_filter: Option<MemoryType>,
    ) -> Result<Vec<MemoryEntry>> {
        Ok(self
            .entries
            .read()
            .expect("store lock poisoned")
            .values()
            .filter(|e| e.user_id == user_id)
            .filter(|e| type_filter.map_or(true, |t| e.memory_type == t))
            .cloned()
            .collect())
    }
}
