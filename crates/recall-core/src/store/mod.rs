// ============================================================================
// Structured Store — durable record store for memory entries
// ============================================================================
// The authoritative tier: when the vector index and this store disagree,
// repair trusts this store. update/delete on a missing id is NotFound, never
// a silent no-op, so the manager can detect desynchronization.
// ============================================================================

mod mem;
mod redb_store;

pub use mem::InMemoryStore;
pub use redb_store::RedbStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{MemoryEntry, MemoryType, UserMemoryStats};

/// Durable record store for memory entries, one record per memory
#[async_trait]
pub trait StructuredStore: Send + Sync {
    /// Write a new entry; writing the same id twice overwrites, which keeps
    /// commit retries idempotent
    async fn insert(&self, entry: &MemoryEntry) -> Result<()>;

    /// Replace an existing entry; NotFound if the id does not exist
    async fn update(&self, entry: &MemoryEntry) -> Result<()>;

    /// Remove and return an entry; NotFound if the id does not exist
    async fn delete(&self, id: Uuid) -> Result<MemoryEntry>;

    /// Fetch an entry by id
    async fn get(&self, id: Uuid) -> Result<Option<MemoryEntry>>;

    /// All entries for a user, optionally restricted to one memory type
    async fn list_by_user(
        &self,
        user_id: &str,
        type_filter: Option<MemoryType>,
    ) -> Result<Vec<MemoryEntry>>;

    /// Aggregate statistics for profile views
    async fn stats(&self, user_id: &str) -> Result<UserMemoryStats> {
        let entries = self.list_by_user(user_id, None).await?;
        Ok(compute_stats(&entries))
    }
}

pub(crate) fn compute_stats(entries: &[MemoryEntry]) -> UserMemoryStats {
    let mut stats = UserMemoryStats {
        total_memories: entries.len(),
        ..Default::default()
    };

    if entries.is_empty() {
        return stats;
    }

    let mut importance_sum = 0u32;
    for entry in entries {
        *stats
            .type_counts
            .entry(entry.memory_type.to_string())
            .or_insert(0) += 1;
        importance_sum += u32::from(entry.importance);
    }
    stats.avg_importance = importance_sum as f32 / entries.len() as f32;

    stats
}
