// ============================================================================
// Vector Index — nearest-neighbor search over memory embeddings
// ============================================================================
// Adapter contract consumed by the memory manager. Results are always scoped
// to a single user and sorted by descending cosine similarity.
// ============================================================================

mod local;
mod qdrant;

pub use local::InProcessIndex;
pub use qdrant::{QdrantIndex, COLLECTION_NAME};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::types::MemoryType;

/// One indexed embedding with the metadata needed for scoped queries
#[derive(Debug, Clone)]
pub struct IndexPoint {
    pub id: Uuid,
    pub embedding: Vec<f32>,
    pub user_id: String,
    pub memory_type: MemoryType,
}

/// Nearest-neighbor index over memory embeddings.
///
/// Implementations must never return points belonging to a different
/// user than the one queried; a query against a user with zero entries
/// returns an empty list, not an error.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace a point by id
    async fn upsert(&self, point: IndexPoint) -> Result<()>;

    /// Remove a point; removing an absent id is a no-op
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Top-k points for the user by descending cosine similarity in [-1, 1]
    async fn query(
        &self,
        embedding: &[f32],
        user_id: &str,
        k: usize,
        type_filter: Option<MemoryType>,
    ) -> Result<Vec<(Uuid, f32)>>;
}
