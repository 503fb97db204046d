// ============================================================================
// Qdrant Adapter — production vector index
// ============================================================================
// One collection, cosine distance, payload-filtered by user_id so queries
// can never cross tenants.
// ============================================================================

use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance,
    Filter, PointStruct, SearchPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use super::{IndexPoint, VectorIndex};
use crate::error::{MemoryError, Result};
use crate::types::MemoryType;

/// Collection name for memory embeddings
pub const COLLECTION_NAME: &str = "recall_memories";

/// Vector index backed by a Qdrant instance
pub struct QdrantIndex {
    client: Qdrant,
}

impl QdrantIndex {
    /// Connect to Qdrant and ensure the memories collection exists
    pub async fn new(url: &str, dimension: usize) -> Result<Self> {
        debug!("Connecting to Qdrant at {}", url);

        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| MemoryError::Transient(format!("failed to create Qdrant client: {}", e)))?;

        let index = Self { client };
        index.ensure_collection(dimension).await?;

        Ok(index)
    }

    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        let exists = self
            .client
            .collection_exists(COLLECTION_NAME)
            .await
            .map_err(|e| MemoryError::Transient(format!("failed to check collection: {}", e)))?;

        if !exists {
            info!("Creating collection: {}", COLLECTION_NAME);

            self.client
                .create_collection(
                    CreateCollectionBuilder::new(COLLECTION_NAME).vectors_config(
                        VectorParamsBuilder::new(dimension as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(|e| {
                    MemoryError::Transient(format!("failed to create collection: {}", e))
                })?;
        } else {
            debug!("Collection {} already exists", COLLECTION_NAME);
        }

        Ok(())
    }

    fn user_filter(user_id: &str, type_filter: Option<MemoryType>) -> Filter {
        let mut conditions = vec![Condition::matches("user_id", user_id.to_string())];
        if let Some(memory_type) = type_filter {
            conditions.push(Condition::matches("memory_type", memory_type.to_string()));
        }
        Filter::must(conditions)
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn upsert(&self, point: IndexPoint) -> Result<()> {
        debug!("Upserting point {} for user {}", point.id, point.user_id);

        let payload: HashMap<String, Value> = [
            ("user_id".to_string(), Value::from(point.user_id.clone())),
            (
                "memory_type".to_string(),
                Value::from(point.memory_type.to_string()),
            ),
        ]
        .into_iter()
        .collect();

        let qdrant_point = PointStruct::new(point.id.to_string(), point.embedding, payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(COLLECTION_NAME, vec![qdrant_point]))
            .await
            .map_err(|e| MemoryError::Transient(format!("failed to upsert point: {}", e)))?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        debug!("Deleting point {}", id);

        self.client
            .delete_points(DeletePointsBuilder::new(COLLECTION_NAME).points(vec![id.to_string()]))
            .await
            .map_err(|e| MemoryError::Transient(format!("failed to delete point: {}", e)))?;

        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        user_id: &str,
        k: usize,
        type_filter: Option<MemoryType>,
    ) -> Result<Vec<(Uuid, f32)>> {
        if k == 0 {
            return Ok(vec![]);
        }

        debug!("Querying {} candidates for user {}", k, user_id);

        let search_result = self
            .client
            .search_points(
                SearchPointsBuilder::new(COLLECTION_NAME, embedding.to_vec(), k as u64)
                    .filter(Self::user_filter(user_id, type_filter)),
            )
            .await
            .map_err(|e| MemoryError::Transient(format!("failed to search points: {}", e)))?;

        let hits: Vec<(Uuid, f32)> = search_result
            .result
            .into_iter()
            .filter_map(|point| {
                let id = extract_uuid_from_point_id(point.id?)?;
                Some((id, point.score))
            })
            .collect();

        debug!("Found {} matching points", hits.len());
        Ok(hits)
    }
}

// Qdrant point ids are stored as UUID strings, never numeric
fn extract_uuid_from_point_id(point_id: qdrant_client::qdrant::PointId) -> Option<Uuid> {
    match point_id.point_id_options? {
        PointIdOptions::Uuid(uuid_str) => Uuid::parse_str(&uuid_str).ok(),
        PointIdOptions::Num(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Integration tests require a running Qdrant instance

    #[tokio::test]
    #[ignore]
    async fn test_upsert_query_delete() {
        let index = QdrantIndex::new("http://localhost:6334", 4).await.unwrap();

        let id = Uuid::new_v4();
        index
            .upsert(IndexPoint {
                id,
                embedding: vec![0.1, 0.2, 0.3, 0.4],
                user_id: "qdrant_test_user".to_string(),
                memory_type: MemoryType::Fact,
            })
            .await
            .unwrap();

        let hits = index
            .query(&[0.1, 0.2, 0.3, 0.4], "qdrant_test_user", 10, None)
            .await
            .unwrap();
        assert!(hits.iter().any(|(hit_id, _)| *hit_id == id));

        // Another user must not see the point
        let other = index
            .query(&[0.1, 0.2, 0.3, 0.4], "someone_else", 10, None)
            .await
            .unwrap();
        assert!(other.iter().all(|(hit_id, _)| *hit_id != id));

        index.delete(id).await.unwrap();
    }
}
