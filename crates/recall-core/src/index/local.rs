// ============================================================================
// In-Process Index — brute-force cosine search
// ============================================================================
// Injectable stand-in for Qdrant: exact nearest-neighbor over an in-memory
// map. Used by tests and single-process deployments where an external
// vector database is not worth running.
// ============================================================================

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use super::{IndexPoint, VectorIndex};
use crate::error::Result;
use crate::types::MemoryType;

/// Exact cosine-similarity index over an in-memory point map
#[derive(Default)]
pub struct InProcessIndex {
    points: RwLock<HashMap<Uuid, IndexPoint>>,
}

impl InProcessIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.read().expect("index lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VectorIndex for InProcessIndex {
    async fn upsert(&self, point: IndexPoint) -> Result<()> {
        self.points
            .write()
            .expect("index lock poisoned")
            .insert(point.id, point);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.points.write().expect("index lock poisoned").remove(&id);
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

        let points = self.points.read().expect("index lock poisoned");
        let mut hits: Vec<(Uuid, f32)> = points
            .values()
            .filter(|p| p.user_id == user_id)
            .filter(|p| type_filter.map_or(true, |t| p.memory_type == t))
            .map(|p| (p.id, cosine_similarity(embedding, &p.embedding)))
            .collect();

        hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }
}

/// Cosine similarity in [-1, 1]; zero-magnitude vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(user_id: &str, memory_type: MemoryType, embedding: Vec<f32>) -> IndexPoint {
        IndexPoint {
            id: Uuid::new_v4(),
            embedding,
            user_id: user_id.to_string(),
            memory_type,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_query_scoped_to_user() {
        let index = InProcessIndex::new();
        let mine = point("alice", MemoryType::Fact, vec![1.0, 0.0]);
        let theirs = point("bob", MemoryType::Fact, vec![1.0, 0.0]);
        let my_id = mine.id;

        index.upsert(mine).await.unwrap();
        index.upsert(theirs).await.unwrap();

        let hits = index.query(&[1.0, 0.0], "alice", 10, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, my_id);
    }

    #[tokio::test]
    async fn test_query_sorted_descending() {
        let index = InProcessIndex::new();
        index
            .upsert(point("u", MemoryType::Fact, vec![1.0, 0.0]))
            .await
            .unwrap();
        index
            .upsert(point("u", MemoryType::Fact, vec![0.7, 0.7]))
            .await
            .unwrap();
        index
            .upsert(point("u", MemoryType::Fact, vec![0.0, 1.0]))
            .await
            .unwrap();

        let hits = index.query(&[1.0, 0.0], "u", 10, None).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits[0].1 >= hits[1].1 && hits[1].1 >= hits[2].1);
    }

    #[tokio::test]
    async fn test_type_filter() {
        let index = InProcessIndex::new();
        let goal = point("u", MemoryType::Goal, vec![1.0, 0.0]);
        let goal_id = goal.id;
        index.upsert(goal).await.unwrap();
        index
            .upsert(point("u", MemoryType::Interest, vec![1.0, 0.0]))
            .await
            .unwrap();

        let hits = index
            .query(&[1.0, 0.0], "u", 10, Some(MemoryType::Goal))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, goal_id);
    }

    #[tokio::test]
    async fn test_empty_user_returns_empty() {
        let index = InProcessIndex::new();
        let hits = index.query(&[1.0, 0.0], "nobody", 5, None).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let index = InProcessIndex::new();
        assert!(index.delete(Uuid::new_v4()).await.is_ok());
    }
}
