// ============================================================================
// Memory Manager — orchestrates extraction, storage, and retrieval
// ============================================================================
// Sole writer of memory state. Keeps the structured store and the vector
// index as consistent mirrors: every content-affecting write lands in both
// or in neither, and repair treats the structured store as authoritative.
// ============================================================================

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::MemoryConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{MemoryError, Result};
use crate::extract::{ExtractionStrategy, HeuristicExtractor};
use crate::index::{IndexPoint, VectorIndex};
use crate::scoring::{combined_relevance, decayed_importance};
use crate::store::StructuredStore;
use crate::types::{
    CandidateMemory, MemoryEntry, MemoryType, RetrievalQuery, ScoredMemory, SweepOutcome,
    UserMemoryStats,
};

/// Orchestrator for the conversational memory subsystem.
///
/// All collaborators are injected so deployments can mix backends (Qdrant
/// or in-process index, redb or in-memory store) and tests can substitute
/// deterministic doubles.
pub struct MemoryManager {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn StructuredStore>,
    extractor: Arc<dyn ExtractionStrategy>,
    config: MemoryConfig,
    // Entry mutation is serialized per user; cross-user work never contends
    user_locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl MemoryManager {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn StructuredStore>,
        config: MemoryConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            embedder,
            index,
            store,
            extractor: Arc::new(HeuristicExtractor),
            config,
            user_locks: StdMutex::new(HashMap::new()),
        })
    }

    /// Replace the default heuristic extractor
    pub fn with_extractor(mut self, extractor: Arc<dyn ExtractionStrategy>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    fn user_lock(&self, user_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.user_locks.lock().expect("lock map poisoned");
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn index_point(entry: &MemoryEntry) -> IndexPoint {
        IndexPoint {
            id: entry.id,
            embedding: entry.embedding.clone(),
            user_id: entry.user_id.clone(),
            memory_type: entry.memory_type,
        }
    }

    // ========================================================================
    // Extraction and commit
    // ========================================================================

    /// Identify candidate memories in a turn. Pure with respect to storage.
    pub fn extract(&self, turn_text: &str) -> Vec<CandidateMemory> {
        self.extractor.extract(turn_text)
    }

    /// Extract and persist in one call; invoked once per completed turn.
    /// A turn with nothing worth remembering yields an empty list.
    pub async fn remember(&self, turn_text: &str, user_id: &str) -> Result<Vec<MemoryEntry>> {
        let candidates = self.extract(turn_text);
        if candidates.is_empty() {
            debug!("No memory-worthy content in turn for user {}", user_id);
            return Ok(vec![]);
        }
        self.commit(candidates, user_id).await
    }

    /// Persist candidates, merging each into a near-duplicate existing entry
    /// when one exists, inserting otherwise
    pub async fn commit(
        &self,
        candidates: Vec<CandidateMemory>,
        user_id: &str,
    ) -> Result<Vec<MemoryEntry>> {
        if candidates.is_empty() {
            return Ok(vec![]);
        }

        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let mut persisted = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            persisted.push(self.commit_one(candidate, user_id).await?);
        }

        info!("Committed {} memories for user {}", persisted.len(), user_id);
        Ok(persisted)
    }

    async fn commit_one(&self, candidate: CandidateMemory, user_id: &str) -> Result<MemoryEntry> {
        validate_content(&candidate.content)?;
        validate_importance(candidate.importance)?;

        let embedding = self.embedder.embed(&candidate.content).await?;

        // Probe for a near-duplicate of the same user and type
        let nearest = self
            .index
            .query(&embedding, user_id, 1, Some(candidate.memory_type))
            .await?;

        if let Some(&(existing_id, similarity)) = nearest.first() {
            if similarity >= self.config.merge_threshold {
                match self.store.get(existing_id).await? {
                    Some(existing) => return self.merge_into(existing, candidate, embedding).await,
                    None => {
                        // Index point with no backing record: repair, then insert fresh
                        warn!("Dropping orphan index point {}", existing_id);
                        self.index.delete(existing_id).await?;
                    }
                }
            }
        }

        self.insert_new(candidate, user_id, embedding).await
    }

    async fn insert_new(
        &self,
        candidate: CandidateMemory,
        user_id: &str,
        embedding: Vec<f32>,
    ) -> Result<MemoryEntry> {
        let entry = MemoryEntry::new(
            user_id.to_string(),
            candidate.content,
            candidate.memory_type,
            candidate.importance,
        )
        .with_embedding(embedding);

        self.store.insert(&entry).await?;
        if let Err(index_err) = self.index.upsert(Self::index_point(&entry)).await {
            // No partial writes: undo the structured insert before surfacing
            if let Err(rollback_err) = self.store.delete(entry.id).await {
                return Err(MemoryError::Desync(format!(
                    "entry {} written to the structured store, index write failed ({}), rollback failed ({})",
                    entry.id, index_err, rollback_err
                )));
            }
            return Err(index_err);
        }

        debug!(
            "Stored memory {} for user {} ({})",
            entry.id, user_id, entry.memory_type
        );
        Ok(entry)
    }

    async fn merge_into(
        &self,
        existing: MemoryEntry,
        candidate: CandidateMemory,
        embedding: Vec<f32>,
    ) -> Result<MemoryEntry> {
        let now = chrono::Utc::now().timestamp();

        // Recency wins: the newer phrasing replaces the old, and the
        // embedding follows the content. Importance is boosted, not stacked.
        let mut updated = existing.clone();
        updated.content = candidate.content;
        updated.embedding = embedding;
        updated.importance = existing.importance.max(candidate.importance).min(10);
        updated.last_accessed = now;

        self.store.update(&updated).await?;
        if let Err(index_err) = self.index.upsert(Self::index_point(&updated)).await {
            if let Err(rollback_err) = self.store.update(&existing).await {
                return Err(MemoryError::Desync(format!(
                    "merge into {} updated the structured store, index write failed ({}), rollback failed ({})",
                    existing.id, index_err, rollback_err
                )));
            }
            return Err(index_err);
        }

        info!(
            "Merged near-duplicate into {} for user {}",
            updated.id, updated.user_id
        );
        Ok(updated)
    }

    // ========================================================================
    // Retrieval
    // ========================================================================

    /// Top-k memories for a query, ranked by combined relevance.
    /// Returned entries get their access count and timestamp bumped.
    pub async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<ScoredMemory>> {
        if query.k == 0 {
            return Ok(vec![]);
        }

        let query_embedding = self.embedder.embed(&query.query).await?;
        let candidate_k = query.k.saturating_mul(self.config.candidate_multiplier);

        let hits = self
            .index
            .query(&query_embedding, &query.user_id, candidate_k, query.memory_type)
            .await?;
        if hits.is_empty() {
            return Ok(vec![]);
        }

        let now = chrono::Utc::now().timestamp();
        let mut scored = Vec::with_capacity(hits.len());
        for (id, similarity) in hits {
            match self.store.get(id).await? {
                Some(entry) => {
                    if entry.user_id != query.user_id {
                        // The index contract already forbids this; a violation
                        // means the mirrors are corrupted, not merely stale
                        return Err(MemoryError::Desync(format!(
                            "index returned entry {} belonging to another user",
                            id
                        )));
                    }
                    let relevance = combined_relevance(&self.config.scoring, &entry, similarity, now);
                    scored.push(ScoredMemory { entry, relevance });
                }
                None => {
                    // Structured store is authoritative: drop the orphan point
                    warn!("Dropping orphan index point {}", id);
                    if let Err(e) = self.index.delete(id).await {
                        warn!("Failed to repair orphan {}: {}", id, e);
                    }
                }
            }
        }

        scored.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.entry.last_accessed.cmp(&a.entry.last_accessed))
        });
        scored.truncate(query.k);

        // Mark the returned entries as accessed
        let lock = self.user_lock(&query.user_id);
        let _guard = lock.lock().await;
        for hit in &mut scored {
            hit.entry.access_count += 1;
            hit.entry.last_accessed = now;
            match self.store.update(&hit.entry).await {
                Ok(()) => {}
                Err(MemoryError::NotFound(_)) => {
                    // Deleted between scoring and the bump; read-committed
                    // visibility makes this legal
                    warn!("Entry {} vanished during retrieval", hit.entry.id);
                }
                Err(e) => return Err(e),
            }
        }

        debug!(
            "Retrieved {} memories for user {}",
            scored.len(),
            query.user_id
        );
        Ok(scored)
    }

    // ========================================================================
    // Retention
    // ========================================================================

    /// Re-evaluate every entry of a user against the decay curve as of the
    /// given time. Entries that decay to zero are deleted from both tiers.
    /// Safe to re-run: decay steps are anchored at the last sweep.
    pub async fn decay_sweep(&self, user_id: &str, as_of: i64) -> Result<SweepOutcome> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let entries = self.store.list_by_user(user_id, None).await?;
        let mut outcome = SweepOutcome::default();

        for mut entry in entries {
            let decayed = decayed_importance(&self.config.scoring, &entry, as_of);

            if decayed == 0 {
                match self.store.delete(entry.id).await {
                    Ok(_) => {}
                    // Already gone; sweeps may be re-run after a crash
                    Err(MemoryError::NotFound(_)) => continue,
                    Err(e) => return Err(e),
                }
                self.index.delete(entry.id).await?;
                outcome.removed += 1;
                debug!("Decayed memory {} deleted for user {}", entry.id, user_id);
            } else if decayed < entry.importance {
                entry.importance = decayed;
                entry.last_decayed = as_of;
                self.store.update(&entry).await?;
                outcome.updated += 1;
            }
        }

        if outcome.total() > 0 {
            info!(
                "Decay sweep for user {}: {} lowered, {} removed",
                user_id, outcome.updated, outcome.removed
            );
        }
        Ok(outcome)
    }

    // ========================================================================
    // Manual edits and profile views
    // ========================================================================

    /// Store a user-authored memory directly, bypassing extraction and the
    /// merge probe: an explicit add must never be folded away silently
    pub async fn add_manual(
        &self,
        user_id: &str,
        content: &str,
        memory_type: MemoryType,
        importance: u8,
    ) -> Result<MemoryEntry> {
        validate_content(content)?;
        validate_importance(importance)?;

        let embedding = self.embedder.embed(content).await?;

        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let candidate = CandidateMemory {
            content: content.to_string(),
            memory_type,
            importance,
        };
        self.insert_new(candidate, user_id, embedding).await
    }

    /// Delete one memory by id. NotFound if the id does not exist or belongs
    /// to a different user; nothing is mutated in that case.
    pub async fn delete_manual(&self, user_id: &str, memory_id: Uuid) -> Result<MemoryEntry> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        match self.store.get(memory_id).await? {
            Some(entry) if entry.user_id == user_id => {}
            // Another user's memory looks like NotFound to this caller
            _ => return Err(MemoryError::NotFound(memory_id)),
        }

        let removed = self.store.delete(memory_id).await?;
        if let Err(e) = self.index.delete(memory_id).await {
            return Err(MemoryError::Desync(format!(
                "entry {} deleted from the structured store but not the index: {}",
                memory_id, e
            )));
        }

        info!("Deleted memory {} for user {}", memory_id, user_id);
        Ok(removed)
    }

    /// All memories for a user, for profile display
    pub async fn list(
        &self,
        user_id: &str,
        type_filter: Option<MemoryType>,
    ) -> Result<Vec<MemoryEntry>> {
        self.store.list_by_user(user_id, type_filter).await
    }

    /// Aggregate statistics for a user's memories
    pub async fn stats(&self, user_id: &str) -> Result<UserMemoryStats> {
        self.store.stats(user_id).await
    }
}

fn validate_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(MemoryError::InvalidEntry("empty memory content".to_string()));
    }
    Ok(())
}

fn validate_importance(importance: u8) -> Result<()> {
    if !(1..=10).contains(&importance) {
        return Err(MemoryError::InvalidEntry(format!(
            "importance must be within 1..=10, got {}",
            importance
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::InProcessIndex;
    use crate::store::InMemoryStore;
    use async_trait::async_trait;

    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    /// Index whose writes always fail, for exercising rollback
    struct FailingIndex;

    #[async_trait]
    impl VectorIndex for FailingIndex {
        async fn upsert(&self, _point: IndexPoint) -> Result<()> {
            Err(MemoryError::Transient("index unavailable".to_string()))
        }

        async fn delete(&self, _id: Uuid) -> Result<()> {
            Ok(())
        }

        async fn query(
            &self,
            _embedding: &[f32],
            _user_id: &str,
            _k: usize,
            _type_filter: Option<MemoryType>,
        ) -> Result<Vec<(Uuid, f32)>> {
            Ok(vec![])
        }
    }

    fn manager_with(index: Arc<dyn VectorIndex>, store: Arc<dyn StructuredStore>) -> MemoryManager {
        MemoryManager::new(
            Arc::new(FixedEmbedder),
            index,
            store,
            MemoryConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_commit_rolls_back_on_index_failure() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager_with(Arc::new(FailingIndex), store.clone());

        let result = manager
            .commit(
                vec![CandidateMemory {
                    content: "User's name is Alex".to_string(),
                    memory_type: MemoryType::Fact,
                    importance: 9,
                }],
                "alice",
            )
            .await;

        assert!(matches!(result, Err(MemoryError::Transient(_))));
        // The structured write must have been undone
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_manual_add_rejects_empty_content() {
        let manager = manager_with(Arc::new(InProcessIndex::new()), Arc::new(InMemoryStore::new()));
        let result = manager
            .add_manual("alice", "   ", MemoryType::Fact, 5)
            .await;
        assert!(matches!(result, Err(MemoryError::InvalidEntry(_))));
    }

    #[tokio::test]
    async fn test_manual_add_rejects_bad_importance() {
        let manager = manager_with(Arc::new(InProcessIndex::new()), Arc::new(InMemoryStore::new()));
        for importance in [0u8, 11u8] {
            let result = manager
                .add_manual("alice", "likes tea", MemoryType::Preference, importance)
                .await;
            assert!(matches!(result, Err(MemoryError::InvalidEntry(_))));
        }
    }

    #[tokio::test]
    async fn test_retrieve_k_zero_is_empty() {
        let manager = manager_with(Arc::new(InProcessIndex::new()), Arc::new(InMemoryStore::new()));
        let results = manager
            .retrieve(&RetrievalQuery {
                user_id: "alice".to_string(),
                query: "anything".to_string(),
                k: 0,
                memory_type: None,
            })
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_empty_corpus_is_empty() {
        let manager = manager_with(Arc::new(InProcessIndex::new()), Arc::new(InMemoryStore::new()));
        let results = manager
            .retrieve(&RetrievalQuery {
                user_id: "nobody".to_string(),
                query: "anything".to_string(),
                k: 5,
                memory_type: None,
            })
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
