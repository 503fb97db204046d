// ============================================================================
// Memory subsystem end-to-end tests over deterministic in-process backends
// ============================================================================
// Uses a token-hash embedder so similarity is reproducible without a model:
// texts sharing words land near each other, disjoint texts score near zero.
// ============================================================================

use async_trait::async_trait;
use std::sync::Arc;

use recall_core::{
    CandidateMemory, EmbeddingProvider, InMemoryStore, InProcessIndex, IndexPoint, MemoryConfig,
    MemoryEntry, MemoryError, MemoryManager, MemoryType, Result, RetrievalQuery, VectorIndex,
};

const DIM: usize = 256;

/// Deterministic bag-of-words embedder: each word adds weight to one
/// FNV-hashed bucket, vectors are L2-normalized
struct HashEmbedder;

fn fnv1a(word: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in word.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn hash_embed(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIM];
    for word in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        vector[(fnv1a(word) % DIM as u64) as usize] += 1.0;
    }
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
    vector
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(hash_embed(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| hash_embed(t)).collect())
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

struct Harness {
    manager: MemoryManager,
    index: Arc<InProcessIndex>,
    store: Arc<InMemoryStore>,
    config: MemoryConfig,
}

fn harness() -> Harness {
    let config = MemoryConfig::default();
    let index = Arc::new(InProcessIndex::new());
    let store = Arc::new(InMemoryStore::new());
    let manager = MemoryManager::new(
        Arc::new(HashEmbedder),
        index.clone(),
        store.clone(),
        config.clone(),
    )
    .unwrap();
    Harness {
        manager,
        index,
        store,
        config,
    }
}

fn query(user_id: &str, text: &str, k: usize) -> RetrievalQuery {
    RetrievalQuery {
        user_id: user_id.to_string(),
        query: text.to_string(),
        k,
        memory_type: None,
    }
}

/// Seed an entry with explicit timestamps directly into both tiers,
/// for decay scenarios the public API cannot set up
async fn seed_entry(
    h: &Harness,
    user_id: &str,
    content: &str,
    importance: u8,
    last_accessed: i64,
    access_count: u32,
) -> MemoryEntry {
    let mut entry = MemoryEntry::new(
        user_id.to_string(),
        content.to_string(),
        MemoryType::Interest,
        importance,
    )
    .with_embedding(hash_embed(content));
    entry.last_accessed = last_accessed;
    entry.last_decayed = last_accessed;
    entry.access_count = access_count;

    use recall_core::StructuredStore;
    h.store.insert(&entry).await.unwrap();
    h.index
        .upsert(IndexPoint {
            id: entry.id,
            embedding: entry.embedding.clone(),
            user_id: entry.user_id.clone(),
            memory_type: entry.memory_type,
        })
        .await
        .unwrap();
    entry
}

// ============================================================================
// Commit and retrieval
// ============================================================================

#[tokio::test]
async fn test_reflexive_recall() {
    let h = harness();

    let stored = h
        .manager
        .add_manual("alice", "I love hiking in the mountains", MemoryType::Interest, 6)
        .await
        .unwrap();

    let results = h
        .manager
        .retrieve(&query("alice", "I love hiking in the mountains", 3))
        .await
        .unwrap();

    assert!(!results.is_empty());
    assert_eq!(results[0].entry.id, stored.id);
    // Returned entries get their access bookkeeping bumped
    assert_eq!(results[0].entry.access_count, 1);
}

#[tokio::test]
async fn test_retrieval_never_crosses_users() {
    let h = harness();

    h.manager
        .add_manual("alice", "I love hiking in the mountains", MemoryType::Interest, 6)
        .await
        .unwrap();
    let bobs = h
        .manager
        .add_manual("bob", "I love hiking in the mountains", MemoryType::Interest, 6)
        .await
        .unwrap();

    let results = h
        .manager
        .retrieve(&query("alice", "hiking in the mountains", 10))
        .await
        .unwrap();

    assert!(!results.is_empty());
    assert!(results.iter().all(|m| m.entry.user_id == "alice"));
    assert!(results.iter().all(|m| m.entry.id != bobs.id));
}

#[tokio::test]
async fn test_near_duplicates_merge_into_one_entry() {
    let h = harness();

    let candidate = |content: &str| CandidateMemory {
        content: content.to_string(),
        memory_type: MemoryType::Interest,
        importance: 6,
    };

    h.manager
        .commit(
            vec![
                candidate("User interest: I love hiking in the mountains"),
                candidate("User interest: I love hiking in the mountains"),
            ],
            "alice",
        )
        .await
        .unwrap();

    let stored = h.manager.list("alice", None).await.unwrap();
    assert_eq!(stored.len(), 1, "near-duplicates must merge, not duplicate");
    assert_eq!(h.index.len(), 1);
}

#[tokio::test]
async fn test_merge_boosts_importance() {
    let h = harness();

    let first = CandidateMemory {
        content: "User interest: I love hiking in the mountains".to_string(),
        memory_type: MemoryType::Interest,
        importance: 4,
    };
    let second = CandidateMemory {
        content: "User interest: I love hiking in the mountains".to_string(),
        memory_type: MemoryType::Interest,
        importance: 7,
    };

    h.manager.commit(vec![first], "alice").await.unwrap();
    let merged = h.manager.commit(vec![second], "alice").await.unwrap();

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].importance, 7);
}

#[tokio::test]
async fn test_name_recall_scenario() {
    let h = harness();

    // "My name is Alex" arrives as a turn and is extracted + committed
    let stored = h.manager.remember("My name is Alex", "alice").await.unwrap();
    assert!(stored.iter().any(|m| m.content.contains("Alex")));

    // Unrelated low-importance memories compete
    h.manager
        .add_manual("alice", "gardening tulips every weekend", MemoryType::Interest, 3)
        .await
        .unwrap();
    h.manager
        .add_manual("alice", "prefers window seats on flights", MemoryType::Preference, 3)
        .await
        .unwrap();

    let results = h
        .manager
        .retrieve(&query("alice", "What's my name?", 3))
        .await
        .unwrap();

    assert!(!results.is_empty());
    assert!(
        results[0].entry.content.contains("Alex"),
        "identity memory should outrank unrelated entries, got: {}",
        results[0].entry.content
    );
}

#[tokio::test]
async fn test_type_filter_restricts_results() {
    let h = harness();

    h.manager
        .add_manual("alice", "wants to learn woodworking", MemoryType::Goal, 7)
        .await
        .unwrap();
    h.manager
        .add_manual("alice", "wants shorter replies", MemoryType::Preference, 7)
        .await
        .unwrap();

    let results = h
        .manager
        .retrieve(&RetrievalQuery {
            user_id: "alice".to_string(),
            query: "wants".to_string(),
            k: 10,
            memory_type: Some(MemoryType::Goal),
        })
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].entry.memory_type, MemoryType::Goal);
}

// ============================================================================
// Decay
// ============================================================================

#[tokio::test]
async fn test_sweep_removes_fully_decayed_entries() {
    let h = harness();
    let now = chrono::Utc::now().timestamp();
    let step = h.config.scoring.decay_step_secs;

    let stale = seed_entry(&h, "alice", "a passing remark", 3, now - 100 * step, 0).await;
    let fresh = seed_entry(&h, "alice", "started a pottery class", 6, now - 2 * step, 0).await;

    let outcome = h.manager.decay_sweep("alice", now).await.unwrap();
    assert_eq!(outcome.removed, 1);
    assert_eq!(outcome.updated, 1);

    let remaining = h.manager.list("alice", None).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, fresh.id);
    assert_eq!(remaining[0].importance, 4);
    // Both tiers dropped the stale entry
    assert_eq!(h.index.len(), 1);
    assert!(h.manager.list("alice", None).await.unwrap().iter().all(|e| e.id != stale.id));
}

#[tokio::test]
async fn test_sweep_is_idempotent() {
    let h = harness();
    let now = chrono::Utc::now().timestamp();
    let step = h.config.scoring.decay_step_secs;

    seed_entry(&h, "alice", "started a pottery class", 8, now - 3 * step, 0).await;

    let first = h.manager.decay_sweep("alice", now).await.unwrap();
    assert_eq!(first.updated, 1);
    let after_first = h.manager.list("alice", None).await.unwrap();

    let second = h.manager.decay_sweep("alice", now).await.unwrap();
    assert_eq!(second.total(), 0, "immediate re-run must change nothing");
    let after_second = h.manager.list("alice", None).await.unwrap();

    assert_eq!(after_first.len(), after_second.len());
    assert_eq!(after_first[0].importance, after_second[0].importance);
    assert_eq!(after_first[0].importance, 5);
}

#[tokio::test]
async fn test_frequently_accessed_entry_survives_long_idle() {
    let h = harness();
    let now = chrono::Utc::now().timestamp();
    let step = h.config.scoring.decay_step_secs;
    let protected = h.config.scoring.protected_access_count;

    // "I love hiking" at importance 6, idle for far longer than it takes
    // an unprotected entry to decay away
    let entry = seed_entry(&h, "alice", "I love hiking", 6, now - 50 * step, protected).await;

    let outcome = h.manager.decay_sweep("alice", now).await.unwrap();
    assert_eq!(outcome.removed, 0);

    let remaining = h.manager.list("alice", None).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, entry.id);
    assert_eq!(remaining[0].importance, 1, "decays to the floor, never past it");
}

// ============================================================================
// Manual edits
// ============================================================================

#[tokio::test]
async fn test_delete_missing_id_is_not_found_without_mutation() {
    let h = harness();

    h.manager
        .add_manual("alice", "likes green tea", MemoryType::Preference, 5)
        .await
        .unwrap();

    let result = h.manager.delete_manual("alice", uuid::Uuid::new_v4()).await;
    assert!(matches!(result, Err(MemoryError::NotFound(_))));

    // No store mutation occurred
    assert_eq!(h.store.len(), 1);
    assert_eq!(h.index.len(), 1);
}

#[tokio::test]
async fn test_delete_other_users_memory_is_not_found() {
    let h = harness();

    let bobs = h
        .manager
        .add_manual("bob", "likes green tea", MemoryType::Preference, 5)
        .await
        .unwrap();

    let result = h.manager.delete_manual("alice", bobs.id).await;
    assert!(matches!(result, Err(MemoryError::NotFound(_))));
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn test_manual_delete_removes_from_both_tiers() {
    let h = harness();

    let entry = h
        .manager
        .add_manual("alice", "likes green tea", MemoryType::Preference, 5)
        .await
        .unwrap();

    let removed = h.manager.delete_manual("alice", entry.id).await.unwrap();
    assert_eq!(removed.id, entry.id);
    assert!(h.store.is_empty());
    assert!(h.index.is_empty());
}

#[tokio::test]
async fn test_stats_reflect_stored_memories() {
    let h = harness();

    h.manager
        .add_manual("alice", "likes green tea", MemoryType::Preference, 4)
        .await
        .unwrap();
    h.manager
        .add_manual("alice", "training for a marathon", MemoryType::Goal, 8)
        .await
        .unwrap();

    let stats = h.manager.stats("alice").await.unwrap();
    assert_eq!(stats.total_memories, 2);
    assert_eq!(stats.type_counts["preference"], 1);
    assert_eq!(stats.type_counts["goal"], 1);
    assert!((stats.avg_importance - 6.0).abs() < 1e-6);
}
