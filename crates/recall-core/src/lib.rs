//! ============================================================================
//! RECALL-CORE: Conversational Memory Subsystem
//! ============================================================================
//! Decides what a companion should remember about a user across
//! conversations, and how those memories are scored, stored, decayed, and
//! retrieved:
//! - Heuristic extraction of memory-worthy statements from each turn
//! - Two-tier persistence: structured store (redb) mirrored by a vector
//!   index (Qdrant), kept consistent with rollback on partial writes
//! - Relevance ranking combining similarity, importance, and recency
//! - Importance decay with a protected floor for frequently used memories
//!
//! ## Architecture
//! ```text
//! Turn text → Extract → Commit ──→ Structured Store (authoritative)
//!                          │   └──→ Vector Index (similarity search)
//! Query text → Embed → Index search → Score → top-K → Context Builder
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use recall_core::{HttpEmbedder, MemoryConfig, MemoryManager, QdrantIndex, RedbStore};
//! use std::sync::Arc;
//!
//! let config = MemoryConfig::from_env()?;
//! let embedder = Arc::new(HttpEmbedder::new_openai(api_key, config.request_timeout_secs));
//! let index = Arc::new(QdrantIndex::new("http://localhost:6334", embedder.dimension()).await?);
//! let store = Arc::new(RedbStore::open(None)?);
//! let manager = MemoryManager::new(embedder, index, store, config)?;
//!
//! // Once per completed turn
//! manager.remember("My name is Alex and I love hiking", user_id).await?;
//!
//! // Before generating the next reply
//! let memories = manager.retrieve(&query).await?;
//! ```
//! ============================================================================

pub mod config;
pub mod context;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
pub mod manager;
pub mod scoring;
pub mod store;
pub mod tone;
pub mod types;

// Re-export main types for convenience
pub use config::{MemoryConfig, ScoringConfig};
pub use context::ContextBuilder;
pub use embedding::{EmbeddingProvider, HttpEmbedder, DEFAULT_EMBEDDING_DIM, DEFAULT_EMBEDDING_MODEL};
pub use error::{MemoryError, Result};
pub use extract::{ExtractionStrategy, HeuristicExtractor};
pub use index::{InProcessIndex, IndexPoint, QdrantIndex, VectorIndex};
pub use manager::MemoryManager;
pub use scoring::{combined_relevance, decayed_importance};
pub use store::{InMemoryStore, RedbStore, StructuredStore};
pub use tone::{ToneAnalyzer, ToneReport};
pub use types::{
    CandidateMemory, ConversationTurn, MemoryEntry, MemoryType, RetrievalQuery, ScoredMemory,
    SweepOutcome, UserMemoryStats,
};
