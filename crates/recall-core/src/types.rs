// ============================================================================
// Memory Types — data structures for conversation memory
// ============================================================================
// Defines memory entries, retrieval queries, conversation turns, and the
// profile statistics served to analytics views.
// ============================================================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A single long-term memory entry, mirrored between the structured store
/// and the vector index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique identifier for this memory
    pub id: Uuid,
    /// Owning user — entries never cross this boundary
    pub user_id: String,
    /// The actual memory content
    pub content: String,
    /// Type of memory
    pub memory_type: MemoryType,
    /// Importance score (1-10)
    pub importance: u8,
    /// Vector embedding; recomputed only when content changes.
    /// Not serialized to callers.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    /// Unix timestamp when the memory was created
    pub created_at: i64,
    /// Unix timestamp when the memory was last returned by a retrieval
    pub last_accessed: i64,
    /// Number of times this memory was retrieved
    pub access_count: u32,
    /// Anchor for the decay step counter; decay is measured from
    /// max(last_accessed, last_decayed) so re-running a sweep is a no-op
    pub last_decayed: i64,
}

impl MemoryEntry {
    /// Create a new memory entry with current timestamps
    pub fn new(user_id: String, content: String, memory_type: MemoryType, importance: u8) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: Uuid::new_v4(),
            user_id,
            content,
            memory_type,
            importance,
            embedding: Vec::new(),
            created_at: now,
            last_accessed: now,
            access_count: 0,
            last_decayed: now,
        }
    }

    /// Attach a pre-computed embedding
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }
}

/// Closed set of memory categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// How the user wants to be treated or responded to
    Preference,
    /// Facts about the user (name, occupation, relationships)
    Fact,
    /// Emotional states the user has expressed
    Emotion,
    /// The user's goals and ongoing projects
    Goal,
    /// Topics the user cares about
    Interest,
    /// Conversation context worth carrying forward
    Context,
}

impl MemoryType {
    /// Display name used when formatting memories into a prompt
    pub fn display_name(&self) -> &'static str {
        match self {
            MemoryType::Preference => "Preference",
            MemoryType::Fact => "Fact",
            MemoryType::Emotion => "Emotion",
            MemoryType::Goal => "Goal",
            MemoryType::Interest => "Interest",
            MemoryType::Context => "Context",
        }
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name().to_lowercase())
    }
}

impl std::str::FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "preference" => Ok(MemoryType::Preference),
            "fact" => Ok(MemoryType::Fact),
            "emotion" => Ok(MemoryType::Emotion),
            "goal" => Ok(MemoryType::Goal),
            "interest" => Ok(MemoryType::Interest),
            "context" => Ok(MemoryType::Context),
            _ => Err(format!("Unknown memory type: {}", s)),
        }
    }
}

/// A retrieval request against one user's memories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalQuery {
    pub user_id: String,
    pub query: String,
    /// Maximum number of results
    pub k: usize,
    /// Optional restriction to a single memory type
    pub memory_type: Option<MemoryType>,
}

/// A memory entry plus its transient retrieval relevance.
/// The relevance is recomputed per query and never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredMemory {
    pub entry: MemoryEntry,
    pub relevance: f32,
}

/// A not-yet-persisted memory candidate produced by extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateMemory {
    pub content: String,
    pub memory_type: MemoryType,
    pub importance: u8,
}

/// A single turn in a conversation, used for short-term context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Role: "user" or "assistant"
    pub role: String,
    /// Message content
    pub content: String,
    /// Unix timestamp
    pub timestamp: i64,
}

impl ConversationTurn {
    pub fn user(content: String) -> Self {
        Self {
            role: "user".to_string(),
            content,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn assistant(content: String) -> Self {
        Self {
            role: "assistant".to_string(),
            content,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Per-user memory statistics for profile views
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMemoryStats {
    pub total_memories: usize,
    pub type_counts: HashMap<String, usize>,
    pub avg_importance: f32,
}

/// Result of a decay sweep over one user's memories
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Entries whose importance was lowered
    pub updated: usize,
    /// Entries deleted because importance decayed to zero
    pub removed: usize,
}

impl SweepOutcome {
    pub fn total(&self) -> usize {
        self.updated + self.removed
    }
}
