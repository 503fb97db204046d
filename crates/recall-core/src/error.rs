// ============================================================================
// Error Types — failure taxonomy for the memory subsystem
// ============================================================================
// Callers branch on these variants: transient failures are retryable with
// backoff, NotFound/InvalidEntry are not, Desync triggers a repair pass.
// ============================================================================

use uuid::Uuid;

/// Error type for all memory subsystem operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum MemoryError {
    /// Store call failed for a reason that may clear on retry (network, timeout)
    #[error("transient store failure: {0}")]
    Transient(String),

    /// Structured store and vector index disagree on an entry's existence.
    /// Repair treats the structured store as authoritative.
    #[error("store desync: {0}")]
    Desync(String),

    /// Operation targeted an id that does not exist
    #[error("memory not found: {0}")]
    NotFound(Uuid),

    /// Entry rejected before any store write (empty content, bad importance)
    #[error("invalid memory entry: {0}")]
    InvalidEntry(String),

    /// Embedding provider failure
    #[error("embedding error: {0}")]
    Embedding(String),
}

impl MemoryError {
    /// Whether the caller may retry the operation with backoff.
    /// The subsystem never retries internally.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MemoryError::Transient(_) | MemoryError::Embedding(_))
    }
}

pub type Result<T> = std::result::Result<T, MemoryError>;
