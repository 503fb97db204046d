// ============================================================================
// Memory Scorer — relevance ranking and retention decay
// ============================================================================
// Two pure functions. combined_relevance is the single authoritative ranking
// formula for retrieval; decayed_importance drives the retention sweep.
// Both are deterministic for fixed inputs so retrieval stays reproducible.
// ============================================================================

use crate::config::ScoringConfig;
use crate::types::MemoryEntry;

/// Combined retrieval relevance:
///
///   w_sim * similarity + w_imp * importance/10 + w_rec * exp(-lambda * idle)
///
/// where lambda = ln 2 / recency_half_life_secs and idle is seconds since
/// the entry was last accessed.
pub fn combined_relevance(
    config: &ScoringConfig,
    entry: &MemoryEntry,
    raw_similarity: f32,
    now: i64,
) -> f32 {
    let idle_secs = (now - entry.last_accessed).max(0) as f64;
    let lambda = std::f64::consts::LN_2 / config.recency_half_life_secs.max(1) as f64;
    let recency_factor = (-lambda * idle_secs).exp() as f32;
    let normalized_importance = f32::from(entry.importance) / 10.0;

    config.similarity_weight * raw_similarity
        + config.importance_weight * normalized_importance
        + config.recency_weight * recency_factor
}

/// Importance after decay: one point lost per decay_step_secs of idle time,
/// counted from max(last_accessed, last_decayed). Returns 0 as the deletion
/// signal; entries with access_count at or above the protected threshold
/// never fall below 1.
pub fn decayed_importance(config: &ScoringConfig, entry: &MemoryEntry, now: i64) -> u8 {
    let anchor = entry.last_accessed.max(entry.last_decayed);
    let idle_secs = (now - anchor).max(0);
    let steps = idle_secs / config.decay_step_secs.max(1);

    let floor: i64 = if entry.access_count >= config.protected_access_count {
        1
    } else {
        0
    };

    (i64::from(entry.importance) - steps).max(floor) as u8
}
