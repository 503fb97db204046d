// ============================================================================
// Configuration — tunables for scoring, merging, and decay
// ============================================================================
// Every threshold the ranking and retention logic depends on lives here.
// Defaults can be overridden with RECALL_* environment variables; binaries
// load .env via dotenvy before calling from_env().
// ============================================================================

use crate::error::{MemoryError, Result};

const DAY_SECS: i64 = 86_400;

/// Weights and curves for the relevance and decay calculations
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Weight of raw cosine similarity in combined relevance
    pub similarity_weight: f32,
    /// Weight of normalized importance in combined relevance
    pub importance_weight: f32,
    /// Weight of the recency factor in combined relevance
    pub recency_weight: f32,
    /// Half-life of the recency factor, in seconds
    pub recency_half_life_secs: i64,
    /// Idle seconds per importance point lost to decay
    pub decay_step_secs: i64,
    /// Entries accessed at least this often never decay below importance 1
    pub protected_access_count: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            similarity_weight: 0.6,
            importance_weight: 0.25,
            recency_weight: 0.15,
            recency_half_life_secs: 7 * DAY_SECS,
            decay_step_secs: 7 * DAY_SECS,
            protected_access_count: 5,
        }
    }
}

/// Top-level configuration for the memory subsystem
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub scoring: ScoringConfig,
    /// Cosine similarity at or above which a candidate merges into an
    /// existing entry instead of inserting a duplicate
    pub merge_threshold: f32,
    /// Candidate superset size for retrieval, as a multiple of k
    pub candidate_multiplier: usize,
    /// Short-term conversation turns included when building context
    pub max_context_turns: usize,
    /// Per-request timeout for store and provider calls, in seconds
    pub request_timeout_secs: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            merge_threshold: 0.92,
            candidate_multiplier: 4,
            max_context_turns: 5,
            request_timeout_secs: 30,
        }
    }
}

impl MemoryConfig {
    /// Build a config from defaults plus RECALL_* environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = env_parse::<f32>("RECALL_MERGE_THRESHOLD")? {
            config.merge_threshold = v;
        }
        if let Some(v) = env_parse::<usize>("RECALL_CANDIDATE_MULTIPLIER")? {
            config.candidate_multiplier = v;
        }
        if let Some(v) = env_parse::<usize>("RECALL_MAX_CONTEXT_TURNS")? {
            config.max_context_turns = v;
        }
        if let Some(v) = env_parse::<u64>("RECALL_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout_secs = v;
        }
        if let Some(v) = env_parse::<f32>("RECALL_SIMILARITY_WEIGHT")? {
            config.scoring.similarity_weight = v;
        }
        if let Some(v) = env_parse::<f32>("RECALL_IMPORTANCE_WEIGHT")? {
            config.scoring.importance_weight = v;
        }
        if let Some(v) = env_parse::<f32>("RECALL_RECENCY_WEIGHT")? {
            config.scoring.recency_weight = v;
        }
        if let Some(v) = env_parse::<i64>("RECALL_RECENCY_HALF_LIFE_SECS")? {
            config.scoring.recency_half_life_secs = v;
        }
        if let Some(v) = env_parse::<i64>("RECALL_DECAY_STEP_SECS")? {
            config.scoring.decay_step_secs = v;
        }
        if let Some(v) = env_parse::<u32>("RECALL_PROTECTED_ACCESS_COUNT")? {
            config.scoring.protected_access_count = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the scoring math cannot work with
    pub fn validate(&self) -> Result<()> {
        let s = &self.scoring;
        let weight_sum = s.similarity_weight + s.importance_weight + s.recency_weight;
        if (weight_sum - 1.0).abs() > 1e-3 {
            return Err(MemoryError::InvalidEntry(format!(
                "relevance weights must sum to 1.0, got {}",
                weight_sum
            )));
        }
        if !(0.0..=1.0).contains(&self.merge_threshold) {
            return Err(MemoryError::InvalidEntry(format!(
                "merge threshold must be within [0, 1], got {}",
                self.merge_threshold
            )));
        }
        if self.candidate_multiplier == 0 {
            return Err(MemoryError::InvalidEntry(
                "candidate multiplier must be at least 1".to_string(),
            ));
        }
        if s.recency_half_life_secs <= 0 || s.decay_step_secs <= 0 {
            return Err(MemoryError::InvalidEntry(
                "half-life and decay step must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| MemoryError::InvalidEntry(format!("cannot parse {}={}", key, raw))),
        Err(_) => Ok(None),
    }
}
