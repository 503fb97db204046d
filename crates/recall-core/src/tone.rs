// ============================================================================
// Tone Analyzer — lexicon-based emotion read on a user message
// ============================================================================
// The memory subsystem only depends on the report shape; the scoring inside
// is a replaceable lexicon scan.
// ============================================================================

/// Emotion summary for one message
#[derive(Debug, Clone)]
pub struct ToneReport {
    /// Dominant tone label, "neutral" when nothing stands out
    pub primary_tone: String,
    /// Confidence in the dominant label, 0.0 - 1.0
    pub confidence: f32,
    /// Normalized per-emotion scores, descending
    pub emotions: Vec<(String, f32)>,
}

impl ToneReport {
    pub fn is_neutral(&self) -> bool {
        self.primary_tone == "neutral"
    }
}

const EMOTION_LEXICON: &[(&str, &[&str])] = &[
    (
        "joy",
        &["happy", "excited", "great", "awesome", "wonderful", "amazing", "love", "fantastic"],
    ),
    (
        "sadness",
        &["sad", "depressed", "down", "upset", "disappointed", "hurt", "crying"],
    ),
    (
        "anger",
        &["angry", "mad", "furious", "annoyed", "frustrated", "irritated", "hate"],
    ),
    (
        "fear",
        &["scared", "afraid", "worried", "anxious", "nervous", "terrified", "panic"],
    ),
    (
        "surprise",
        &["wow", "incredible", "unbelievable", "shocking", "unexpected"],
    ),
];

/// Lexicon-based tone scorer
#[derive(Debug, Default, Clone)]
pub struct ToneAnalyzer;

impl ToneAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, text: &str) -> ToneReport {
        let words: Vec<String> = text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();

        let mut scores: Vec<(String, f32)> = EMOTION_LEXICON
            .iter()
            .map(|(emotion, lexicon)| {
                let hits = words.iter().filter(|w| lexicon.contains(&w.as_str())).count();
                ((*emotion).to_string(), hits as f32)
            })
            .collect();

        let total: f32 = scores.iter().map(|(_, s)| s).sum();
        if total == 0.0 {
            return ToneReport {
                primary_tone: "neutral".to_string(),
                confidence: 0.0,
                emotions: vec![],
            };
        }

        for (_, score) in scores.iter_mut() {
            *score /= total;
        }
        scores.retain(|(_, s)| *s > 0.0);
        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let (primary_tone, confidence) = scores[0].clone();
        ToneReport {
            primary_tone,
            confidence,
            emotions: scores,
        }
    }
}
