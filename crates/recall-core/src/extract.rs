// ============================================================================
// Candidate Extraction — finds memory-worthy statements in a turn
// ============================================================================
// The strategy is pluggable so an LLM-backed extractor can replace the
// heuristics without touching the manager. Extraction is pure with respect
// to storage; a turn that yields nothing is a normal outcome, not an error.
// ============================================================================

use crate::types::{CandidateMemory, MemoryType};

/// Identifies candidate memories in a single conversation turn
pub trait ExtractionStrategy: Send + Sync {
    fn extract(&self, turn_text: &str) -> Vec<CandidateMemory>;
}

/// Default pattern-scan extractor.
///
/// Covers the statement shapes that matter most for a companion: who the
/// user is, what they like, what they're working toward, and how they feel.
#[derive(Debug, Default, Clone)]
pub struct HeuristicExtractor;

impl ExtractionStrategy for HeuristicExtractor {
    fn extract(&self, turn_text: &str) -> Vec<CandidateMemory> {
        let mut candidates = Vec::new();

        if let Some(fact) = extract_name_fact(turn_text) {
            candidates.push(CandidateMemory {
                content: fact,
                memory_type: MemoryType::Fact,
                importance: 9,
            });
        }

        if let Some(goal) = extract_goal(turn_text) {
            candidates.push(CandidateMemory {
                content: goal,
                memory_type: MemoryType::Goal,
                importance: 8,
            });
        }

        if let Some(pref) = extract_preference(turn_text) {
            candidates.push(CandidateMemory {
                content: pref,
                memory_type: MemoryType::Preference,
                importance: 7,
            });
        }

        if let Some(interest) = extract_interest(turn_text) {
            candidates.push(CandidateMemory {
                content: interest,
                memory_type: MemoryType::Interest,
                importance: 6,
            });
        }

        if let Some(emotion) = extract_emotion(turn_text) {
            candidates.push(CandidateMemory {
                content: emotion,
                memory_type: MemoryType::Emotion,
                importance: 5,
            });
        }

        candidates
    }
}

// Pattern scans below share one shape: find the cue phrase, take the rest of
// the sentence, and reject fragments that are too short or too long to be a
// real statement.

fn sentence_after<'a>(content: &'a str, lower: &str, pattern: &str) -> Option<&'a str> {
    let pos = lower.find(pattern)?;
    let rest = &content[pos..];
    let end = rest
        .find(['.', '!', '?'])
        .unwrap_or(rest.len());
    Some(rest[..end].trim())
}

fn extract_name_fact(content: &str) -> Option<String> {
    let lower = content.to_lowercase();

    // "my name is X" or "call me X"
    let patterns = [("my name is ", 11), ("call me ", 8), ("i go by ", 8)];

    for (pattern, offset) in patterns {
        if let Some(pos) = lower.find(pattern) {
            let rest = &content[pos + offset..];
            let name: String = rest
                .chars()
                .take_while(|c| c.is_alphabetic() || *c == ' ')
                .collect();
            let name = name.trim();
            if !name.is_empty() && name.len() < 50 {
                return Some(format!("User's name is {}", name));
            }
        }
    }

    None
}

fn extract_goal(content: &str) -> Option<String> {
    let lower = content.to_lowercase();

    let patterns = [
        "i want to ",
        "i'm trying to ",
        "i need to ",
        "my goal is ",
        "i'm working on ",
        "i plan to ",
    ];

    for pattern in patterns {
        if let Some(sentence) = sentence_after(content, &lower, pattern) {
            if sentence.len() > 15 && sentence.len() < 200 {
                return Some(format!("User goal: {}", sentence));
            }
        }
    }

    None
}

fn extract_preference(content: &str) -> Option<String> {
    let lower = content.to_lowercase();

    let patterns = ["i prefer ", "i'd rather ", "i hate ", "i don't like ", "i can't stand "];

    for pattern in patterns {
        if let Some(sentence) = sentence_after(content, &lower, pattern) {
            if sentence.len() > 10 && sentence.len() < 200 {
                return Some(format!("User preference: {}", sentence));
            }
        }
    }

    None
}

fn extract_interest(content: &str) -> Option<String> {
    let lower = content.to_lowercase();

    let patterns = ["i love ", "i like ", "i enjoy ", "i'm interested in ", "i'm into "];

    for pattern in patterns {
        if let Some(sentence) = sentence_after(content, &lower, pattern) {
            if sentence.len() > 8 && sentence.len() < 200 {
                return Some(format!("User interest: {}", sentence));
            }
        }
    }

    None
}

fn extract_emotion(content: &str) -> Option<String> {
    let lower = content.to_lowercase();

    let patterns = ["i feel ", "i'm feeling ", "i've been feeling ", "it makes me feel "];

    for pattern in patterns {
        if let Some(sentence) = sentence_after(content, &lower, pattern) {
            if sentence.len() > 8 && sentence.len() < 200 {
                return Some(format!("User said: {}", sentence));
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_name() {
        assert_eq!(
            extract_name_fact("My name is Alice"),
            Some("User's name is Alice".to_string())
        );
        assert_eq!(
            extract_name_fact("You can call me Bob by the way"),
            Some("User's name is Bob by the way".to_string())
        );
        assert_eq!(extract_name_fact("Hello there"), None);
    }

    #[test]
    fn test_extract_goal() {
        assert!(extract_goal("I want to learn woodworking this year").is_some());
        assert!(extract_goal("I'm working on a novel about sailing").is_some());
        assert!(extract_goal("Hello").is_none());
    }

    #[test]
    fn test_extract_preference_and_interest() {
        assert!(extract_preference("I prefer short direct answers").is_some());
        assert!(extract_interest("I love hiking in the mountains").is_some());
        assert!(extract_preference("Hello").is_none());
        assert!(extract_interest("Hi").is_none());
    }

    #[test]
    fn test_extract_emotion() {
        assert!(extract_emotion("I feel pretty anxious about the move").is_some());
        assert!(extract_emotion("What time is it?").is_none());
    }

    #[test]
    fn test_extractor_assigns_types() {
        let extractor = HeuristicExtractor;
        let candidates = extractor.extract("My name is Alex and I love hiking in the hills");

        assert!(candidates
            .iter()
            .any(|c| c.memory_type == MemoryType::Fact && c.content.contains("Alex")));
        assert!(candidates
            .iter()
            .any(|c| c.memory_type == MemoryType::Interest && c.content.contains("hiking")));
    }

    #[test]
    fn test_small_talk_yields_nothing() {
        let extractor = HeuristicExtractor;
        assert!(extractor.extract("ok sounds good, thanks!").is_empty());
    }

    #[test]
    fn test_sentence_stops_at_punctuation() {
        let goal = extract_goal("I want to visit Japan next spring. Also what's the weather?");
        assert_eq!(
            goal,
            Some("User goal: I want to visit Japan next spring".to_string())
        );
    }
}
