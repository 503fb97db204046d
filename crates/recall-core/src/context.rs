// ============================================================================
// Context Builder — assembles prompt context for language generation
// ============================================================================
// Combines retrieved long-term memories, short-term turn history, and a tone
// read into one context string. The generation call itself lives outside
// this subsystem.
// ============================================================================

use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::manager::MemoryManager;
use crate::tone::ToneAnalyzer;
use crate::types::{ConversationTurn, RetrievalQuery, ScoredMemory};

/// Memories included per prompt
const CONTEXT_MEMORY_LIMIT: usize = 5;

/// Builds the context block handed to the language model
pub struct ContextBuilder {
    manager: Arc<MemoryManager>,
    tone: ToneAnalyzer,
}

impl ContextBuilder {
    pub fn new(manager: Arc<MemoryManager>) -> Self {
        Self {
            manager,
            tone: ToneAnalyzer::new(),
        }
    }

    /// Build the full prompt context for a user's current message
    pub async fn build(
        &self,
        user_id: &str,
        current_message: &str,
        recent_turns: &[ConversationTurn],
    ) -> Result<String> {
        let memories = if current_message.trim().is_empty() {
            vec![]
        } else {
            self.manager
                .retrieve(&RetrievalQuery {
                    user_id: user_id.to_string(),
                    query: current_message.to_string(),
                    k: CONTEXT_MEMORY_LIMIT,
                    memory_type: None,
                })
                .await?
        };

        let mut context = String::new();
        context.push_str(&format_memories(&memories));
        context.push_str(&format_recent_turns(
            recent_turns,
            self.manager.config().max_context_turns,
        ));

        let tone = self.tone.analyze(current_message);
        if !tone.is_neutral() {
            context.push_str(&format!(
                "\n<tone>\nThe user currently sounds {} (confidence {:.2}).\n</tone>\n",
                tone.primary_tone, tone.confidence
            ));
        }

        debug!(
            "Built context for user {}: {} memories, {} turns",
            user_id,
            memories.len(),
            recent_turns.len().min(self.manager.config().max_context_turns)
        );
        Ok(context)
    }
}

/// Format retrieved memories for inclusion in a system prompt
fn format_memories(memories: &[ScoredMemory]) -> String {
    if memories.is_empty() {
        return String::new();
    }

    let mut formatted = String::from("\n<user_context>\nWhat you remember about this user:\n");

    for scored in memories {
        formatted.push_str(&format!(
            "- [{}] {}\n",
            scored.entry.memory_type.display_name(),
            scored.entry.content
        ));
    }

    formatted.push_str("</user_context>\n");
    formatted
}

/// Format the last few turns for short-term context
fn format_recent_turns(turns: &[ConversationTurn], max_turns: usize) -> String {
    if turns.is_empty() || max_turns == 0 {
        return String::new();
    }

    let recent: Vec<_> = turns.iter().rev().take(max_turns).rev().collect();

    let mut formatted = String::from("\n<recent_conversation>\n");

    for turn in recent {
        let role_label = if turn.role == "user" { "User" } else { "Assistant" };
        formatted.push_str(&format!("{}: {}\n", role_label, turn.content));
    }

    formatted.push_str("</recent_conversation>\n");
    formatted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MemoryEntry, MemoryType};

    fn scored(content: &str, memory_type: MemoryType) -> ScoredMemory {
        ScoredMemory {
            entry: MemoryEntry::new("u".into(), content.to_string(), memory_type, 5),
            relevance: 0.8,
        }
    }

    #[test]
    fn test_memory_formatting() {
        let formatted = format_memories(&[scored("User prefers concise replies", MemoryType::Preference)]);
        assert!(formatted.contains("<user_context>"));
        assert!(formatted.contains("[Preference] User prefers concise replies"));
    }

    #[test]
    fn test_empty_memories_add_nothing() {
        assert!(format_memories(&[]).is_empty());
    }

    #[test]
    fn test_turns_are_bounded() {
        let turns: Vec<ConversationTurn> = (0..10)
            .map(|i| ConversationTurn::user(format!("message {}", i)))
            .collect();
        let formatted = format_recent_turns(&turns, 3);

        assert!(!formatted.contains("message 6"));
        assert!(formatted.contains("message 7"));
        assert!(formatted.contains("message 9"));
    }
}
