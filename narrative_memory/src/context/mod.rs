//! Context assembly - a read-only bundle of memories for prompt building.
//!
//! Assembly is pure composition of store operations:
//! 1. **Recall**: the top memories for a query (reinforcing them as usual)
//! 2. **Tone**: emotion tags of the recalled memories, weighted by significance
//! 3. **Overview**: per-kind and per-tier counts from the store stats
//!
//! No state is added; the context is a value the caller renders or discards.

mod emotion_weights;

pub use emotion_weights::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::memory::{MemoryId, MemoryKind, MemoryTier};
use crate::store::{MemoryStore, RecallQuery, RecalledMemory};

/// Configuration for context assembly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Maximum number of memories to include.
    pub max_memories: usize,

    /// Memories scoring below this are left out.
    pub min_significance: f32,

    /// Emotions below this normalized weight are dropped from the tone.
    pub emotion_threshold: f32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_memories: 10,
            min_significance: 0.1,
            emotion_threshold: 0.1,
        }
    }
}

/// Builds memory context for prompts.
#[derive(Debug, Clone, Default)]
pub struct ContextAssembler {
    config: ContextConfig,
}

impl ContextAssembler {
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(ContextConfig::default())
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Recall memories for `query` and bundle them with the store overview.
    ///
    /// The query's own significance threshold wins over the configured one.
    pub fn assemble(&self, store: &mut MemoryStore, query: &RecallQuery) -> MemoryContext {
        let query = self.effective_query(query);
        let recalled = store.recall(&query, self.config.max_memories);
        self.build(store, &query, recalled)
    }

    /// Like [`assemble`](Self::assemble) but without reinforcing anything.
    pub fn preview(&self, store: &MemoryStore, query: &RecallQuery) -> MemoryContext {
        let query = self.effective_query(query);
        let ranked = store.rank(&query, self.config.max_memories);
        self.build(store, &query, ranked)
    }

    fn effective_query(&self, query: &RecallQuery) -> RecallQuery {
        let mut query = query.clone();
        if query.min_significance.is_none() {
            query.min_significance = Some(self.config.min_significance);
        }
        query
    }

    fn build(
        &self,
        store: &MemoryStore,
        query: &RecallQuery,
        recalled: Vec<RecalledMemory>,
    ) -> MemoryContext {
        let mut emotion_weights = EmotionWeights::new();
        for memory in &recalled {
            for emotion in memory.node.emotion_tags() {
                emotion_weights.add_weight(*emotion, memory.significance);
            }
        }
        emotion_weights.normalize();
        emotion_weights.prune(self.config.emotion_threshold);

        let stats = store.stats();

        MemoryContext {
            query_text: query.query_text.clone(),
            memories: recalled.iter().map(ContextMemory::from_recalled).collect(),
            emotion_weights,
            kind_counts: stats.kind_counts,
            tier_counts: stats.tier_counts,
            total_memories: stats.total,
        }
    }
}

/// One memory as it appears in a context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextMemory {
    pub id: MemoryId,
    pub kind: MemoryKind,
    pub tier: MemoryTier,
    pub significance: f32,
    pub text: String,
    pub themes: Vec<String>,
}

impl ContextMemory {
    fn from_recalled(memory: &RecalledMemory) -> Self {
        let mut themes: Vec<String> = memory.node.theme_tags().iter().cloned().collect();
        themes.sort();
        Self {
            id: memory.node.id(),
            kind: memory.node.kind(),
            tier: memory.node.tier(),
            significance: memory.significance,
            text: memory.node.content().plain_text(),
            themes,
        }
    }
}

/// The assembled memory context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryContext {
    /// The text that prompted the recall, if any.
    pub query_text: Option<String>,

    /// Recalled memories, most significant first.
    pub memories: Vec<ContextMemory>,

    /// Emotional tone of the recalled memories, normalized to the strongest.
    pub emotion_weights: EmotionWeights,

    /// Store-wide counts per kind.
    pub kind_counts: BTreeMap<MemoryKind, usize>,

    /// Store-wide counts per tier.
    pub tier_counts: BTreeMap<MemoryTier, usize>,

    pub total_memories: usize,
}

impl MemoryContext {
    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }

    /// Format the context as a prompt section.
    pub fn to_prompt_string(&self) -> String {
        let mut prompt = String::new();

        if let Some(text) = &self.query_text {
            prompt.push_str("## Current Focus\n");
            prompt.push_str(text);
            prompt.push_str("\n\n");
        }

        prompt.push_str("## Relevant Memories\n");
        if self.memories.is_empty() {
            prompt.push_str("None\n");
        }
        for memory in &self.memories {
            prompt.push_str(&format!(
                "- [{}/{}, {:.2}] {}{}\n",
                memory.tier,
                memory.kind,
                memory.significance,
                memory.text,
                if memory.themes.is_empty() {
                    String::new()
                } else {
                    format!(" (themes: {})", memory.themes.join(", "))
                }
            ));
        }
        prompt.push('\n');

        let tone = self.emotion_weights.dominant(0.0);
        if !tone.is_empty() {
            prompt.push_str("## Emotional Tone\n");
            let parts: Vec<String> = tone
                .iter()
                .map(|(emotion, weight)| format!("{} {:.2}", emotion, weight))
                .collect();
            prompt.push_str(&parts.join(", "));
            prompt.push('\n');
            if let Some(share) = self.emotion_weights.positive_share() {
                prompt.push_str(&format!("Pleasant: {:.0}%\n", share * 100.0));
            }
            prompt.push('\n');
        }

        prompt.push_str("## Memory Overview\n");
        prompt.push_str(&format!("Total: {}", self.total_memories));
        for (tier, count) in &self.tier_counts {
            prompt.push_str(&format!(", {}: {}", tier, count));
        }
        prompt.push('\n');
        if !self.kind_counts.is_empty() {
            let parts: Vec<String> = self
                .kind_counts
                .iter()
                .map(|(kind, count)| format!("{}: {}", kind, count))
                .collect();
            prompt.push_str(&format!("Kinds: {}\n", parts.join(", ")));
        }

        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::memory::{Emotion, NewMemory};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn campaign() -> MemoryStore {
        let clock = ManualClock::at(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        let mut store = MemoryStore::with_defaults().with_clock(Arc::new(clock));

        store
            .add(
                NewMemory::new("The priestess betrayed the order")
                    .in_tier(MemoryTier::LongTerm)
                    .with_kind(MemoryKind::Conflict)
                    .with_weight(0.9)
                    .with_emotions([Emotion::Anger, Emotion::Grief])
                    .with_theme("betrayal")
                    .with_trigger("priestess"),
            )
            .unwrap();
        store
            .add(
                NewMemory::new("The party shared bread with the priestess")
                    .with_weight(0.4)
                    .with_emotion(Emotion::Trust)
                    .with_trigger("priestess"),
            )
            .unwrap();
        store
            .add(NewMemory::new("It rained all day").with_weight(0.2))
            .unwrap();
        store
    }

    #[test]
    fn test_assemble_recalls_and_reinforces() {
        let mut store = campaign();
        let assembler = ContextAssembler::with_defaults();

        let context = assembler.assemble(&mut store, &RecallQuery::new().text("the priestess"));

        assert_eq!(context.memories.len(), 2);
        assert!(context.memories[0].text.contains("betrayed"));
        assert_eq!(context.memories[0].themes, vec!["betrayal".to_string()]);
        assert_eq!(context.total_memories, 3);
        assert_eq!(context.kind_counts[&MemoryKind::Event], 2);
        assert_eq!(store.stats().total_reinforcements, 2);
    }

    #[test]
    fn test_preview_does_not_reinforce() {
        let store = campaign();
        let context = ContextAssembler::with_defaults().preview(&store, &RecallQuery::new());

        assert_eq!(context.memories.len(), 3);
        assert_eq!(store.stats().total_reinforcements, 0);
    }

    #[test]
    fn test_emotion_weights_follow_significance() {
        let store = campaign();
        let context = ContextAssembler::with_defaults().preview(&store, &RecallQuery::new());

        let (strongest, weight) = context.emotion_weights.strongest().unwrap();
        assert!(strongest == Emotion::Anger || strongest == Emotion::Grief);
        assert!((weight - 1.0).abs() < 0.001);
        assert!(context.emotion_weights.get_weight(Emotion::Trust) < 1.0);
    }

    #[test]
    fn test_max_memories_and_threshold() {
        let store = campaign();
        let assembler = ContextAssembler::new(ContextConfig {
            max_memories: 1,
            ..ContextConfig::default()
        });
        assert_eq!(assembler.preview(&store, &RecallQuery::new()).memories.len(), 1);

        let strict = ContextAssembler::new(ContextConfig {
            min_significance: 0.99,
            ..ContextConfig::default()
        });
        let context = strict.preview(&store, &RecallQuery::new());
        assert!(context.memories.iter().all(|m| m.significance >= 0.99));
    }

    #[test]
    fn test_context_to_prompt() {
        let store = campaign();
        let context = ContextAssembler::with_defaults()
            .preview(&store, &RecallQuery::new().text("priestess"));

        let prompt = context.to_prompt_string();

        assert!(prompt.contains("## Current Focus\npriestess"));
        assert!(prompt.contains("The priestess betrayed the order"));
        assert!(prompt.contains("long_term/conflict"));
        assert!(prompt.contains("themes: betrayal"));
        assert!(prompt.contains("## Emotional Tone"));
        // Anger and grief at 1.0 each against trust at 0.5.
        assert!(prompt.contains("Pleasant: 20%"));
        assert!(prompt.contains("Total: 3"));
    }

    #[test]
    fn test_empty_context_prompt() {
        let store = MemoryStore::with_defaults();
        let context = ContextAssembler::with_defaults().preview(&store, &RecallQuery::new());

        assert!(context.is_empty());
        let prompt = context.to_prompt_string();
        assert!(prompt.contains("## Relevant Memories\nNone"));
        assert!(!prompt.contains("## Emotional Tone"));
    }
}
