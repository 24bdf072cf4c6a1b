//! Association engine - links a new memory to what the store already holds.
//!
//! Two kinds of links are made on insert:
//! - **Associations**: symmetric edges to every node sharing a theme or emotion tag
//! - **Causal edges**: asymmetric "caused by" edges, inferred by a pluggable
//!   [`CausalInference`] heuristic
//!
//! Causal inference is best-effort. It never fails; when unsure it finds nothing.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Debug;
use tracing::debug;

use crate::index::IndexSet;
use crate::memory::{keyword_windows, tokenize, MemoryId, MemoryNode};
use crate::tiers::TierStore;

/// Connectives signalling that a memory describes a consequence.
const CAUSAL_CONNECTIVES: &[&str] = &[
    "because",
    "after",
    "led to",
    "leads to",
    "due to",
    "caused",
    "caused by",
    "resulted in",
    "as a result",
    "therefore",
    "so that",
    "since",
    "thanks to",
    "in response to",
    "triggered",
    "consequently",
];

/// A directed "cause -> effect" edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CausalEdge {
    pub cause: MemoryId,
    pub effect: MemoryId,
}

/// Heuristic for finding the causes of a new memory.
pub trait CausalInference: Debug + Send + Sync {
    /// Edges whose effect is `new_node` and whose cause is one of `existing`.
    fn infer_causal_edges(&self, new_node: &MemoryNode, existing: &[&MemoryNode])
        -> Vec<CausalEdge>;
}

/// Never infers anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCausalInference;

impl CausalInference for NoCausalInference {
    fn infer_causal_edges(&self, _: &MemoryNode, _: &[&MemoryNode]) -> Vec<CausalEdge> {
        Vec::new()
    }
}

/// Finds causes by connective words plus trigger-keyword overlap.
///
/// If the new memory's text contains a causal connective ("because",
/// "led to", ...), every existing memory whose trigger keywords appear in
/// that text is taken as a cause.
#[derive(Debug, Clone)]
pub struct KeywordCausalInference {
    connectives: Vec<Vec<String>>,
}

impl KeywordCausalInference {
    pub fn new() -> Self {
        Self::with_connectives(CAUSAL_CONNECTIVES.iter().copied())
    }

    /// Use a custom connective vocabulary.
    pub fn with_connectives<S: AsRef<str>>(connectives: impl IntoIterator<Item = S>) -> Self {
        Self {
            connectives: connectives
                .into_iter()
                .map(|c| tokenize(c.as_ref()))
                .filter(|words| !words.is_empty())
                .collect(),
        }
    }

    /// Whether the token stream contains any connective.
    pub fn has_connective(&self, tokens: &[String]) -> bool {
        self.connectives
            .iter()
            .any(|phrase| contains_phrase(tokens, phrase))
    }
}

impl Default for KeywordCausalInference {
    fn default() -> Self {
        Self::new()
    }
}

impl CausalInference for KeywordCausalInference {
    fn infer_causal_edges(
        &self,
        new_node: &MemoryNode,
        existing: &[&MemoryNode],
    ) -> Vec<CausalEdge> {
        let tokens = tokenize(&new_node.content().plain_text());
        if tokens.is_empty() || !self.has_connective(&tokens) {
            return Vec::new();
        }

        existing
            .iter()
            .filter(|candidate| candidate.id() != new_node.id())
            .filter(|candidate| {
                candidate
                    .trigger_keywords()
                    .iter()
                    .any(|keyword| contains_phrase(&tokens, &tokenize(keyword)))
            })
            .map(|candidate| CausalEdge {
                cause: candidate.id(),
                effect: new_node.id(),
            })
            .collect()
    }
}

fn contains_phrase(tokens: &[String], phrase: &[String]) -> bool {
    !phrase.is_empty()
        && tokens.len() >= phrase.len()
        && tokens.windows(phrase.len()).any(|window| window == phrase)
}

/// What linking a new node produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkReport {
    pub associations: usize,
    pub causal_edges: usize,
}

/// Links new nodes into the existing graph.
#[derive(Debug)]
pub struct AssociationEngine {
    causal: Box<dyn CausalInference>,
}

impl AssociationEngine {
    pub fn new(causal: Box<dyn CausalInference>) -> Self {
        Self { causal }
    }

    /// Engine with the default keyword heuristic.
    pub fn with_defaults() -> Self {
        Self::new(Box::new(KeywordCausalInference::new()))
    }

    /// Engine that only builds symmetric associations.
    pub fn without_causal_inference() -> Self {
        Self::new(Box::new(NoCausalInference))
    }

    pub fn set_causal_inference(&mut self, causal: Box<dyn CausalInference>) {
        self.causal = causal;
    }

    /// Link a node that is not yet stored or indexed to the existing ones.
    pub fn link(&self, node: &mut MemoryNode, tiers: &mut TierStore, index: &IndexSet) -> LinkReport {
        let mut report = LinkReport::default();

        let mut related: HashSet<MemoryId> = HashSet::new();
        for theme in node.theme_tags() {
            related.extend(index.by_theme(theme));
        }
        for emotion in node.emotion_tags() {
            related.extend(index.by_emotion(*emotion));
        }
        related.remove(&node.id());

        for other_id in related {
            if let Some(other) = tiers.get_mut(other_id) {
                other.associations.insert(node.id());
                node.associations.insert(other_id);
                report.associations += 1;
            }
        }

        let edges = {
            let candidates = keyword_candidates(node, tiers, index);
            self.causal.infer_causal_edges(node, &candidates)
        };
        for edge in edges {
            if edge.effect != node.id() || edge.cause == node.id() {
                continue;
            }
            if let Some(cause) = tiers.get_mut(edge.cause) {
                cause.causal_effects.insert(node.id());
                node.causal_links.insert(edge.cause);
                report.causal_edges += 1;
            }
        }

        debug!(
            memory_id = %node.id(),
            associations = report.associations,
            causal_edges = report.causal_edges,
            "linked memory"
        );
        report
    }
}

impl Default for AssociationEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Stored nodes whose trigger keywords occur in the node's text.
fn keyword_candidates<'a>(
    node: &MemoryNode,
    tiers: &'a TierStore,
    index: &IndexSet,
) -> Vec<&'a MemoryNode> {
    let mut ids: HashSet<MemoryId> = HashSet::new();
    for window in keyword_windows(&node.content().plain_text(), index.longest_phrase_words()) {
        ids.extend(index.by_keyword(&window));
    }
    ids.into_iter().filter_map(|id| tiers.get(id)).collect()
}
