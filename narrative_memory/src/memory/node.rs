//! Memory nodes and the request used to create them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use super::content::{normalize_keyword, normalize_tag};
use super::{Emotion, MemoryContent, MemoryKind, MemoryTier};

/// Unique identifier for memories. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemoryId(pub Uuid);

impl MemoryId {
    /// Create a new random memory ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MemoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MemoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for MemoryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// One memory: immutable identity plus mutable scoring state.
///
/// Nodes are only created and mutated by the [`MemoryStore`](crate::MemoryStore);
/// callers read them through accessors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryNode {
    pub(crate) id: MemoryId,
    pub(crate) content: MemoryContent,
    pub(crate) kind: MemoryKind,
    pub(crate) tier: MemoryTier,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) last_accessed_at: DateTime<Utc>,
    /// Caller-supplied salience, 0.0 - 1.0.
    pub(crate) base_weight: f32,
    pub(crate) emotion_tags: HashSet<Emotion>,
    pub(crate) theme_tags: HashSet<String>,
    pub(crate) trigger_keywords: HashSet<String>,
    pub(crate) owner_id: Option<String>,
    pub(crate) session_id: Option<String>,
    /// Significance lost per hour of age. Never below the configured minimum.
    pub(crate) decay_rate: f32,
    pub(crate) reinforcement_count: u32,
    /// Symmetric links to nodes sharing a theme or emotion.
    pub(crate) associations: HashSet<MemoryId>,
    /// Nodes that caused this one.
    pub(crate) causal_links: HashSet<MemoryId>,
    /// Nodes this one caused.
    pub(crate) causal_effects: HashSet<MemoryId>,
    pub(crate) cached_significance: Option<f32>,
    pub(crate) cached_significance_at: Option<DateTime<Utc>>,
}

impl MemoryNode {
    /// Build a fresh node from a request. Decay rate is seeded by the caller.
    pub(crate) fn from_request(
        request: NewMemory,
        now: DateTime<Utc>,
        decay_rate: f32,
    ) -> Self {
        Self {
            id: MemoryId::new(),
            content: request.content,
            kind: request.kind,
            tier: request.tier,
            created_at: now,
            last_accessed_at: now,
            base_weight: request.base_weight.clamp(0.0, 1.0),
            emotion_tags: request.emotion_tags,
            theme_tags: request.theme_tags,
            trigger_keywords: request.trigger_keywords,
            owner_id: request.owner_id,
            session_id: request.session_id,
            decay_rate,
            reinforcement_count: 0,
            associations: HashSet::new(),
            causal_links: HashSet::new(),
            causal_effects: HashSet::new(),
            cached_significance: None,
            cached_significance_at: None,
        }
    }

    pub fn id(&self) -> MemoryId {
        self.id
    }

    pub fn content(&self) -> &MemoryContent {
        &self.content
    }

    pub fn kind(&self) -> MemoryKind {
        self.kind
    }

    pub fn tier(&self) -> MemoryTier {
        self.tier
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_accessed_at(&self) -> DateTime<Utc> {
        self.last_accessed_at
    }

    pub fn base_weight(&self) -> f32 {
        self.base_weight
    }

    pub fn emotion_tags(&self) -> &HashSet<Emotion> {
        &self.emotion_tags
    }

    pub fn theme_tags(&self) -> &HashSet<String> {
        &self.theme_tags
    }

    pub fn trigger_keywords(&self) -> &HashSet<String> {
        &self.trigger_keywords
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn decay_rate(&self) -> f32 {
        self.decay_rate
    }

    pub fn reinforcement_count(&self) -> u32 {
        self.reinforcement_count
    }

    /// Raw association set. May contain ids that were since forgotten;
    /// use [`MemoryStore::associations_of`](crate::MemoryStore::associations_of)
    /// to dereference.
    pub fn associations(&self) -> &HashSet<MemoryId> {
        &self.associations
    }

    /// Raw "caused by" set. May contain forgotten ids.
    pub fn causal_links(&self) -> &HashSet<MemoryId> {
        &self.causal_links
    }

    /// Raw "caused" set. May contain forgotten ids.
    pub fn causal_effects(&self) -> &HashSet<MemoryId> {
        &self.causal_effects
    }

    /// Last computed score. Never use this for ranking.
    pub fn cached_significance(&self) -> Option<f32> {
        self.cached_significance
    }

    pub fn cached_significance_at(&self) -> Option<DateTime<Utc>> {
        self.cached_significance_at
    }

    /// Check if this node carries a theme tag (case-insensitive).
    pub fn has_theme(&self, theme: &str) -> bool {
        normalize_tag(theme).is_some_and(|t| self.theme_tags.contains(&t))
    }

    pub fn has_emotion(&self, emotion: Emotion) -> bool {
        self.emotion_tags.contains(&emotion)
    }

    /// Apply one recall's worth of reinforcement.
    pub(crate) fn reinforce(
        &mut self,
        now: DateTime<Utc>,
        decay_factor: f32,
        min_decay_rate: f32,
        significance: f32,
    ) {
        self.reinforcement_count = self.reinforcement_count.saturating_add(1);
        self.decay_rate = (self.decay_rate * decay_factor).max(min_decay_rate);
        if now > self.last_accessed_at {
            self.last_accessed_at = now;
        }
        self.cache_significance(significance, now);
    }

    pub(crate) fn cache_significance(&mut self, significance: f32, at: DateTime<Utc>) {
        self.cached_significance = Some(significance.clamp(0.0, 1.0));
        self.cached_significance_at = Some(at);
    }
}

/// Request to add a memory. Optional fields fall back to defaults.
#[derive(Debug, Clone)]
pub struct NewMemory {
    pub content: MemoryContent,
    pub kind: MemoryKind,
    pub tier: MemoryTier,
    pub owner_id: Option<String>,
    pub session_id: Option<String>,
    pub base_weight: f32,
    pub emotion_tags: HashSet<Emotion>,
    pub theme_tags: HashSet<String>,
    pub trigger_keywords: HashSet<String>,
    /// Explicitly declared causes. Unknown ids are dropped.
    pub caused_by: Vec<MemoryId>,
}

impl NewMemory {
    /// Create a mid-term event request with default weight 0.5.
    pub fn new(content: impl Into<MemoryContent>) -> Self {
        Self {
            content: content.into(),
            kind: MemoryKind::default(),
            tier: MemoryTier::MidTerm,
            owner_id: None,
            session_id: None,
            base_weight: 0.5,
            emotion_tags: HashSet::new(),
            theme_tags: HashSet::new(),
            trigger_keywords: HashSet::new(),
            caused_by: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: MemoryKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn in_tier(mut self, tier: MemoryTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set the salience. Finite values are clamped into 0.0 - 1.0 on add.
    pub fn with_weight(mut self, base_weight: f32) -> Self {
        self.base_weight = base_weight;
        self
    }

    pub fn with_emotion(mut self, emotion: Emotion) -> Self {
        self.emotion_tags.insert(emotion);
        self
    }

    pub fn with_emotions(mut self, emotions: impl IntoIterator<Item = Emotion>) -> Self {
        self.emotion_tags.extend(emotions);
        self
    }

    /// Add a theme tag. Tags are lowercased; blank tags are ignored.
    pub fn with_theme(mut self, theme: impl AsRef<str>) -> Self {
        self.theme_tags.extend(normalize_tag(theme.as_ref()));
        self
    }

    pub fn with_themes<S: AsRef<str>>(mut self, themes: impl IntoIterator<Item = S>) -> Self {
        self.theme_tags
            .extend(themes.into_iter().filter_map(|t| normalize_tag(t.as_ref())));
        self
    }

    /// Add a trigger keyword. Keywords are reduced to lowercase words, so
    /// "King's-Guard" is stored as "king s guard"; keywords without any
    /// words are ignored.
    pub fn with_trigger(mut self, keyword: impl AsRef<str>) -> Self {
        self.trigger_keywords.extend(normalize_keyword(keyword.as_ref()));
        self
    }

    pub fn with_triggers<S: AsRef<str>>(mut self, keywords: impl IntoIterator<Item = S>) -> Self {
        self.trigger_keywords
            .extend(keywords.into_iter().filter_map(|k| normalize_keyword(k.as_ref())));
        self
    }

    /// Declare an existing memory as a cause of this one.
    pub fn caused_by(mut self, cause: MemoryId) -> Self {
        self.caused_by.push(cause);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_request_builder() {
        let request = NewMemory::new("The hero spared the bandit")
            .with_kind(MemoryKind::Decision)
            .in_tier(MemoryTier::LongTerm)
            .with_owner("hero")
            .with_weight(0.8)
            .with_emotion(Emotion::Hope)
            .with_themes(["Mercy", "  ", "mercy"])
            .with_trigger("Bandit");

        assert_eq!(request.kind, MemoryKind::Decision);
        assert_eq!(request.tier, MemoryTier::LongTerm);
        assert_eq!(request.theme_tags.len(), 1);
        assert!(request.theme_tags.contains("mercy"));
        assert!(request.trigger_keywords.contains("bandit"));
    }

    #[test]
    fn test_triggers_reduced_to_words() {
        let request = NewMemory::new("x")
            .with_trigger("King's Guard")
            .with_triggers(["Lord-Commander", "?!"]);

        assert_eq!(request.trigger_keywords.len(), 2);
        assert!(request.trigger_keywords.contains("king s guard"));
        assert!(request.trigger_keywords.contains("lord commander"));
    }

    #[test]
    fn test_node_from_request_clamps_weight() {
        let node = MemoryNode::from_request(NewMemory::new("x").with_weight(1.7), epoch(), 0.02);
        assert_eq!(node.base_weight(), 1.0);
        assert_eq!(node.created_at(), node.last_accessed_at());
        assert_eq!(node.reinforcement_count(), 0);
        assert!(node.cached_significance().is_none());
    }

    #[test]
    fn test_reinforce() {
        let mut node = MemoryNode::from_request(NewMemory::new("x"), epoch(), 0.02);
        let later = epoch() + chrono::Duration::hours(3);

        node.reinforce(later, 0.9, 0.01, 0.7);

        assert_eq!(node.reinforcement_count(), 1);
        assert!((node.decay_rate() - 0.018).abs() < 1e-6);
        assert_eq!(node.last_accessed_at(), later);
        assert_eq!(node.cached_significance(), Some(0.7));
        assert_eq!(node.cached_significance_at(), Some(later));
    }

    #[test]
    fn test_reinforce_respects_decay_floor() {
        let mut node = MemoryNode::from_request(NewMemory::new("x"), epoch(), 0.0105);
        node.reinforce(epoch(), 0.9, 0.01, 0.5);
        assert_eq!(node.decay_rate(), 0.01);
    }

    #[test]
    fn test_has_theme_is_case_insensitive() {
        let node = MemoryNode::from_request(NewMemory::new("x").with_theme("Betrayal"), epoch(), 0.02);
        assert!(node.has_theme("BETRAYAL"));
        assert!(!node.has_theme("loyalty"));
    }
}
