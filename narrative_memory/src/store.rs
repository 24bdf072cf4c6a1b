//! Memory store - the facade over tiers, indices, associations and scoring.
//!
//! Writes flow one way: `add` -> tier placement -> association scan -> index
//! update -> near-term eviction. Reads fan out: `recall` -> index
//! intersection -> scoring -> sort -> reinforcement write-back.
//!
//! Forgetting removes nodes and their index entries but leaves surviving
//! nodes' link sets alone. Links to forgotten ids are dropped whenever they
//! are dereferenced through the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::association::{AssociationEngine, CausalInference};
use crate::clock::{Clock, SystemClock};
use crate::config::MemoryConfig;
use crate::error::{MemoryError, Result};
use crate::index::{FacetSizes, IndexSet};
use crate::memory::{
    keyword_windows, normalize_tag, Emotion, MemoryId, MemoryKind, MemoryNode, MemoryTier,
    NewMemory,
};
use crate::scoring::SignificanceScorer;
use crate::snapshot::{MemorySnapshot, SNAPSHOT_VERSION};
use crate::tiers::TierStore;

/// Filters for a recall. Every supplied filter must match; no filters
/// matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecallQuery {
    /// Free text matched against trigger keywords and theme tags.
    pub query_text: Option<String>,
    pub emotion: Option<Emotion>,
    /// Matches memories carrying any of these themes.
    pub themes: Vec<String>,
    pub owner_id: Option<String>,
    pub session_id: Option<String>,
    pub tier: Option<MemoryTier>,
    pub kind: Option<MemoryKind>,
    /// Drop memories scoring below this.
    pub min_significance: Option<f32>,
}

impl RecallQuery {
    /// A query with no filters.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.query_text = Some(text.into());
        self
    }

    pub fn emotion(mut self, emotion: Emotion) -> Self {
        self.emotion = Some(emotion);
        self
    }

    pub fn theme(mut self, theme: impl Into<String>) -> Self {
        self.themes.push(theme.into());
        self
    }

    pub fn owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn tier(mut self, tier: MemoryTier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn kind(mut self, kind: MemoryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn min_significance(mut self, threshold: f32) -> Self {
        self.min_significance = Some(threshold);
        self
    }
}

/// A recalled memory with the score it was ranked by.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecalledMemory {
    pub node: MemoryNode,
    pub significance: f32,
}

/// Aggregate view of the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total: usize,
    pub tier_counts: BTreeMap<MemoryTier, usize>,
    pub kind_counts: BTreeMap<MemoryKind, usize>,
    /// Mean current score; 0.0 for an empty store.
    pub average_significance: f32,
    pub total_reinforcements: u64,
    pub facets: FacetSizes,
}

/// Outcome of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    /// Ids seen more than once; the last occurrence won.
    pub duplicates: usize,
    /// Near-term nodes dropped to respect capacity.
    pub evicted: usize,
}

/// The memory store. One instance per campaign or session; not a global.
#[derive(Debug)]
pub struct MemoryStore {
    config: MemoryConfig,
    tiers: TierStore,
    index: IndexSet,
    associations: AssociationEngine,
    scorer: SignificanceScorer,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    /// Create an empty store reading time from the system clock.
    pub fn new(config: MemoryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    pub fn with_defaults() -> Self {
        Self::build(MemoryConfig::default())
    }

    fn build(config: MemoryConfig) -> Self {
        let associations = if config.causal_inference {
            AssociationEngine::with_defaults()
        } else {
            AssociationEngine::without_causal_inference()
        };
        Self {
            tiers: TierStore::new(config.near_term_capacity),
            index: IndexSet::new(),
            associations,
            scorer: SignificanceScorer::new(config.clone()),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Swap the causal heuristic used on future inserts.
    pub fn set_causal_inference(&mut self, causal: Box<dyn CausalInference>) {
        self.associations.set_causal_inference(causal);
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn scorer(&self) -> &SignificanceScorer {
        &self.scorer
    }

    /// Read-only access to the facet indices.
    pub fn index(&self) -> &IndexSet {
        &self.index
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    // ==================== Writes ====================

    /// Add a memory and return its new id.
    pub fn add(&mut self, request: NewMemory) -> Result<MemoryId> {
        let now = self.now();
        self.add_at(request, now)
    }

    /// Add a memory as of `now`.
    ///
    /// Non-finite weights are rejected before anything changes; finite
    /// weights are clamped into 0.0 - 1.0.
    pub fn add_at(&mut self, request: NewMemory, now: DateTime<Utc>) -> Result<MemoryId> {
        if !request.base_weight.is_finite() {
            return Err(MemoryError::validation(
                "base_weight",
                format!("{} is not a finite number", request.base_weight),
            ));
        }

        let base_weight = request.base_weight.clamp(0.0, 1.0);
        let decay_rate = self.config.seed_decay_rate(request.tier, base_weight);
        let declared_causes = request.caused_by.clone();
        let mut node = MemoryNode::from_request(request, now, decay_rate);
        let id = node.id();

        self.associations
            .link(&mut node, &mut self.tiers, &self.index);

        for cause_id in declared_causes {
            if cause_id == id {
                continue;
            }
            match self.tiers.get_mut(cause_id) {
                Some(cause) => {
                    cause.causal_effects.insert(id);
                    node.causal_links.insert(cause_id);
                }
                None => debug!(memory_id = %id, cause = %cause_id, "ignoring unknown declared cause"),
            }
        }

        let significance = self.scorer.score(&node, now);
        node.cache_significance(significance, now);

        debug!(
            memory_id = %id,
            tier = %node.tier(),
            kind = %node.kind(),
            base_weight,
            "added memory"
        );

        self.index.update(&node);
        self.tiers.insert(node);

        for evicted in self.tiers.capacity_evict() {
            debug!(memory_id = %evicted.id(), "evicted near-term memory");
            self.index.remove(&evicted);
        }

        Ok(id)
    }

    /// Declare that `cause` led to `effect`. Returns `false` when either id is
    /// unknown or they are the same memory.
    pub fn link_causal(&mut self, cause: MemoryId, effect: MemoryId) -> bool {
        if cause == effect || !self.tiers.contains(cause) || !self.tiers.contains(effect) {
            return false;
        }
        if let Some(node) = self.tiers.get_mut(cause) {
            node.causal_effects.insert(effect);
        }
        if let Some(node) = self.tiers.get_mut(effect) {
            node.causal_links.insert(cause);
        }
        self.index.add_causal(cause, effect);
        true
    }

    // ==================== Reads ====================

    pub fn get(&self, id: MemoryId) -> Option<&MemoryNode> {
        self.tiers.get(id)
    }

    pub fn contains(&self, id: MemoryId) -> bool {
        self.tiers.contains(id)
    }

    /// Current score of a memory, if it still exists.
    pub fn significance(&self, id: MemoryId) -> Option<f32> {
        self.significance_at(id, self.now())
    }

    pub fn significance_at(&self, id: MemoryId, now: DateTime<Utc>) -> Option<f32> {
        self.tiers.get(id).map(|node| self.scorer.score(node, now))
    }

    /// Associated memories that still exist.
    pub fn associations_of(&self, id: MemoryId) -> Vec<&MemoryNode> {
        self.dereference(id, MemoryNode::associations)
    }

    /// Memories that caused this one and still exist.
    pub fn causes_of(&self, id: MemoryId) -> Vec<&MemoryNode> {
        self.dereference(id, MemoryNode::causal_links)
    }

    /// Memories this one caused that still exist.
    pub fn effects_of(&self, id: MemoryId) -> Vec<&MemoryNode> {
        self.dereference(id, MemoryNode::causal_effects)
    }

    fn dereference(
        &self,
        id: MemoryId,
        links: impl Fn(&MemoryNode) -> &HashSet<MemoryId>,
    ) -> Vec<&MemoryNode> {
        let Some(node) = self.tiers.get(id) else {
            return Vec::new();
        };
        let mut linked: Vec<&MemoryNode> = links(node)
            .iter()
            .filter_map(|other| self.tiers.get(*other))
            .collect();
        linked.sort_by_key(|n| (n.created_at(), n.id()));
        linked
    }

    /// Rank memories without reinforcing them.
    pub fn rank(&self, query: &RecallQuery, limit: usize) -> Vec<RecalledMemory> {
        self.rank_at(query, limit, self.now())
    }

    pub fn rank_at(
        &self,
        query: &RecallQuery,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Vec<RecalledMemory> {
        if limit == 0 {
            return Vec::new();
        }

        let mut ranked: Vec<(&MemoryNode, f32)> = self
            .candidates(query)
            .into_iter()
            .filter_map(|id| self.tiers.get(id))
            .filter(|node| query.tier.map_or(true, |tier| node.tier() == tier))
            .filter(|node| query.kind.map_or(true, |kind| node.kind() == kind))
            .filter(|node| {
                query
                    .session_id
                    .as_deref()
                    .map_or(true, |session| node.session_id() == Some(session))
            })
            .map(|node| (node, self.scorer.score(node, now)))
            .filter(|(_, score)| query.min_significance.map_or(true, |min| *score >= min))
            .collect();

        ranked.sort_by(|(a, a_score), (b, b_score)| compare_ranked(a, *a_score, b, *b_score));
        ranked.truncate(limit);

        ranked
            .into_iter()
            .map(|(node, significance)| RecalledMemory {
                node: node.clone(),
                significance,
            })
            .collect()
    }

    /// Recall the most significant memories matching `query`, reinforcing
    /// each one returned.
    pub fn recall(&mut self, query: &RecallQuery, limit: usize) -> Vec<RecalledMemory> {
        let now = self.now();
        self.recall_at(query, limit, now)
    }

    pub fn recall_at(
        &mut self,
        query: &RecallQuery,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Vec<RecalledMemory> {
        let mut recalled = self.rank_at(query, limit, now);

        let factor = self.config.scoring.reinforcement_decay_factor;
        let min_rate = self.config.scoring.min_decay_rate;
        for memory in &mut recalled {
            if let Some(node) = self.tiers.get_mut(memory.node.id()) {
                node.reinforce(now, factor, min_rate, memory.significance);
                memory.node = node.clone();
            }
        }

        debug!(returned = recalled.len(), limit, "recalled memories");
        recalled
    }

    /// Ids matching every indexed filter of the query.
    fn candidates(&self, query: &RecallQuery) -> Vec<MemoryId> {
        let mut facets: Vec<HashSet<MemoryId>> = Vec::new();

        if let Some(text) = query.query_text.as_deref() {
            let mut matched = HashSet::new();
            for window in keyword_windows(text, self.index.longest_phrase_words()) {
                matched.extend(self.index.by_keyword(&window));
                matched.extend(self.index.by_theme(&window));
            }
            facets.push(matched);
        }
        if let Some(emotion) = query.emotion {
            facets.push(self.index.by_emotion(emotion));
        }
        if !query.themes.is_empty() {
            let mut matched = HashSet::new();
            for theme in query.themes.iter().filter_map(|t| normalize_tag(t)) {
                matched.extend(self.index.by_theme(&theme));
            }
            facets.push(matched);
        }
        if let Some(owner) = query.owner_id.as_deref() {
            facets.push(self.index.by_owner(owner));
        }

        let mut facets = facets.into_iter();
        match facets.next() {
            None => self.tiers.ids(),
            Some(first) => facets
                .fold(first, |acc, next| acc.intersection(&next).copied().collect())
                .into_iter()
                .collect(),
        }
    }

    // ==================== Forgetting ====================

    /// Remove every memory scoring below `threshold`. Returns the removed ids.
    pub fn forget(&mut self, threshold: f32) -> Vec<MemoryId> {
        let now = self.now();
        self.forget_at(threshold, now)
    }

    pub fn forget_at(&mut self, threshold: f32, now: DateTime<Utc>) -> Vec<MemoryId> {
        let doomed: Vec<MemoryId> = self
            .tiers
            .all()
            .filter(|node| self.scorer.score(node, now) < threshold)
            .map(MemoryNode::id)
            .collect();

        for id in &doomed {
            if let Some(node) = self.tiers.remove(*id) {
                self.index.remove(&node);
            }
        }

        if !doomed.is_empty() {
            info!(
                forgotten = doomed.len(),
                remaining = self.tiers.len(),
                threshold,
                "forgot low-significance memories"
            );
        }
        doomed
    }

    // ==================== Stats ====================

    pub fn stats(&self) -> MemoryStats {
        self.stats_at(self.now())
    }

    pub fn stats_at(&self, now: DateTime<Utc>) -> MemoryStats {
        let mut stats = MemoryStats {
            total: self.tiers.len(),
            facets: self.index.facet_sizes(),
            ..MemoryStats::default()
        };
        for tier in MemoryTier::ALL {
            stats.tier_counts.insert(tier, self.tiers.tier_len(tier));
        }

        let mut significance_sum = 0.0f64;
        for node in self.tiers.all() {
            *stats.kind_counts.entry(node.kind()).or_default() += 1;
            stats.total_reinforcements += u64::from(node.reinforcement_count());
            significance_sum += f64::from(self.scorer.score(node, now));
        }
        if stats.total > 0 {
            stats.average_significance = (significance_sum / stats.total as f64) as f32;
        }
        stats
    }

    // ==================== Export / Import ====================

    pub fn export(&self) -> MemorySnapshot {
        let snapshot = MemorySnapshot::from_nodes(self.tiers.all(), self.now());
        info!(memories = snapshot.node_count(), "exported memory snapshot");
        snapshot
    }

    pub fn export_json(&self) -> Result<String> {
        self.export().to_json()
    }

    /// Replace the whole store with a snapshot.
    ///
    /// Atomic: the snapshot is fully parsed and validated first, and the live
    /// store is only touched once that succeeds. Duplicate ids are not fatal;
    /// the last occurrence wins.
    pub fn import(&mut self, snapshot: &MemorySnapshot) -> Result<ImportReport> {
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(MemoryError::serialization(format!(
                "snapshot version {} is newer than supported version {}",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }

        let min_rate = self.config.scoring.min_decay_rate;
        let mut tiers = TierStore::new(self.config.near_term_capacity);
        let mut report = ImportReport::default();

        for tier in MemoryTier::ALL {
            for flat in snapshot.tiers.get(tier) {
                let node = flat.to_node(min_rate)?;
                if node.tier() != tier {
                    return Err(MemoryError::serialization(format!(
                        "memory {} is listed under {} but declares tier {}",
                        node.id(),
                        tier,
                        node.tier()
                    )));
                }
                let id = node.id();
                if tiers.insert(node).is_some() {
                    warn!(memory_id = %id, "duplicate memory id in snapshot; keeping the last one");
                    report.duplicates += 1;
                }
            }
        }

        report.evicted = tiers.capacity_evict().len();
        if report.evicted > 0 {
            warn!(
                evicted = report.evicted,
                capacity = self.config.near_term_capacity,
                "snapshot exceeded near-term capacity; oldest memories dropped"
            );
        }
        report.imported = tiers.len();

        // Survivors may still cite forgotten causes.
        let mut index = IndexSet::rebuild(tiers.all());
        index.retain_causes(|id| tiers.contains(id));
        self.index = index;
        self.tiers = tiers;

        info!(
            imported = report.imported,
            duplicates = report.duplicates,
            evicted = report.evicted,
            "imported memory snapshot"
        );
        Ok(report)
    }

    pub fn import_json(&mut self, json: &str) -> Result<ImportReport> {
        let snapshot = MemorySnapshot::from_json(json)?;
        self.import(&snapshot)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Score descending, then most recently accessed, then newest, then id.
fn compare_ranked(a: &MemoryNode, a_score: f32, b: &MemoryNode, b_score: f32) -> Ordering {
    b_score
        .partial_cmp(&a_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.last_accessed_at().cmp(&a.last_accessed_at()))
        .then_with(|| b.created_at().cmp(&a.created_at()))
        .then_with(|| a.id().cmp(&b.id()))
}
