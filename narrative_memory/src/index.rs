//! Facet indices - secondary lookups from a facet value to node ids.
//!
//! Indices are derived data: they are rebuilt from the node list on import
//! and never serialized. `remove` must purge every entry `update` created.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::memory::{Emotion, MemoryId, MemoryNode};

/// Number of distinct keys per facet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetSizes {
    pub owners: usize,
    pub themes: usize,
    pub emotions: usize,
    pub keywords: usize,
    pub causal_targets: usize,
}

#[derive(Debug, Clone, Default)]
pub struct IndexSet {
    by_owner: HashMap<String, HashSet<MemoryId>>,
    by_theme: HashMap<String, HashSet<MemoryId>>,
    by_emotion: HashMap<Emotion, HashSet<MemoryId>>,
    by_keyword: HashMap<String, HashSet<MemoryId>>,
    /// Cause id -> ids of nodes citing it as a cause.
    by_causal_target: HashMap<MemoryId, HashSet<MemoryId>>,
}

impl IndexSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build indices from scratch.
    pub fn rebuild<'a>(nodes: impl IntoIterator<Item = &'a MemoryNode>) -> Self {
        let mut index = Self::new();
        for node in nodes {
            index.update(node);
        }
        index
    }

    /// Index every facet of a node.
    pub fn update(&mut self, node: &MemoryNode) {
        let id = node.id();

        if let Some(owner) = node.owner_id() {
            insert_entry(&mut self.by_owner, owner.to_string(), id);
        }
        for theme in node.theme_tags() {
            insert_entry(&mut self.by_theme, theme.clone(), id);
        }
        for emotion in node.emotion_tags() {
            insert_entry(&mut self.by_emotion, *emotion, id);
        }
        for keyword in node.trigger_keywords() {
            insert_entry(&mut self.by_keyword, keyword.clone(), id);
        }
        for cause in node.causal_links() {
            insert_entry(&mut self.by_causal_target, *cause, id);
        }
    }

    /// Record that `effect` cites `cause`.
    pub fn add_causal(&mut self, cause: MemoryId, effect: MemoryId) {
        insert_entry(&mut self.by_causal_target, cause, effect);
    }

    /// Purge every entry referencing the node, including the causal facet
    /// keyed on the node itself.
    pub fn remove(&mut self, node: &MemoryNode) {
        let id = node.id();

        if let Some(owner) = node.owner_id() {
            remove_entry(&mut self.by_owner, owner, id);
        }
        for theme in node.theme_tags() {
            remove_entry(&mut self.by_theme, theme.as_str(), id);
        }
        for emotion in node.emotion_tags() {
            remove_entry(&mut self.by_emotion, emotion, id);
        }
        for keyword in node.trigger_keywords() {
            remove_entry(&mut self.by_keyword, keyword.as_str(), id);
        }
        for cause in node.causal_links() {
            remove_entry(&mut self.by_causal_target, cause, id);
        }
        self.by_causal_target.remove(&id);
    }

    /// Drop causal entries keyed on causes that no longer exist.
    pub fn retain_causes(&mut self, exists: impl Fn(MemoryId) -> bool) {
        self.by_causal_target.retain(|cause, _| exists(*cause));
    }

    pub fn by_owner(&self, owner: &str) -> HashSet<MemoryId> {
        lookup(&self.by_owner, owner)
    }

    pub fn by_theme(&self, theme: &str) -> HashSet<MemoryId> {
        lookup(&self.by_theme, theme)
    }

    pub fn by_emotion(&self, emotion: Emotion) -> HashSet<MemoryId> {
        lookup(&self.by_emotion, &emotion)
    }

    pub fn by_keyword(&self, keyword: &str) -> HashSet<MemoryId> {
        lookup(&self.by_keyword, keyword)
    }

    /// Nodes citing `cause` as a cause.
    pub fn by_causal_target(&self, cause: MemoryId) -> HashSet<MemoryId> {
        lookup(&self.by_causal_target, &cause)
    }

    /// Word count of the longest indexed keyword or theme. Text lookups
    /// must build windows at least this wide to reach every entry.
    pub fn longest_phrase_words(&self) -> usize {
        self.by_keyword
            .keys()
            .chain(self.by_theme.keys())
            .map(|phrase| phrase.split_whitespace().count())
            .max()
            .unwrap_or(0)
    }

    pub fn facet_sizes(&self) -> FacetSizes {
        FacetSizes {
            owners: self.by_owner.len(),
            themes: self.by_theme.len(),
            emotions: self.by_emotion.len(),
            keywords: self.by_keyword.len(),
            causal_targets: self.by_causal_target.len(),
        }
    }

    /// Every id mentioned anywhere in the indices, as key or value.
    pub fn referenced_ids(&self) -> HashSet<MemoryId> {
        let values = self
            .by_owner
            .values()
            .chain(self.by_theme.values())
            .chain(self.by_emotion.values())
            .chain(self.by_keyword.values())
            .chain(self.by_causal_target.values())
            .flatten()
            .copied();
        values
            .chain(self.by_causal_target.keys().copied())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.by_owner.is_empty()
            && self.by_theme.is_empty()
            && self.by_emotion.is_empty()
            && self.by_keyword.is_empty()
            && self.by_causal_target.is_empty()
    }
}

fn insert_entry<K: Eq + Hash>(map: &mut HashMap<K, HashSet<MemoryId>>, key: K, id: MemoryId) {
    map.entry(key).or_default().insert(id);
}

/// Remove an id from a facet, dropping the key once its set is empty.
fn remove_entry<K, Q>(map: &mut HashMap<K, HashSet<MemoryId>>, key: &Q, id: MemoryId)
where
    K: Eq + Hash + std::borrow::Borrow<Q>,
    Q: Eq + Hash + ?Sized,
{
    if let Some(ids) = map.get_mut(key) {
        ids.remove(&id);
        if ids.is_empty() {
            map.remove(key);
        }
    }
}

fn lookup<K, Q>(map: &HashMap<K, HashSet<MemoryId>>, key: &Q) -> HashSet<MemoryId>
where
    K: Eq + Hash + std::borrow::Borrow<Q>,
    Q: Eq + Hash + ?Sized,
{
    map.get(key).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::NewMemory;
    use chrono::{TimeZone, Utc};

    fn node(request: NewMemory) -> MemoryNode {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        MemoryNode::from_request(request, now, 0.05)
    }

    fn rich_node() -> MemoryNode {
        node(
            NewMemory::new("The duke's betrayal at the river")
                .with_owner("player")
                .with_emotions([Emotion::Anger, Emotion::Grief])
                .with_themes(["betrayal", "nobility"])
                .with_triggers(["duke", "river"]),
        )
    }

    #[test]
    fn test_update_indexes_every_facet() {
        let mut index = IndexSet::new();
        let n = rich_node();
        index.update(&n);

        assert!(index.by_owner("player").contains(&n.id()));
        assert!(index.by_theme("nobility").contains(&n.id()));
        assert!(index.by_emotion(Emotion::Grief).contains(&n.id()));
        assert!(index.by_keyword("duke").contains(&n.id()));
        assert!(index.by_keyword("castle").is_empty());
        assert_eq!(
            index.facet_sizes(),
            FacetSizes {
                owners: 1,
                themes: 2,
                emotions: 2,
                keywords: 2,
                causal_targets: 0,
            }
        );
    }

    #[test]
    fn test_longest_phrase_words_follows_entries() {
        let mut index = IndexSet::new();
        assert_eq!(index.longest_phrase_words(), 0);

        let short = rich_node();
        let long = node(NewMemory::new("x").with_trigger("the old iron gate"));
        index.update(&short);
        index.update(&long);
        assert_eq!(index.longest_phrase_words(), 4);

        index.remove(&long);
        assert_eq!(index.longest_phrase_words(), 1);
    }

    #[test]
    fn test_update_then_remove_leaves_nothing() {
        let mut index = IndexSet::new();
        let cause = rich_node();
        let mut effect = rich_node();
        effect.causal_links.insert(cause.id());

        index.update(&cause);
        index.update(&effect);
        assert!(index.by_causal_target(cause.id()).contains(&effect.id()));

        index.remove(&effect);
        index.remove(&cause);

        assert!(index.is_empty(), "leftover entries: {:?}", index.facet_sizes());
        assert!(index.referenced_ids().is_empty());
    }

    #[test]
    fn test_remove_keeps_other_nodes() {
        let mut index = IndexSet::new();
        let a = rich_node();
        let b = rich_node();
        index.update(&a);
        index.update(&b);

        index.remove(&a);

        assert_eq!(index.by_theme("betrayal").len(), 1);
        assert!(index.by_theme("betrayal").contains(&b.id()));
        assert!(!index.referenced_ids().contains(&a.id()));
    }

    #[test]
    fn test_removing_a_cause_drops_its_causal_key() {
        let mut index = IndexSet::new();
        let cause = rich_node();
        let effect = rich_node();
        index.update(&cause);
        index.update(&effect);
        index.add_causal(cause.id(), effect.id());

        index.remove(&cause);

        assert!(index.by_causal_target(cause.id()).is_empty());
        assert!(!index.referenced_ids().contains(&cause.id()));
    }

    #[test]
    fn test_rebuild_matches_incremental() {
        let nodes = vec![rich_node(), rich_node()];
        let mut incremental = IndexSet::new();
        nodes.iter().for_each(|n| incremental.update(n));

        let rebuilt = IndexSet::rebuild(&nodes);

        assert_eq!(rebuilt.referenced_ids(), incremental.referenced_ids());
        assert_eq!(rebuilt.facet_sizes(), incremental.facet_sizes());
    }
}
