//! Persisted snapshot format for export/import.
//!
//! Every node field is written as a primitive: timestamps as RFC 3339
//! strings, sets as sorted string lists, enums by name. Facet indices are
//! never written; they are rebuilt from the node lists on import.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;
use std::str::FromStr;

use crate::error::{MemoryError, Result};
use crate::memory::{
    normalize_keyword, normalize_tag, Emotion, MemoryContent, MemoryId, MemoryKind, MemoryNode,
    MemoryTier,
};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A full export of the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub version: u32,
    pub exported_at: String,
    pub tiers: SnapshotTiers,
}

/// Node lists per tier. Near-term lists are oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotTiers {
    #[serde(default)]
    pub near_term: Vec<SnapshotNode>,
    #[serde(default)]
    pub mid_term: Vec<SnapshotNode>,
    #[serde(default)]
    pub long_term: Vec<SnapshotNode>,
}

impl SnapshotTiers {
    pub fn get(&self, tier: MemoryTier) -> &[SnapshotNode] {
        match tier {
            MemoryTier::NearTerm => &self.near_term,
            MemoryTier::MidTerm => &self.mid_term,
            MemoryTier::LongTerm => &self.long_term,
        }
    }

    fn get_mut(&mut self, tier: MemoryTier) -> &mut Vec<SnapshotNode> {
        match tier {
            MemoryTier::NearTerm => &mut self.near_term,
            MemoryTier::MidTerm => &mut self.mid_term,
            MemoryTier::LongTerm => &mut self.long_term,
        }
    }

    pub fn len(&self) -> usize {
        self.near_term.len() + self.mid_term.len() + self.long_term.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One node, flattened to primitives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub id: String,
    pub content: MemoryContent,
    pub kind: String,
    pub tier: String,
    pub created_at: String,
    pub last_accessed_at: String,
    pub base_weight: f32,
    #[serde(default)]
    pub emotion_tags: Vec<String>,
    #[serde(default)]
    pub theme_tags: Vec<String>,
    #[serde(default)]
    pub trigger_keywords: Vec<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    pub decay_rate: f32,
    #[serde(default)]
    pub reinforcement_count: u32,
    #[serde(default)]
    pub associations: Vec<String>,
    #[serde(default)]
    pub causal_links: Vec<String>,
    #[serde(default)]
    pub causal_effects: Vec<String>,
    #[serde(default)]
    pub cached_significance: Option<f32>,
    #[serde(default)]
    pub cached_significance_at: Option<String>,
}

impl SnapshotNode {
    pub fn from_node(node: &MemoryNode) -> Self {
        Self {
            id: node.id().to_string(),
            content: node.content().clone(),
            kind: node.kind().as_str().to_string(),
            tier: node.tier().as_str().to_string(),
            created_at: format_timestamp(node.created_at()),
            last_accessed_at: format_timestamp(node.last_accessed_at()),
            base_weight: node.base_weight(),
            emotion_tags: sorted_strings(node.emotion_tags().iter().map(|e| e.as_str().to_string())),
            theme_tags: sorted_strings(node.theme_tags().iter().cloned()),
            trigger_keywords: sorted_strings(node.trigger_keywords().iter().cloned()),
            owner_id: node.owner_id().map(str::to_string),
            session_id: node.session_id().map(str::to_string),
            decay_rate: node.decay_rate(),
            reinforcement_count: node.reinforcement_count(),
            associations: sorted_strings(node.associations().iter().map(ToString::to_string)),
            causal_links: sorted_strings(node.causal_links().iter().map(ToString::to_string)),
            causal_effects: sorted_strings(node.causal_effects().iter().map(ToString::to_string)),
            cached_significance: node.cached_significance(),
            cached_significance_at: node.cached_significance_at().map(format_timestamp),
        }
    }

    /// Parse back into a node, validating every field.
    pub fn to_node(&self, min_decay_rate: f32) -> Result<MemoryNode> {
        let id = parse_id(&self.id)?;
        let field_error =
            |field: &str, message: String| MemoryError::serialization(format!("memory {}: {} {}", id, field, message));

        let kind = MemoryKind::from_str(&self.kind)
            .map_err(|_| field_error("kind", format!("'{}' is not a memory kind", self.kind)))?;
        let tier = MemoryTier::from_str(&self.tier)
            .map_err(|_| field_error("tier", format!("'{}' is not a tier", self.tier)))?;

        if !(self.base_weight.is_finite() && (0.0..=1.0).contains(&self.base_weight)) {
            return Err(field_error(
                "base_weight",
                format!("{} is outside 0.0 - 1.0", self.base_weight),
            ));
        }
        if !(self.decay_rate.is_finite() && self.decay_rate >= min_decay_rate) {
            return Err(field_error(
                "decay_rate",
                format!("{} is below the minimum {}", self.decay_rate, min_decay_rate),
            ));
        }
        let cached_significance = match self.cached_significance {
            Some(value) if !(value.is_finite() && (0.0..=1.0).contains(&value)) => {
                return Err(field_error(
                    "cached_significance",
                    format!("{} is outside 0.0 - 1.0", value),
                ))
            }
            other => other,
        };

        Ok(MemoryNode {
            id,
            content: self.content.clone(),
            kind,
            tier,
            created_at: parse_timestamp(&self.created_at)?,
            last_accessed_at: parse_timestamp(&self.last_accessed_at)?,
            base_weight: self.base_weight,
            emotion_tags: parse_set(&self.emotion_tags, |s| Emotion::from_str(s).ok())?,
            theme_tags: self.theme_tags.iter().filter_map(|t| normalize_tag(t)).collect(),
            trigger_keywords: self
                .trigger_keywords
                .iter()
                .filter_map(|k| normalize_keyword(k))
                .collect(),
            owner_id: self.owner_id.clone(),
            session_id: self.session_id.clone(),
            decay_rate: self.decay_rate,
            reinforcement_count: self.reinforcement_count,
            associations: parse_set(&self.associations, |s| s.parse().ok())?,
            causal_links: parse_set(&self.causal_links, |s| s.parse().ok())?,
            causal_effects: parse_set(&self.causal_effects, |s| s.parse().ok())?,
            cached_significance,
            cached_significance_at: self
                .cached_significance_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
        })
    }
}

impl MemorySnapshot {
    /// Snapshot an iterator of nodes. Near-term order is preserved as given;
    /// other tiers are sorted by creation time then id.
    pub fn from_nodes<'a>(
        nodes: impl IntoIterator<Item = &'a MemoryNode>,
        exported_at: DateTime<Utc>,
    ) -> Self {
        let mut tiers = SnapshotTiers::default();
        for node in nodes {
            tiers.get_mut(node.tier()).push(SnapshotNode::from_node(node));
        }
        for list in [&mut tiers.mid_term, &mut tiers.long_term] {
            list.sort_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.id.cmp(&b.id))
            });
        }
        Self {
            version: SNAPSHOT_VERSION,
            exported_at: format_timestamp(exported_at),
            tiers,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn node_count(&self) -> usize {
        self.tiers.len()
    }
}

pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| MemoryError::serialization(format!("invalid timestamp '{}': {}", s, e)))
}

fn parse_id(s: &str) -> Result<MemoryId> {
    s.parse()
        .map_err(|_| MemoryError::serialization(format!("invalid memory id '{}'", s)))
}

fn parse_set<T: Eq + Hash>(values: &[String], parse: impl Fn(&str) -> Option<T>) -> Result<HashSet<T>> {
    values
        .iter()
        .map(|value| {
            parse(value)
                .ok_or_else(|| MemoryError::serialization(format!("invalid value '{}'", value)))
        })
        .collect()
}

fn sorted_strings(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut values: Vec<String> = values.collect();
    values.sort();
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::NewMemory;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn sample() -> MemoryNode {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let mut node = MemoryNode::from_request(
            NewMemory::new("The oath at the shrine")
                .with_kind(MemoryKind::Foreshadow)
                .in_tier(MemoryTier::LongTerm)
                .with_owner("player")
                .with_session("s-1")
                .with_weight(0.7)
                .with_emotion(Emotion::Hope)
                .with_themes(["oath", "faith"])
                .with_trigger("shrine"),
            now,
            0.0325,
        );
        node.associations.insert(MemoryId::new());
        node.causal_links.insert(MemoryId::new());
        node
    }

    #[test]
    fn test_node_round_trip() {
        let node = sample();
        let flat = SnapshotNode::from_node(&node);

        assert_eq!(flat.kind, "foreshadow");
        assert_eq!(flat.tier, "long_term");
        assert_eq!(flat.theme_tags, vec!["faith", "oath"]);
        assert_eq!(flat.created_at, "2024-05-01T09:30:00Z");

        let restored = flat.to_node(0.01).unwrap();
        assert_eq!(restored, node);
    }

    #[test]
    fn test_hand_written_tags_are_normalized() {
        let mut flat = SnapshotNode::from_node(&sample());
        flat.theme_tags = vec!["War".to_string(), " ".to_string()];
        flat.trigger_keywords = vec!["King's Guard".to_string(), "--".to_string()];

        let node = flat.to_node(0.01).unwrap();
        assert_eq!(node.theme_tags().len(), 1);
        assert!(node.has_theme("war"));
        assert_eq!(node.trigger_keywords().len(), 1);
        assert!(node.trigger_keywords().contains("king s guard"));
    }

    #[test]
    fn test_rejects_unknown_enum_names() {
        let mut flat = SnapshotNode::from_node(&sample());
        flat.tier = "sideways".to_string();
        assert!(flat.to_node(0.01).unwrap_err().is_serialization());

        let mut flat = SnapshotNode::from_node(&sample());
        flat.emotion_tags.push("ennui".to_string());
        assert!(flat.to_node(0.01).unwrap_err().is_serialization());
    }

    #[test]
    fn test_rejects_out_of_range_numbers() {
        let mut flat = SnapshotNode::from_node(&sample());
        flat.base_weight = 1.5;
        assert!(flat.to_node(0.01).is_err());

        let mut flat = SnapshotNode::from_node(&sample());
        flat.decay_rate = 0.001;
        assert!(flat.to_node(0.01).is_err());
    }

    #[test]
    fn test_rejects_bad_timestamps_and_ids() {
        let mut flat = SnapshotNode::from_node(&sample());
        flat.created_at = "yesterday".to_string();
        assert!(flat.to_node(0.01).is_err());

        let mut flat = SnapshotNode::from_node(&sample());
        flat.id = "not-a-uuid".to_string();
        assert!(flat.to_node(0.01).is_err());
    }

    #[test]
    fn test_snapshot_json_shape() {
        let node = sample();
        let at = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();
        let snapshot = MemorySnapshot::from_nodes([&node], at);

        let json: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["exported_at"], "2024-05-02T00:00:00Z");
        assert_eq!(json["tiers"]["long_term"][0]["emotion_tags"][0], "hope");
        assert_eq!(json["tiers"]["near_term"].as_array().unwrap().len(), 0);

        let parsed = MemorySnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
