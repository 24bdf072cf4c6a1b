//! Closed categories for memories: kind, tier and emotion.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::MemoryError;

/// Category of a memory. Informational only; it never changes scoring.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    #[default]
    Event,
    Decision,
    Emotion,
    Relationship,
    Theme,
    WorldState,
    Callback,
    Foreshadow,
    CharacterDevelopment,
    CausalLink,
    Symbolic,
    Conflict,
}

impl MemoryKind {
    /// Every kind, in declaration order.
    pub const ALL: [MemoryKind; 12] = [
        MemoryKind::Event,
        MemoryKind::Decision,
        MemoryKind::Emotion,
        MemoryKind::Relationship,
        MemoryKind::Theme,
        MemoryKind::WorldState,
        MemoryKind::Callback,
        MemoryKind::Foreshadow,
        MemoryKind::CharacterDevelopment,
        MemoryKind::CausalLink,
        MemoryKind::Symbolic,
        MemoryKind::Conflict,
    ];

    /// Stable string name, as used in snapshots.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryKind::Event => "event",
            MemoryKind::Decision => "decision",
            MemoryKind::Emotion => "emotion",
            MemoryKind::Relationship => "relationship",
            MemoryKind::Theme => "theme",
            MemoryKind::WorldState => "world_state",
            MemoryKind::Callback => "callback",
            MemoryKind::Foreshadow => "foreshadow",
            MemoryKind::CharacterDevelopment => "character_development",
            MemoryKind::CausalLink => "causal_link",
            MemoryKind::Symbolic => "symbolic",
            MemoryKind::Conflict => "conflict",
        }
    }
}

impl std::fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryKind {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_name(s);
        MemoryKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| MemoryError::validation("kind", format!("unknown memory kind '{}'", s)))
    }
}

/// Storage class of a memory. Fixed at creation; nodes never migrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryTier {
    /// Bounded, insertion-ordered, fastest decay.
    NearTerm,
    MidTerm,
    /// Slowest decay, highest score multiplier.
    LongTerm,
}

impl MemoryTier {
    /// Every tier, near to long.
    pub const ALL: [MemoryTier; 3] = [
        MemoryTier::NearTerm,
        MemoryTier::MidTerm,
        MemoryTier::LongTerm,
    ];

    /// Stable string name, as used in snapshots.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryTier::NearTerm => "near_term",
            MemoryTier::MidTerm => "mid_term",
            MemoryTier::LongTerm => "long_term",
        }
    }
}

impl std::fmt::Display for MemoryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryTier {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "near_term" | "near" | "short_term" => Ok(MemoryTier::NearTerm),
            "mid_term" | "mid" | "medium_term" => Ok(MemoryTier::MidTerm),
            "long_term" | "long" => Ok(MemoryTier::LongTerm),
            _ => Err(MemoryError::validation(
                "tier",
                format!("unknown memory tier '{}'", s),
            )),
        }
    }
}

/// Emotion tags a memory can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Joy,
    Sadness,
    Anger,
    Fear,
    Surprise,
    Disgust,
    Trust,
    Anticipation,
    Love,
    Grief,
    Guilt,
    Shame,
    Pride,
    Hope,
    Curiosity,
    Tension,
}

impl Emotion {
    /// Every emotion, in declaration order.
    pub const ALL: [Emotion; 16] = [
        Emotion::Joy,
        Emotion::Sadness,
        Emotion::Anger,
        Emotion::Fear,
        Emotion::Surprise,
        Emotion::Disgust,
        Emotion::Trust,
        Emotion::Anticipation,
        Emotion::Love,
        Emotion::Grief,
        Emotion::Guilt,
        Emotion::Shame,
        Emotion::Pride,
        Emotion::Hope,
        Emotion::Curiosity,
        Emotion::Tension,
    ];

    /// Stable string name, as used in snapshots.
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Joy => "joy",
            Emotion::Sadness => "sadness",
            Emotion::Anger => "anger",
            Emotion::Fear => "fear",
            Emotion::Surprise => "surprise",
            Emotion::Disgust => "disgust",
            Emotion::Trust => "trust",
            Emotion::Anticipation => "anticipation",
            Emotion::Love => "love",
            Emotion::Grief => "grief",
            Emotion::Guilt => "guilt",
            Emotion::Shame => "shame",
            Emotion::Pride => "pride",
            Emotion::Hope => "hope",
            Emotion::Curiosity => "curiosity",
            Emotion::Tension => "tension",
        }
    }

    /// Whether the emotion is generally felt as pleasant.
    pub fn is_positive(&self) -> bool {
        matches!(
            self,
            Emotion::Joy
                | Emotion::Trust
                | Emotion::Anticipation
                | Emotion::Love
                | Emotion::Pride
                | Emotion::Hope
                | Emotion::Curiosity
        )
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_name(s);
        Emotion::ALL
            .into_iter()
            .find(|emotion| emotion.as_str() == normalized)
            .ok_or_else(|| MemoryError::validation("emotion", format!("unknown emotion '{}'", s)))
    }
}

/// Lowercase, trim, and fold `-`/space separators to `_`.
fn normalize_name(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_parsing() {
        assert_eq!("near_term".parse::<MemoryTier>().unwrap(), MemoryTier::NearTerm);
        assert_eq!("Mid-Term".parse::<MemoryTier>().unwrap(), MemoryTier::MidTerm);
        assert_eq!("long term".parse::<MemoryTier>().unwrap(), MemoryTier::LongTerm);

        let err = "sideways".parse::<MemoryTier>().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_kind_round_trips_through_name() {
        for kind in MemoryKind::ALL {
            assert_eq!(kind.as_str().parse::<MemoryKind>().unwrap(), kind);
        }
        assert_eq!(
            "character-development".parse::<MemoryKind>().unwrap(),
            MemoryKind::CharacterDevelopment
        );
        assert!("gossip".parse::<MemoryKind>().is_err());
    }

    #[test]
    fn test_emotion_parsing() {
        assert_eq!(" Fear ".parse::<Emotion>().unwrap(), Emotion::Fear);
        assert!("melancholy".parse::<Emotion>().unwrap_err().is_validation());
        assert!(Emotion::Hope.is_positive());
        assert!(!Emotion::Grief.is_positive());
    }

    #[test]
    fn test_serde_names_match_as_str() {
        let json = serde_json::to_string(&MemoryKind::WorldState).unwrap();
        assert_eq!(json, "\"world_state\"");
        let json = serde_json::to_string(&MemoryTier::LongTerm).unwrap();
        assert_eq!(json, "\"long_term\"");
    }
}
