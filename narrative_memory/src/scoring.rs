//! Significance scoring - a memory's time-varying relevance.
//!
//! The score combines:
//! 1. **Decay**: `max(floor, 1 - age_hours * decay_rate)` scaling the base weight
//! 2. **Reinforcement**: a capped bonus per past recall
//! 3. **Recency**: a bonus fading linearly over the recency window since last access
//! 4. **Themes**: a capped bonus per theme tag
//! 5. **Causality**: a capped bonus per causal link and effect
//!
//! The sum is scaled by the tier multiplier and clamped to 0.0 - 1.0.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MemoryConfig;
use crate::memory::MemoryNode;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Individual terms of a score, useful for explaining rankings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub decay: f32,
    pub weighted_base: f32,
    pub reinforcement_bonus: f32,
    pub recency_bonus: f32,
    pub thematic_bonus: f32,
    pub causal_bonus: f32,
    pub tier_multiplier: f32,
    pub score: f32,
}

/// Pure scoring function over node state and the current time.
#[derive(Debug, Clone)]
pub struct SignificanceScorer {
    config: MemoryConfig,
}

impl SignificanceScorer {
    pub fn new(config: MemoryConfig) -> Self {
        Self { config }
    }

    /// Current significance of a node, in 0.0 - 1.0.
    pub fn score(&self, node: &MemoryNode, now: DateTime<Utc>) -> f32 {
        self.breakdown(node, now).score
    }

    /// Compute every term of the score.
    pub fn breakdown(&self, node: &MemoryNode, now: DateTime<Utc>) -> ScoreBreakdown {
        let scoring = &self.config.scoring;
        let tier = self.config.tier(node.tier());

        let age_hours = hours_between(node.created_at(), now);
        let decay = (1.0 - age_hours * node.decay_rate()).max(scoring.decay_floor);
        let weighted_base = node.base_weight() * decay;

        let reinforcement_bonus = (node.reinforcement_count() as f32
            * scoring.reinforcement_step)
            .min(tier.reinforcement_cap);

        let idle_hours = hours_between(node.last_accessed_at(), now);
        let recency_bonus =
            (tier.recency_bonus * (1.0 - idle_hours / scoring.recency_window_hours)).max(0.0);

        let thematic_bonus =
            (node.theme_tags().len() as f32 * scoring.theme_step).min(scoring.theme_cap);

        let causal_bonus = (node.causal_links().len() as f32 * scoring.causal_link_step
            + node.causal_effects().len() as f32 * scoring.causal_effect_step)
            .min(scoring.causal_cap);

        let raw =
            weighted_base + reinforcement_bonus + recency_bonus + thematic_bonus + causal_bonus;
        let score = (raw * tier.score_multiplier).clamp(0.0, 1.0);

        ScoreBreakdown {
            decay,
            weighted_base,
            reinforcement_bonus,
            recency_bonus,
            thematic_bonus,
            causal_bonus,
            tier_multiplier: tier.score_multiplier,
            score,
        }
    }
}

/// Hours from `from` to `to`, never negative.
fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f32 {
    let ms = (to - from).num_milliseconds().max(0);
    (ms as f64 / MS_PER_HOUR) as f32
}
