//! Aggregated emotional tone of a set of memories.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::memory::Emotion;

/// Accumulated weight per emotion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionWeights {
    weights: HashMap<Emotion, f32>,
}

impl EmotionWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add weight to an emotion (accumulates with existing weight).
    pub fn add_weight(&mut self, emotion: Emotion, weight: f32) {
        *self.weights.entry(emotion).or_insert(0.0) += weight;
    }

    pub fn get_weight(&self, emotion: Emotion) -> f32 {
        self.weights.get(&emotion).copied().unwrap_or(0.0)
    }

    /// Emotions at or above the threshold, strongest first.
    pub fn dominant(&self, threshold: f32) -> Vec<(Emotion, f32)> {
        let mut emotions: Vec<_> = self
            .weights
            .iter()
            .filter(|(_, weight)| **weight >= threshold)
            .map(|(emotion, weight)| (*emotion, *weight))
            .collect();

        emotions.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        emotions
    }

    /// The single strongest emotion.
    pub fn strongest(&self) -> Option<(Emotion, f32)> {
        self.dominant(f32::MIN).into_iter().next()
    }

    pub fn total(&self) -> f32 {
        self.weights.values().sum()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Scale so the strongest emotion is 1.0.
    pub fn normalize(&mut self) {
        if let Some((_, max_weight)) = self.strongest() {
            if max_weight > 0.0 {
                for weight in self.weights.values_mut() {
                    *weight /= max_weight;
                }
            }
        }
    }

    /// Share of the total weight carried by pleasant emotions, or `None`
    /// when there is no weight at all.
    pub fn positive_share(&self) -> Option<f32> {
        let total = self.total();
        if total <= 0.0 {
            return None;
        }
        let positive: f32 = self
            .weights
            .iter()
            .filter(|(emotion, _)| emotion.is_positive())
            .map(|(_, weight)| weight)
            .sum();
        Some(positive / total)
    }

    /// Drop emotions below the threshold.
    pub fn prune(&mut self, threshold: f32) {
        self.weights.retain(|_, weight| *weight >= threshold);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_accumulation() {
        let mut weights = EmotionWeights::new();
        weights.add_weight(Emotion::Fear, 0.3);
        weights.add_weight(Emotion::Fear, 0.4);

        assert!((weights.get_weight(Emotion::Fear) - 0.7).abs() < 0.001);
        assert_eq!(weights.get_weight(Emotion::Joy), 0.0);
    }

    #[test]
    fn test_dominant_sorted() {
        let mut weights = EmotionWeights::new();
        weights.add_weight(Emotion::Anger, 0.9);
        weights.add_weight(Emotion::Hope, 0.5);
        weights.add_weight(Emotion::Guilt, 0.1);

        let dominant = weights.dominant(0.4);
        assert_eq!(dominant.len(), 2);
        assert_eq!(dominant[0].0, Emotion::Anger);
        assert_eq!(dominant[1].0, Emotion::Hope);
        assert_eq!(weights.strongest().map(|(e, _)| e), Some(Emotion::Anger));
    }

    #[test]
    fn test_normalize() {
        let mut weights = EmotionWeights::new();
        weights.add_weight(Emotion::Joy, 2.0);
        weights.add_weight(Emotion::Trust, 1.0);
        weights.normalize();

        assert!((weights.get_weight(Emotion::Joy) - 1.0).abs() < 0.001);
        assert!((weights.get_weight(Emotion::Trust) - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_prune_and_positive_share() {
        let mut weights = EmotionWeights::new();
        weights.add_weight(Emotion::Fear, 0.5);
        weights.add_weight(Emotion::Hope, 0.25);
        weights.add_weight(Emotion::Grief, 0.05);
        assert!((weights.total() - 0.8).abs() < 0.001);

        weights.prune(0.1);
        assert_eq!(weights.len(), 2);
        let share = weights.positive_share().unwrap();
        assert!((share - 1.0 / 3.0).abs() < 0.001);

        assert!(EmotionWeights::new().strongest().is_none());
        assert!(EmotionWeights::new().positive_share().is_none());
    }
}
