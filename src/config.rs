//! Tunables for fingerprinting and grouping.

use crate::error::{DedupError, Result};
use serde::{Deserialize, Serialize};

/// Smallest grid the perceptual hash can work on (its low-frequency band is 8x8).
pub const MIN_GRID_SIZE: u32 = 8;

/// Grid every image is reduced to before hashing.
pub const DEFAULT_GRID_SIZE: u32 = 8;

/// Default similarity threshold for the multi-hash scorer.
pub const DEFAULT_THRESHOLD: f64 = 0.75;

/// Per-hash weights applied to the normalized Hamming distances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityWeights {
    pub average: f64,
    pub difference: f64,
    pub perceptual: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            average: 0.30,
            difference: 0.30,
            perceptual: 0.40,
        }
    }
}

/// How records are grouped once pairwise similarities are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterStrategy {
    /// Every member is compared against the first unclaimed record only.
    #[default]
    Star,
    /// Connected components of the "similarity >= threshold" graph.
    Transitive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub grid_size: u32,
    pub threshold: f64,
    pub weights: SimilarityWeights,
    pub strategy: ClusterStrategy,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            threshold: DEFAULT_THRESHOLD,
            weights: SimilarityWeights::default(),
            strategy: ClusterStrategy::default(),
        }
    }
}

impl DedupConfig {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_strategy(mut self, strategy: ClusterStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_grid_size(mut self, grid_size: u32) -> Self {
        self.grid_size = grid_size;
        self
    }

    pub fn with_weights(mut self, weights: SimilarityWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Check that the values describe a usable configuration.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(DedupError::InvalidConfig {
                field: "threshold",
                reason: format!("{} is outside [0, 1]", self.threshold),
            });
        }

        if self.grid_size < MIN_GRID_SIZE {
            return Err(DedupError::InvalidConfig {
                field: "grid_size",
                reason: format!("{} is below the minimum of {}", self.grid_size, MIN_GRID_SIZE),
            });
        }

        let weights = [
            ("weights.average", self.weights.average),
            ("weights.difference", self.weights.difference),
            ("weights.perceptual", self.weights.perceptual),
        ];
        for (field, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(DedupError::InvalidConfig {
                    field,
                    reason: format!("{value} is not a finite non-negative weight"),
                });
            }
        }

        Ok(())
    }
}
