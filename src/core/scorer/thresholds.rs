//! Similarity thresholds.

use serde::{Deserialize, Serialize};

/// Euclidean distance below which two HSV-mean vectors are similar
pub const DEFAULT_EUCLIDEAN_THRESHOLD: f64 = 0.5;

/// Share of dHash bits that may differ for two hashes to be similar
pub const DEFAULT_HAMMING_RATIO: f64 = 0.10;

/// Cut-offs for the `is_similar` flag
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Exclusive upper bound on Euclidean distance (HSV-mean)
    pub euclidean: f64,
    /// Inclusive upper bound on the differing-bit share (dHash)
    pub hamming_ratio: f64,
}

impl Thresholds {
    pub fn new(euclidean: f64, hamming_ratio: f64) -> Self {
        Self {
            euclidean,
            hamming_ratio,
        }
    }

    /// Few false positives (0.3 / 5%)
    pub fn strict() -> Self {
        Self::new(0.3, 0.05)
    }

    /// Default (0.5 / 10%)
    pub fn balanced() -> Self {
        Self::new(DEFAULT_EUCLIDEAN_THRESHOLD, DEFAULT_HAMMING_RATIO)
    }

    /// Catches more near-matches (1.0 / 15%)
    pub fn permissive() -> Self {
        Self::new(1.0, 0.15)
    }

    /// Replace the Euclidean cut-off
    pub fn with_euclidean(mut self, euclidean: f64) -> Self {
        self.euclidean = euclidean;
        self
    }

    /// Replace the Hamming ratio
    pub fn with_hamming_ratio(mut self, ratio: f64) -> Self {
        self.hamming_ratio = ratio;
        self
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::balanced()
    }
}
