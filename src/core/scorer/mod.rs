//! # Scorer Module
//!
//! Computes distances between two fingerprints.
//!
//! ## Metrics
//! | Fingerprint | Metrics | Similar when |
//! |-------------|---------|--------------|
//! | HSV-mean    | Euclidean, cosine, Manhattan | Euclidean < threshold (0.5) |
//! | dHash       | Hamming | differing bits ≤ 10% of the hash |
//!
//! Fingerprints of different kinds or lengths are never compared: the call
//! fails with [`ScoreError`] instead of truncating or padding.

mod thresholds;

pub use thresholds::{Thresholds, DEFAULT_EUCLIDEAN_THRESHOLD, DEFAULT_HAMMING_RATIO};

use crate::core::fingerprint::{DHashBits, Fingerprint};
use crate::error::ScoreError;
use serde::{Deserialize, Serialize};

/// Metrics for a pair of HSV-mean vectors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub euclidean: f64,
    /// NaN when either vector is all zeros
    pub cosine: f64,
    pub manhattan: f64,
    pub is_similar: bool,
}

/// Metrics for a pair of dHash bit strings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HammingResult {
    /// Number of differing bits
    pub distance: u32,
    /// Bits in each hash
    pub bit_count: u32,
    /// Share of matching bits (0-100)
    pub similarity_percent: f64,
    pub is_similar: bool,
}

/// Result of comparing two tagged fingerprints
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "metric", rename_all = "snake_case")]
pub enum Comparison {
    Vector(SimilarityResult),
    Hamming(HammingResult),
}

impl Comparison {
    pub fn is_similar(&self) -> bool {
        match self {
            Comparison::Vector(result) => result.is_similar,
            Comparison::Hamming(result) => result.is_similar,
        }
    }
}

fn ensure_same_length(a: &[f64], b: &[f64]) -> Result<(), ScoreError> {
    if a.len() != b.len() {
        return Err(ScoreError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(())
}

/// sqrt(Σ (aᵢ − bᵢ)²)
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> Result<f64, ScoreError> {
    ensure_same_length(a, b)?;
    Ok(a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt())
}

/// (Σ aᵢ·bᵢ) / (‖a‖·‖b‖)
///
/// Returns NaN when either vector is all zeros; the angle is undefined there
/// and callers must treat NaN as "not similar".
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Result<f64, ScoreError> {
    ensure_same_length(a, b)?;
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let magnitude_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let magnitude_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    Ok(dot / (magnitude_a * magnitude_b))
}

/// Σ |aᵢ − bᵢ|
pub fn manhattan_distance(a: &[f64], b: &[f64]) -> Result<f64, ScoreError> {
    ensure_same_length(a, b)?;
    Ok(a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum())
}

/// Compute all vector metrics; similar when Euclidean distance < `threshold`
pub fn calculate_similarity(
    a: &[f64],
    b: &[f64],
    threshold: f64,
) -> Result<SimilarityResult, ScoreError> {
    let euclidean = euclidean_distance(a, b)?;
    let cosine = cosine_similarity(a, b)?;
    let manhattan = manhattan_distance(a, b)?;

    Ok(SimilarityResult {
        euclidean,
        cosine,
        manhattan,
        // false for NaN as well
        is_similar: euclidean < threshold,
    })
}

/// Number of differing bits
pub fn hamming_distance(a: &DHashBits, b: &DHashBits) -> Result<u32, ScoreError> {
    if a.bit_count() != b.bit_count() {
        return Err(ScoreError::LengthMismatch {
            left: a.bit_count() as usize,
            right: b.bit_count() as usize,
        });
    }

    Ok(a.as_bytes()
        .iter()
        .zip(b.as_bytes())
        .map(|(x, y)| (x ^ y).count_ones())
        .sum())
}

/// Hamming metrics; similar when at most `floor(bits × ratio)` bits differ
pub fn calculate_hamming(
    a: &DHashBits,
    b: &DHashBits,
    ratio: f64,
) -> Result<HammingResult, ScoreError> {
    let distance = hamming_distance(a, b)?;
    let bit_count = a.bit_count();

    let similarity_percent = if bit_count == 0 {
        100.0
    } else {
        (1.0 - distance as f64 / bit_count as f64) * 100.0
    };

    Ok(HammingResult {
        distance,
        bit_count,
        similarity_percent,
        is_similar: distance <= max_differing_bits(bit_count, ratio),
    })
}

/// Largest Hamming distance still counted as similar
pub fn max_differing_bits(bit_count: u32, ratio: f64) -> u32 {
    (bit_count as f64 * ratio).floor().max(0.0) as u32
}

/// Compares tagged fingerprints with the metric their kind calls for
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    thresholds: Thresholds,
}

impl Scorer {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Compare two fingerprints of the same kind and length
    pub fn compare(&self, a: &Fingerprint, b: &Fingerprint) -> Result<Comparison, ScoreError> {
        match (a, b) {
            (Fingerprint::HsvMean(x), Fingerprint::HsvMean(y)) => {
                calculate_similarity(x, y, self.thresholds.euclidean).map(Comparison::Vector)
            }
            (Fingerprint::DHash(x), Fingerprint::DHash(y)) => {
                calculate_hamming(x, y, self.thresholds.hamming_ratio).map(Comparison::Hamming)
            }
            _ => Err(ScoreError::KindMismatch {
                left: a.kind(),
                right: b.kind(),
            }),
        }
    }
}
