//! # Ranking Module
//!
//! Orders a collection snapshot by similarity to a query fingerprint.
//!
//! ## How It Works
//! 1. Score the query against every item (linear scan, no index)
//! 2. Find the worst distance in this candidate set
//! 3. Give each item `match_percentage = (max - d) / max × 100`
//! 4. Stable sort by ascending distance
//! 5. In threshold-gated mode keep only `is_similar` items
//!
//! The match percentage is relative to the current query's worst match. It
//! ranks items within one result list and means nothing across queries.

use crate::core::fingerprint::Fingerprint;
use crate::core::scorer::{Comparison, Scorer, Thresholds};
use crate::error::ScoreError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Anything that carries a stored fingerprint
pub trait Fingerprinted {
    fn fingerprint(&self) -> &Fingerprint;
}

impl Fingerprinted for Fingerprint {
    fn fingerprint(&self) -> &Fingerprint {
        self
    }
}

/// Distance used to order HSV-mean results (dHash always uses Hamming)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankMetric {
    #[default]
    Manhattan,
    Euclidean,
}

/// Whether to return the whole collection or only similar items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Every item, best first (photo search)
    #[default]
    RankAll,
    /// Only items flagged `is_similar` (programmatic lookup)
    ThresholdGated,
}

/// Classification of a ranked item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    /// Distance 0
    Exact,
    /// Within the similarity threshold
    Similar,
    /// Outside the threshold
    Different,
}

impl MatchType {
    fn classify(distance: f64, similarity: &Comparison) -> Self {
        if distance == 0.0 {
            MatchType::Exact
        } else if similarity.is_similar() {
            MatchType::Similar
        } else {
            MatchType::Different
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, MatchType::Exact | MatchType::Similar)
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchType::Exact => write!(f, "Exact Match"),
            MatchType::Similar => write!(f, "Similar"),
            MatchType::Different => write!(f, "Different"),
        }
    }
}

/// Ranking options
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RankConfig {
    pub metric: RankMetric,
    pub thresholds: Thresholds,
    pub mode: SearchMode,
}

impl RankConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metric(mut self, metric: RankMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }
}

/// An item with its score for one query
#[derive(Debug, Clone, Serialize)]
pub struct RankedItem<'a, T> {
    pub item: &'a T,
    pub similarity: Comparison,
    /// The distance the list is ordered by
    pub distance: f64,
    /// 0-100, relative to the worst match of this query
    pub match_percentage: f64,
    pub match_type: MatchType,
}

/// Stateless ranking engine
#[derive(Debug, Clone, Default)]
pub struct Ranker {
    config: RankConfig,
}

impl Ranker {
    pub fn new(config: RankConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankConfig {
        &self.config
    }

    /// Rank a collection snapshot against `query`
    ///
    /// Fails if any item's fingerprint has a different kind or length than the
    /// query; a catalogue mid-migration must be re-fingerprinted first.
    pub fn rank<'a, T: Fingerprinted>(
        &self,
        query: &Fingerprint,
        items: &'a [T],
    ) -> Result<Vec<RankedItem<'a, T>>, ScoreError> {
        let scorer = Scorer::new(self.config.thresholds);

        let scored = items
            .iter()
            .map(|item| {
                let similarity = scorer.compare(query, item.fingerprint())?;
                let distance = self.distance(&similarity);
                Ok((item, similarity, distance))
            })
            .collect::<Result<Vec<_>, ScoreError>>()?;

        // A non-finite distance from a damaged row must not rescale the rest
        let max_distance = scored
            .iter()
            .map(|(_, _, distance)| *distance)
            .filter(|distance| distance.is_finite())
            .fold(0.0, f64::max);

        let mut ranked: Vec<RankedItem<'a, T>> = scored
            .into_iter()
            .map(|(item, similarity, distance)| RankedItem {
                item,
                similarity,
                distance,
                match_percentage: match_percentage(distance, max_distance),
                match_type: MatchType::classify(distance, &similarity),
            })
            .collect();

        // sort_by is stable: equal distances keep collection order.
        // NaN sorts last whatever its sign bit.
        ranked.sort_by(|a, b| {
            a.distance
                .is_nan()
                .cmp(&b.distance.is_nan())
                .then(a.distance.total_cmp(&b.distance))
        });

        if self.config.mode == SearchMode::ThresholdGated {
            ranked.retain(|r| r.similarity.is_similar());
        }

        debug!(
            candidates = items.len(),
            returned = ranked.len(),
            max_distance,
            mode = ?self.config.mode,
            "ranked collection"
        );

        Ok(ranked)
    }

    fn distance(&self, similarity: &Comparison) -> f64 {
        match similarity {
            Comparison::Vector(result) => match self.config.metric {
                RankMetric::Manhattan => result.manhattan,
                RankMetric::Euclidean => result.euclidean,
            },
            Comparison::Hamming(result) => result.distance as f64,
        }
    }
}

fn match_percentage(distance: f64, max_distance: f64) -> f64 {
    if max_distance > 0.0 && distance.is_finite() {
        ((max_distance - distance) / max_distance * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Rank the whole collection, best match first
pub fn rank_all<'a, T: Fingerprinted>(
    query: &Fingerprint,
    items: &'a [T],
    thresholds: Thresholds,
) -> Result<Vec<RankedItem<'a, T>>, ScoreError> {
    Ranker::new(RankConfig::new().thresholds(thresholds)).rank(query, items)
}

/// Only the items within the similarity threshold, best match first
pub fn find_similar<'a, T: Fingerprinted>(
    query: &Fingerprint,
    items: &'a [T],
    thresholds: Thresholds,
) -> Result<Vec<RankedItem<'a, T>>, ScoreError> {
    Ranker::new(
        RankConfig::new()
            .thresholds(thresholds)
            .mode(SearchMode::ThresholdGated),
    )
    .rank(query, items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fingerprint::DHashBits;

    struct Item {
        name: &'static str,
        fingerprint: Fingerprint,
    }

    impl Fingerprinted for Item {
        fn fingerprint(&self) -> &Fingerprint {
            &self.fingerprint
        }
    }

    fn vector_item(name: &'static str, values: &[f64]) -> Item {
        Item {
            name,
            fingerprint: Fingerprint::HsvMean(values.to_vec()),
        }
    }

    fn hash_item(name: &'static str, value: u64) -> Item {
        Item {
            name,
            fingerprint: Fingerprint::DHash(DHashBits::from_u64(value)),
        }
    }

    fn names<T>(ranked: &[RankedItem<'_, T>]) -> Vec<&'static str>
    where
        T: NamedItem,
    {
        ranked.iter().map(|r| r.item.name()).collect()
    }

    trait NamedItem {
        fn name(&self) -> &'static str;
    }

    impl NamedItem for Item {
        fn name(&self) -> &'static str {
            self.name
        }
    }

    #[test]
    fn gated_search_uses_euclidean_threshold() {
        let items = vec![vector_item("origin", &[0.0, 0.0]), vector_item("far", &[3.0, 4.0])];
        let query = Fingerprint::HsvMean(vec![0.0, 0.0]);

        let wide = find_similar(&query, &items, Thresholds::default().with_euclidean(6.0)).unwrap();
        assert_eq!(names(&wide), vec!["origin", "far"]);

        let narrow = find_similar(&query, &items, Thresholds::default().with_euclidean(1.0)).unwrap();
        assert_eq!(names(&narrow), vec!["origin"]);
    }

    #[test]
    fn rank_all_orders_by_distance() {
        let items = vec![
            vector_item("far", &[3.0, 4.0]),
            vector_item("origin", &[0.0, 0.0]),
            vector_item("near", &[1.0, 0.0]),
        ];
        let query = Fingerprint::HsvMean(vec![0.0, 0.0]);

        let ranked = rank_all(&query, &items, Thresholds::default()).unwrap();

        assert_eq!(names(&ranked), vec!["origin", "near", "far"]);
        assert_eq!(ranked[0].match_type, MatchType::Exact);
        assert_eq!(ranked[2].match_type, MatchType::Different);
    }

    #[test]
    fn match_percentage_is_relative_to_worst() {
        let items = vec![
            vector_item("origin", &[0.0, 0.0]),
            vector_item("far", &[3.0, 4.0]),
        ];
        let query = Fingerprint::HsvMean(vec![0.0, 0.0]);

        let ranked = rank_all(&query, &items, Thresholds::default()).unwrap();

        // Manhattan: 0 and 7
        assert_eq!(ranked[0].distance, 0.0);
        assert_eq!(ranked[0].match_percentage, 100.0);
        assert_eq!(ranked[1].distance, 7.0);
        assert_eq!(ranked[1].match_percentage, 0.0);
    }

    #[test]
    fn euclidean_metric_changes_distances() {
        let items = vec![vector_item("far", &[3.0, 4.0])];
        let query = Fingerprint::HsvMean(vec![0.0, 0.0]);
        let ranker = Ranker::new(RankConfig::new().metric(RankMetric::Euclidean));

        let ranked = ranker.rank(&query, &items).unwrap();

        assert_eq!(ranked[0].distance, 5.0);
    }

    #[test]
    fn identical_collection_scores_zero_percent() {
        let items = vec![vector_item("a", &[1.0]), vector_item("b", &[1.0])];
        let query = Fingerprint::HsvMean(vec![1.0]);

        let ranked = rank_all(&query, &items, Thresholds::default()).unwrap();

        assert!(ranked.iter().all(|r| r.match_percentage == 0.0));
    }

    #[test]
    fn ties_keep_collection_order() {
        let items = vec![
            hash_item("first", 0b1),
            hash_item("second", 0b10),
            hash_item("third", 0b100),
            hash_item("exact", 0),
        ];
        let query = Fingerprint::DHash(DHashBits::from_u64(0));

        let ranked = rank_all(&query, &items, Thresholds::default()).unwrap();

        assert_eq!(names(&ranked), vec!["exact", "first", "second", "third"]);
    }

    #[test]
    fn dhash_ranks_by_hamming_distance() {
        let items = vec![
            hash_item("opposite", u64::MAX),
            hash_item("close", 0b111),
            hash_item("same", 0),
        ];
        let query = Fingerprint::DHash(DHashBits::from_u64(0));

        let ranked = rank_all(&query, &items, Thresholds::default()).unwrap();

        assert_eq!(names(&ranked), vec!["same", "close", "opposite"]);
        assert_eq!(ranked[1].distance, 3.0);
        assert_eq!(ranked[1].match_type, MatchType::Similar);
        assert_eq!(ranked[2].match_percentage, 0.0);

        let similar = find_similar(&query, &items, Thresholds::default()).unwrap();
        assert_eq!(names(&similar), vec!["same", "close"]);
    }

    #[test]
    fn percentages_stay_in_range() {
        let items: Vec<Item> = (0..20u64).map(|i| hash_item("item", (1u64 << i) - 1)).collect();
        let query = Fingerprint::DHash(DHashBits::from_u64(0));

        let ranked = rank_all(&query, &items, Thresholds::default()).unwrap();

        assert!(ranked
            .iter()
            .all(|r| (0.0..=100.0).contains(&r.match_percentage)));
    }

    #[test]
    fn empty_collection_ranks_to_nothing() {
        let items: Vec<Item> = Vec::new();
        let query = Fingerprint::DHash(DHashBits::from_u64(0));

        assert!(rank_all(&query, &items, Thresholds::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn non_finite_distances_do_not_poison_percentages() {
        let items = vec![
            vector_item("broken", &[f64::INFINITY, 0.0]),
            vector_item("exact", &[0.0, 0.0]),
            vector_item("unreadable", &[f64::NAN, 0.0]),
            vector_item("near", &[1.0, 0.0]),
        ];
        let query = Fingerprint::HsvMean(vec![0.0, 0.0]);

        let ranked = rank_all(&query, &items, Thresholds::default()).unwrap();

        assert_eq!(names(&ranked), vec!["exact", "near", "broken", "unreadable"]);
        let percentages: Vec<f64> = ranked.iter().map(|r| r.match_percentage).collect();
        assert_eq!(percentages, vec![100.0, 0.0, 0.0, 0.0]);
        assert!(ranked
            .iter()
            .all(|r| (0.0..=100.0).contains(&r.match_percentage)));
    }

    #[test]
    fn mixed_kinds_fail_the_query() {
        let items = vec![hash_item("hash", 0), vector_item("vector", &[0.0])];
        let query = Fingerprint::DHash(DHashBits::from_u64(0));

        let result = rank_all(&query, &items, Thresholds::default());

        assert!(matches!(result, Err(ScoreError::KindMismatch { .. })));
    }

    #[test]
    fn plain_fingerprints_can_be_ranked() {
        let items = vec![
            Fingerprint::DHash(DHashBits::from_u64(0xFF)),
            Fingerprint::DHash(DHashBits::from_u64(0x0F)),
        ];
        let query = Fingerprint::DHash(DHashBits::from_u64(0x0F));

        let ranked = rank_all(&query, &items, Thresholds::default()).unwrap();

        assert_eq!(ranked[0].item, &items[1]);
    }

    #[test]
    fn ranked_items_serialize() {
        let items = vec![Fingerprint::HsvMean(vec![0.0, 1.0])];
        let query = Fingerprint::HsvMean(vec![0.0, 1.0]);

        let ranked = rank_all(&query, &items, Thresholds::default()).unwrap();
        let json = serde_json::to_string(&ranked).unwrap();

        assert!(json.contains("\"metric\":\"vector\""));
        assert!(json.contains("\"match_type\":\"Exact\""));
    }
}
