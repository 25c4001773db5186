//! # Core Module
//!
//! The UI-agnostic catalogue engine.
//!
//! ## Modules
//! - `fingerprint` - Fingerprint types and their text codec
//! - `extractor` - Computes fingerprints from images
//! - `scorer` - Distances between two fingerprints
//! - `ranking` - Orders a catalogue snapshot against a query
//! - `capture` - Normalises camera frames into square thumbnails
//! - `catalog` - Stores items with their fingerprints
//! - `scanner` - Discovers photos in directories
//! - `indexer` - Imports whole folders into the catalogue

pub mod capture;
pub mod catalog;
pub mod extractor;
pub mod fingerprint;
pub mod indexer;
pub mod ranking;
pub mod scanner;
pub mod scorer;

// Re-export commonly used types
pub use catalog::{CatalogItem, CatalogStore, NewItem};
pub use extractor::{FingerprintConfig, FingerprintExtractor};
pub use fingerprint::{DHashBits, Fingerprint, FingerprintKind};
pub use ranking::{MatchType, RankedItem, Ranker};
pub use scorer::{Comparison, Scorer, Thresholds};
