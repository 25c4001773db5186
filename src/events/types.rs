//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted while building a catalogue from photo folders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Folder scanning events
    Scan(ScanEvent),
    /// Fingerprinting and storing events
    Index(IndexEvent),
}

/// Events during the scanning phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Scanning has started
    Started { paths: Vec<PathBuf> },
    /// Progress update during scanning
    Progress(ScanProgress),
    /// A photo was found
    PhotoFound { path: PathBuf },
    /// An error occurred but scanning continues
    Error { path: PathBuf, message: String },
    /// Scanning completed
    Completed { total_photos: usize },
}

/// Progress information during scanning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Number of directories scanned so far
    pub directories_scanned: usize,
    /// Number of photos found so far
    pub photos_found: usize,
    /// Current directory being scanned
    pub current_path: PathBuf,
}

/// Events while photos are fingerprinted and added to the catalogue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IndexEvent {
    /// Indexing has started
    Started { total_photos: usize },
    /// Progress update
    Progress(IndexProgress),
    /// A photo was fingerprinted and stored
    PhotoIndexed { path: PathBuf, item_id: String },
    /// A photo could not be fingerprinted; indexing continues
    Error { path: PathBuf, message: String },
    /// Indexing finished
    Completed { summary: IndexSummary },
}

/// Progress information during indexing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexProgress {
    /// Photos processed so far (including failures)
    pub completed: usize,
    /// Photos to process
    pub total: usize,
    /// Photo that just finished
    pub current_path: PathBuf,
}

/// Totals for one indexing run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSummary {
    /// Photos found by the scanner
    pub total_photos: usize,
    /// Photos added to the catalogue
    pub indexed: usize,
    /// Photos that failed to decode or fingerprint
    pub failed: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}
