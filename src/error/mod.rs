//! # Error Module
//!
//! User-friendly error types for the photo catalogue.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Name the failure** - each precondition has its own variant
//! - **User-friendly messages** - non-technical users should understand
//! - **Recovery hints** - suggest how to fix when possible

use crate::core::fingerprint::FingerprintKind;
use std::path::PathBuf;
use thiserror::Error;

/// Smallest accepted fingerprint grid size
pub const MIN_FINGERPRINT_SIZE: u32 = 8;
/// Largest accepted fingerprint grid size
pub const MAX_FINGERPRINT_SIZE: u32 = 128;

/// Top-level application error
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Fingerprint extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Fingerprint encoding error: {0}")]
    Codec(#[from] CodecError),

    #[error("Similarity scoring error: {0}")]
    Score(#[from] ScoreError),

    #[error("Catalogue storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CatalogError {
    /// Stable machine-readable code for this failure kind
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::Extract(_) => "IMAGE_PROCESSING_ERROR",
            CatalogError::Codec(_) => "FINGERPRINT_FORMAT_ERROR",
            CatalogError::Score(_) => "SIMILARITY_ERROR",
            CatalogError::Store(_) => "DATABASE_ERROR",
            CatalogError::Scan(_) => "SCAN_ERROR",
            CatalogError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Short message suitable for showing to the person using the catalogue
    pub fn user_message(&self) -> &'static str {
        match self {
            CatalogError::Extract(ExtractError::ImageNotReady { .. }) => {
                "The photo is not ready yet. Try again once it has loaded."
            }
            CatalogError::Extract(ExtractError::SurfaceUnavailable(_)) => {
                "Photos cannot be processed on this system."
            }
            CatalogError::Extract(_) => "Failed to process image",
            CatalogError::Codec(_) => "A stored fingerprint is damaged. Re-capture the photo.",
            CatalogError::Score(_) => "These photos cannot be compared with each other.",
            CatalogError::Store(StoreError::ItemNotFound { .. }) => "That item no longer exists.",
            CatalogError::Store(_) => "Database operation failed",
            CatalogError::Scan(_) => "Could not read the photo folder.",
            CatalogError::Config(_) => "The configuration file is invalid.",
        }
    }
}

/// Errors that occur while turning an image into a fingerprint
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Invalid fingerprint size {size}. Must be between {min} and {max}.")]
    InvalidSize { size: u32, min: u32, max: u32 },

    #[error("Image not loaded or invalid: {reason}")]
    ImageNotReady { reason: String },

    #[error("Cannot acquire drawing surface: {0}")]
    SurfaceUnavailable(String),

    #[error("Failed to decode image {path}: {reason}")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Failed to open image file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode preview image: {0}")]
    PreviewEncoding(String),
}

/// Errors that occur while decoding a stored fingerprint
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("Fingerprint text is empty")]
    Empty,

    #[error("Fingerprint of {length} characters does not describe a square hash grid")]
    InvalidLength { length: usize },

    #[error("Invalid hex digit {digit:?} at position {position}")]
    InvalidHexDigit { position: usize, digit: char },

    #[error("Invalid bit {bit:?} at position {position}")]
    InvalidBit { position: usize, bit: char },

    #[error("Fingerprint has non-zero padding bits")]
    NonCanonicalPadding,

    #[error("Invalid number {value:?} at position {position}")]
    InvalidNumber { position: usize, value: String },

    #[error("Unknown fingerprint kind: {0}")]
    UnknownKind(String),
}

/// Errors that occur when two fingerprints cannot be compared
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoreError {
    #[error("Fingerprint lengths differ: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("Cannot compare a {left} fingerprint with a {right} fingerprint")]
    KindMismatch {
        left: FingerprintKind,
        right: FingerprintKind,
    },
}

/// Errors that occur in a catalogue store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open catalogue database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Catalogue corruption detected at {path}. Restore a backup or delete this file.")]
    Corrupted { path: PathBuf },

    #[error("Item not found: {id}")]
    ItemNotFound { id: String },

    #[error("Invalid item: {0}")]
    InvalidItem(String),

    #[error("Stored fingerprint for item {id} is unreadable: {source}")]
    BadFingerprint {
        id: String,
        #[source]
        source: CodecError,
    },
}

/// Errors that occur during photo scanning
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, CatalogError>;
