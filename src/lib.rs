//! # Photo Catalog
//!
//! A personal catalogue of physical things, searchable by name, tag, or by
//! pointing a camera at the thing itself.
//!
//! ## How Photo Search Works
//! - Every item stores a compact perceptual **fingerprint** of its photo
//! - A query photo is fingerprinted the same way
//! - The whole catalogue is ranked by fingerprint distance, best match first
//!
//! ## Architecture
//! - `core` - Fingerprinting, scoring, ranking and storage (UI-agnostic)
//! - `config` - JSON settings shared by front ends
//! - `events` - Progress reporting for long-running imports
//! - `error` - User-friendly error types

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{CatalogError, Result};

/// Initialize tracing for the library
///
/// Called by the application entry point; filtering comes from `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}
