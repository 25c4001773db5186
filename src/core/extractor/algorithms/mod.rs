//! Fingerprint algorithm implementations.

mod difference;
mod hsv_mean;

pub use difference::DifferenceExtractor;
pub use hsv_mean::HsvMeanExtractor;
