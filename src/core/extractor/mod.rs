//! # Extractor Module
//!
//! Reduces a decoded image to a fixed-size perceptual fingerprint.
//!
//! ## Supported Algorithms
//! - **dHash (Difference Hash)** - brightness gradients, compared by Hamming distance
//! - **HSV-mean** - legacy hue/saturation vector, compared by Euclidean distance
//!
//! ## How It Works
//! 1. Resample the image onto a small grid through a [`SampleSurface`]
//! 2. Reduce the grid to bits (dHash) or a mean-centred vector (HSV-mean)
//! 3. Return the fingerprint with a [`Preview`] of the sampled grid
//!
//! ## Example
//! ```rust,ignore
//! use photo_catalog::core::extractor::FingerprintConfig;
//! use photo_catalog::core::fingerprint::FingerprintKind;
//!
//! let extractor = FingerprintConfig::new()
//!     .kind(FingerprintKind::DHash)
//!     .size(8)
//!     .build()?;
//!
//! let extraction = extractor.extract_file(&path)?;
//! println!("{}", extraction.fingerprint.encode());
//! ```

mod algorithms;
pub mod color;
pub mod decode;
pub mod surface;
mod traits;

pub use algorithms::{DifferenceExtractor, HsvMeanExtractor};
pub use color::rgb_to_hsv;
pub use decode::FastDecoder;
pub use surface::{FastResampler, SampleSurface};
pub use traits::FingerprintExtractor;

use crate::core::fingerprint::{Fingerprint, FingerprintKind};
use crate::error::{ExtractError, MAX_FINGERPRINT_SIZE, MIN_FINGERPRINT_SIZE};
use base64::{engine::general_purpose, Engine as _};
use image::RgbImage;
use std::io::Cursor;
use std::path::Path;

/// Check a grid size against the supported range
pub fn validate_size(size: u32) -> Result<(), ExtractError> {
    if !(MIN_FINGERPRINT_SIZE..=MAX_FINGERPRINT_SIZE).contains(&size) {
        return Err(ExtractError::InvalidSize {
            size,
            min: MIN_FINGERPRINT_SIZE,
            max: MAX_FINGERPRINT_SIZE,
        });
    }
    Ok(())
}

/// Output of one extraction
#[derive(Debug, Clone)]
pub struct Extraction {
    /// The fingerprint to store or compare
    pub fingerprint: Fingerprint,
    /// The grid the fingerprint was computed from, for display only
    pub preview: Preview,
}

/// Rendering of the sampled grid
///
/// Never used in comparisons; it lets the UI show what the extractor saw.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    grid: RgbImage,
}

impl Preview {
    pub fn new(grid: RgbImage) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &RgbImage {
        &self.grid
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.grid.dimensions()
    }

    /// Encode the grid as PNG
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, ExtractError> {
        let mut bytes = Vec::new();
        self.grid
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|e| ExtractError::PreviewEncoding(e.to_string()))?;
        Ok(bytes)
    }

    /// Encode the grid as a `data:image/png;base64,` URL
    pub fn to_data_url(&self) -> Result<String, ExtractError> {
        let bytes = self.to_png_bytes()?;
        Ok(format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(bytes)
        ))
    }

    /// Write the grid to a PNG file
    pub fn save(&self, path: &Path) -> Result<(), ExtractError> {
        self.grid
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| ExtractError::PreviewEncoding(format!("{}: {}", path.display(), e)))
    }
}

/// Configuration builder for extractors
#[derive(Debug, Clone)]
pub struct FingerprintConfig {
    /// Algorithm to use
    kind: FingerprintKind,
    /// Grid size; `None` picks the algorithm's default
    size: Option<u32>,
}

impl FingerprintConfig {
    /// Create a new configuration: dHash at its default size
    pub fn new() -> Self {
        Self {
            kind: FingerprintKind::DHash,
            size: None,
        }
    }

    /// Set the algorithm
    pub fn kind(mut self, kind: FingerprintKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the grid size (8 to 128)
    ///
    /// - dHash: 8 gives the standard 64-bit hash
    /// - HSV-mean: 32 gives the standard 2048-value vector
    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// The size that `build` will use
    pub fn effective_size(&self) -> u32 {
        self.size.unwrap_or_else(|| self.kind.default_size())
    }

    /// Build the extractor, failing fast on an out-of-range size
    pub fn build(self) -> Result<Box<dyn FingerprintExtractor>, ExtractError> {
        let size = self.effective_size();
        match self.kind {
            FingerprintKind::DHash => Ok(Box::new(DifferenceExtractor::new(size)?)),
            FingerprintKind::HsvMean => Ok(Box::new(HsvMeanExtractor::new(size)?)),
        }
    }
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self::new()
    }
}
