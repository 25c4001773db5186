//! Trait definitions for fingerprint extraction.

use super::decode::FastDecoder;
use super::surface::{FastResampler, SampleSurface};
use super::Extraction;
use crate::core::fingerprint::FingerprintKind;
use crate::error::ExtractError;
use image::DynamicImage;
use std::path::Path;

/// Trait for fingerprint algorithm implementations
pub trait FingerprintExtractor: Send + Sync {
    /// Compute a fingerprint using the given sampling surface
    fn extract_with(
        &self,
        image: &DynamicImage,
        surface: &mut dyn SampleSurface,
    ) -> Result<Extraction, ExtractError>;

    /// Compute a fingerprint from an already-decoded image
    fn extract(&self, image: &DynamicImage) -> Result<Extraction, ExtractError> {
        let mut surface = FastResampler::new();
        self.extract_with(image, &mut surface)
    }

    /// Decode a file and compute its fingerprint.
    ///
    /// JPEGs go through zune-jpeg, other formats through the image crate.
    fn extract_file(&self, path: &Path) -> Result<Extraction, ExtractError> {
        let image = FastDecoder::decode(path)?;
        self.extract(&image)
    }

    /// The kind of fingerprint produced
    fn kind(&self) -> FingerprintKind;

    /// The grid size in use
    fn size(&self) -> u32;
}
