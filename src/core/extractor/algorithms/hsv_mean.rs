//! HSV-mean fingerprint (legacy descriptor).
//!
//! 1. Resample to size x size and blur (sigma 1px) to drop compression noise
//! 2. Keep hue (scaled to 0..1) and saturation per pixel; value is discarded
//! 3. Subtract the mean of all values so a global tint does not dominate
//!
//! Compared with Euclidean, cosine and Manhattan metrics rather than Hamming.

use super::super::color::rgb_to_hsv;
use super::super::decode::ensure_ready;
use super::super::surface::SampleSurface;
use super::super::traits::FingerprintExtractor;
use super::super::{validate_size, Extraction, Preview};
use crate::core::fingerprint::{Fingerprint, FingerprintKind};
use crate::error::ExtractError;
use image::{imageops, DynamicImage};
use tracing::debug;

/// Blur applied to the sampled grid, in pixels
const BLUR_SIGMA: f32 = 1.0;

/// HSV-mean extractor
#[derive(Debug, Clone)]
pub struct HsvMeanExtractor {
    /// Side of the sampled grid; the fingerprint has 2 x size² values
    size: u32,
}

impl HsvMeanExtractor {
    /// Create a new HSV-mean extractor, rejecting sizes outside 8..=128
    pub fn new(size: u32) -> Result<Self, ExtractError> {
        validate_size(size)?;
        Ok(Self { size })
    }
}

impl FingerprintExtractor for HsvMeanExtractor {
    fn extract_with(
        &self,
        image: &DynamicImage,
        surface: &mut dyn SampleSurface,
    ) -> Result<Extraction, ExtractError> {
        ensure_ready(image)?;

        let sampled = surface.resample(image, self.size, self.size)?;
        if sampled.dimensions() != (self.size, self.size) {
            return Err(ExtractError::SurfaceUnavailable(format!(
                "surface returned a {}x{} grid, expected {}x{}",
                sampled.width(),
                sampled.height(),
                self.size,
                self.size
            )));
        }

        let grid = imageops::blur(&sampled, BLUR_SIGMA);

        let mut values = Vec::with_capacity(FingerprintKind::HsvMean.expected_len(self.size));
        for pixel in grid.pixels() {
            let [r, g, b] = pixel.0;
            let (hue, saturation) = rgb_to_hsv(r, g, b);
            values.push(hue / 360.0);
            values.push(saturation);
        }

        let mean = values.iter().sum::<f64>() / values.len() as f64;
        for value in &mut values {
            *value -= mean;
        }

        debug!(size = self.size, mean, "computed HSV-mean fingerprint");

        Ok(Extraction {
            fingerprint: Fingerprint::HsvMean(values),
            preview: Preview::new(grid),
        })
    }

    fn kind(&self) -> FingerprintKind {
        FingerprintKind::HsvMean
    }

    fn size(&self) -> u32 {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::extractor::SampleSurface;
    use image::{ImageBuffer, Rgb, RgbImage};

    fn create_solid_image(r: u8, g: u8, b: u8) -> DynamicImage {
        let img = ImageBuffer::from_fn(64, 64, |_, _| Rgb([r, g, b]));
        DynamicImage::ImageRgb8(img)
    }

    fn values(extraction: Extraction) -> Vec<f64> {
        match extraction.fingerprint {
            Fingerprint::HsvMean(values) => values,
            other => panic!("expected HSV-mean, got {:?}", other.kind()),
        }
    }

    #[test]
    fn length_is_two_values_per_pixel() {
        for size in [8, 32, 50] {
            let extractor = HsvMeanExtractor::new(size).unwrap();
            let values = values(extractor.extract(&create_solid_image(10, 200, 90)).unwrap());
            assert_eq!(values.len(), FingerprintKind::HsvMean.expected_len(size));
        }
    }

    #[test]
    fn values_are_mean_centred() {
        let extractor = HsvMeanExtractor::new(16).unwrap();
        let image = DynamicImage::ImageRgb8(ImageBuffer::from_fn(80, 80, |x, y| {
            Rgb([(x * 3) as u8, (y * 3) as u8, 100])
        }));

        let values = values(extractor.extract(&image).unwrap());
        let mean = values.iter().sum::<f64>() / values.len() as f64;

        assert!(mean.abs() < 1e-9);
    }

    #[test]
    fn solid_red_alternates_hue_and_saturation() {
        let extractor = HsvMeanExtractor::new(8).unwrap();
        let values = values(extractor.extract(&create_solid_image(255, 0, 0)).unwrap());

        // hue 0 and saturation 1 average to 0.5
        for pair in values.chunks(2) {
            assert!((pair[0] + 0.5).abs() < 0.02, "hue {}", pair[0]);
            assert!((pair[1] - 0.5).abs() < 0.02, "saturation {}", pair[1]);
        }
    }

    #[test]
    fn brightness_changes_do_not_matter_for_grey() {
        let extractor = HsvMeanExtractor::new(8).unwrap();
        let dark = values(extractor.extract(&create_solid_image(30, 30, 30)).unwrap());
        let light = values(extractor.extract(&create_solid_image(220, 220, 220)).unwrap());

        assert_eq!(dark, light);
    }

    #[test]
    fn extraction_is_deterministic() {
        let extractor = HsvMeanExtractor::new(32).unwrap();
        let image = DynamicImage::ImageRgb8(ImageBuffer::from_fn(120, 90, |x, y| {
            Rgb([(x * 2) as u8, (y * 2) as u8, ((x + y) % 255) as u8])
        }));

        let first = extractor.extract(&image).unwrap();
        let second = extractor.extract(&image).unwrap();

        assert_eq!(first.fingerprint, second.fingerprint);
    }

    #[test]
    fn preview_is_the_blurred_grid() {
        let extractor = HsvMeanExtractor::new(32).unwrap();
        let extraction = extractor.extract(&create_solid_image(1, 2, 3)).unwrap();

        assert_eq!(extraction.preview.dimensions(), (32, 32));
    }

    #[test]
    fn out_of_range_size_fails_fast() {
        assert!(matches!(
            HsvMeanExtractor::new(0),
            Err(ExtractError::InvalidSize { size: 0, min: 8, max: 128 })
        ));
        assert!(HsvMeanExtractor::new(128).is_ok());
    }

    /// Surface that ignores its input and returns a blank grid
    struct BlankSurface;

    impl SampleSurface for BlankSurface {
        fn resample(
            &mut self,
            _image: &DynamicImage,
            width: u32,
            height: u32,
        ) -> Result<RgbImage, ExtractError> {
            Ok(RgbImage::new(width, height))
        }
    }

    #[test]
    fn unloaded_image_is_rejected_by_any_surface() {
        let extractor = HsvMeanExtractor::new(8).unwrap();
        let result = extractor.extract_with(&DynamicImage::new_rgb8(0, 0), &mut BlankSurface);

        assert!(matches!(result, Err(ExtractError::ImageNotReady { .. })));
        assert!(extractor
            .extract_with(&create_solid_image(9, 9, 9), &mut BlankSurface)
            .is_ok());
    }

    #[test]
    fn kind_returns_hsv_mean() {
        let extractor = HsvMeanExtractor::new(32).unwrap();
        assert_eq!(extractor.kind(), FingerprintKind::HsvMean);
    }
}
