//! Difference Hash (dHash) implementation.
//!
//! dHash works by:
//! 1. Resampling the image to (hash_size+1) x hash_size, ignoring aspect ratio
//! 2. Reading the red channel as a cheap brightness proxy
//! 3. Comparing each sample to the one on its right
//! 4. Setting the bit to 1 when the left sample is at least as bright
//!
//! This captures the relative gradient of brightness changes, which survives
//! resizing, recompression and mild lighting shifts.

use super::super::decode::ensure_ready;
use super::super::surface::SampleSurface;
use super::super::traits::FingerprintExtractor;
use super::super::{validate_size, Extraction, Preview};
use crate::core::fingerprint::{DHashBits, Fingerprint, FingerprintKind};
use crate::error::ExtractError;
use image::DynamicImage;
use tracing::debug;

/// Difference Hash (dHash) extractor
#[derive(Debug, Clone)]
pub struct DifferenceExtractor {
    /// Side of the comparison grid; the hash has hash_size² bits
    hash_size: u32,
}

impl DifferenceExtractor {
    /// Create a new dHash extractor, rejecting sizes outside 8..=128
    pub fn new(hash_size: u32) -> Result<Self, ExtractError> {
        validate_size(hash_size)?;
        Ok(Self { hash_size })
    }
}

impl FingerprintExtractor for DifferenceExtractor {
    fn extract_with(
        &self,
        image: &DynamicImage,
        surface: &mut dyn SampleSurface,
    ) -> Result<Extraction, ExtractError> {
        ensure_ready(image)?;

        // One extra column so every sample has a right-hand neighbour
        let grid = surface.resample(image, self.hash_size + 1, self.hash_size)?;

        let size = self.hash_size;
        if grid.dimensions() != (size + 1, size) {
            return Err(ExtractError::SurfaceUnavailable(format!(
                "surface returned a {}x{} grid, expected {}x{}",
                grid.width(),
                grid.height(),
                size + 1,
                size
            )));
        }

        let mut bits = Vec::with_capacity((size * size) as usize);

        for y in 0..size {
            for x in 0..size {
                let left = grid.get_pixel(x, y)[0];
                let right = grid.get_pixel(x + 1, y)[0];
                bits.push(left >= right);
            }
        }

        let hash = DHashBits::pack(bits);

        debug!(
            hash_size = size,
            ones = hash.count_ones(),
            "computed difference hash"
        );

        Ok(Extraction {
            fingerprint: Fingerprint::DHash(hash),
            preview: Preview::new(grid),
        })
    }

    fn kind(&self) -> FingerprintKind {
        FingerprintKind::DHash
    }

    fn size(&self) -> u32 {
        self.hash_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::extractor::SampleSurface;
    use crate::core::fingerprint::codec::encode_hex;
    use image::{ImageBuffer, Rgb, RgbImage};

    fn create_solid_image(r: u8, g: u8, b: u8) -> DynamicImage {
        let img = ImageBuffer::from_fn(100, 100, |_, _| Rgb([r, g, b]));
        DynamicImage::ImageRgb8(img)
    }

    fn create_left_to_right_gradient() -> DynamicImage {
        // left is dark, right is bright (left < right)
        let img = ImageBuffer::from_fn(100, 100, |x, _| {
            let brightness = (x * 255 / 99) as u8;
            Rgb([brightness, brightness, brightness])
        });
        DynamicImage::ImageRgb8(img)
    }

    fn create_right_to_left_gradient() -> DynamicImage {
        // right is dark, left is bright (left > right)
        let img = ImageBuffer::from_fn(100, 100, |x, _| {
            let brightness = ((99 - x) * 255 / 99) as u8;
            Rgb([brightness, brightness, brightness])
        });
        DynamicImage::ImageRgb8(img)
    }

    /// Surface that hands back a fixed grid regardless of input
    struct FixedSurface(RgbImage);

    impl SampleSurface for FixedSurface {
        fn resample(
            &mut self,
            _image: &DynamicImage,
            _width: u32,
            _height: u32,
        ) -> Result<RgbImage, ExtractError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenSurface;

    impl SampleSurface for BrokenSurface {
        fn resample(
            &mut self,
            _image: &DynamicImage,
            _width: u32,
            _height: u32,
        ) -> Result<RgbImage, ExtractError> {
            Err(ExtractError::SurfaceUnavailable("no context".to_string()))
        }
    }

    #[test]
    fn identical_images_produce_identical_hash() {
        let extractor = DifferenceExtractor::new(8).unwrap();
        let image = create_solid_image(128, 64, 32);

        let first = extractor.extract(&image).unwrap();
        let second = extractor.extract(&image).unwrap();

        assert_eq!(first.fingerprint, second.fingerprint);
    }

    #[test]
    fn bright_left_sets_every_bit() {
        let extractor = DifferenceExtractor::new(8).unwrap();
        let extraction = extractor.extract(&create_right_to_left_gradient()).unwrap();

        match extraction.fingerprint {
            Fingerprint::DHash(bits) => assert_eq!(encode_hex(&bits), "ffffffffffffffff"),
            other => panic!("expected dHash, got {:?}", other.kind()),
        }
    }

    #[test]
    fn bright_right_clears_every_bit() {
        let extractor = DifferenceExtractor::new(8).unwrap();
        let extraction = extractor.extract(&create_left_to_right_gradient()).unwrap();

        match extraction.fingerprint {
            Fingerprint::DHash(bits) => assert_eq!(encode_hex(&bits), "0000000000000000"),
            other => panic!("expected dHash, got {:?}", other.kind()),
        }
    }

    #[test]
    fn equal_neighbours_count_as_brighter() {
        let extractor = DifferenceExtractor::new(8).unwrap();
        let mut surface = FixedSurface(RgbImage::from_pixel(9, 8, Rgb([77, 0, 0])));

        let extraction = extractor
            .extract_with(&create_solid_image(0, 0, 0), &mut surface)
            .unwrap();

        match extraction.fingerprint {
            Fingerprint::DHash(bits) => assert_eq!(bits.count_ones(), 64),
            other => panic!("expected dHash, got {:?}", other.kind()),
        }
    }

    #[test]
    fn only_the_red_channel_is_read() {
        let extractor = DifferenceExtractor::new(8).unwrap();
        // Red rises left to right, green falls: red decides
        let grid = RgbImage::from_fn(9, 8, |x, _| Rgb([(x * 20) as u8, 255 - (x * 20) as u8, 0]));
        let mut surface = FixedSurface(grid);

        let extraction = extractor
            .extract_with(&create_solid_image(0, 0, 0), &mut surface)
            .unwrap();

        match extraction.fingerprint {
            Fingerprint::DHash(bits) => assert_eq!(bits.count_ones(), 0),
            other => panic!("expected dHash, got {:?}", other.kind()),
        }
    }

    #[test]
    fn first_bit_is_top_left_comparison() {
        let extractor = DifferenceExtractor::new(8).unwrap();
        let grid = RgbImage::from_fn(9, 8, |x, y| {
            if x == 0 && y == 0 {
                Rgb([200, 0, 0])
            } else {
                Rgb([(x * 10) as u8, 0, 0])
            }
        });
        let mut surface = FixedSurface(grid);

        let extraction = extractor
            .extract_with(&create_solid_image(0, 0, 0), &mut surface)
            .unwrap();

        match extraction.fingerprint {
            Fingerprint::DHash(bits) => assert_eq!(encode_hex(&bits), "8000000000000000"),
            other => panic!("expected dHash, got {:?}", other.kind()),
        }
    }

    #[test]
    fn hash_size_affects_output_length() {
        let image = create_solid_image(128, 128, 128);

        for size in [8, 16, 33, 128] {
            let extractor = DifferenceExtractor::new(size).unwrap();
            let extraction = extractor.extract(&image).unwrap();
            assert_eq!(
                extraction.fingerprint.len(),
                FingerprintKind::DHash.expected_len(size)
            );
        }
    }

    #[test]
    fn preview_is_the_sampled_grid() {
        let extractor = DifferenceExtractor::new(8).unwrap();
        let extraction = extractor.extract(&create_solid_image(10, 20, 30)).unwrap();

        assert_eq!(extraction.preview.dimensions(), (9, 8));
    }

    #[test]
    fn out_of_range_size_fails_fast() {
        assert!(matches!(
            DifferenceExtractor::new(7),
            Err(ExtractError::InvalidSize { size: 7, .. })
        ));
        assert!(DifferenceExtractor::new(129).is_err());
    }

    #[test]
    fn surface_failure_propagates() {
        let extractor = DifferenceExtractor::new(8).unwrap();
        let result = extractor.extract_with(&create_solid_image(0, 0, 0), &mut BrokenSurface);

        assert!(matches!(result, Err(ExtractError::SurfaceUnavailable(_))));
    }

    #[test]
    fn unloaded_image_is_rejected() {
        let extractor = DifferenceExtractor::new(8).unwrap();
        let result = extractor.extract(&DynamicImage::new_rgb8(0, 0));

        assert!(matches!(result, Err(ExtractError::ImageNotReady { .. })));
    }

    #[test]
    fn unloaded_image_is_rejected_by_any_surface() {
        let extractor = DifferenceExtractor::new(8).unwrap();
        let mut surface = FixedSurface(RgbImage::new(9, 8));

        let result = extractor.extract_with(&DynamicImage::new_rgb8(0, 0), &mut surface);

        assert!(matches!(result, Err(ExtractError::ImageNotReady { .. })));
    }

    #[test]
    fn kind_returns_dhash() {
        let extractor = DifferenceExtractor::new(8).unwrap();
        assert_eq!(extractor.kind(), FingerprintKind::DHash);
        assert_eq!(extractor.size(), 8);
    }
}
