//! Sampling surfaces.
//!
//! The extractors only need one drawing primitive: "resample this image to a
//! WxH RGB grid". `FastResampler` provides it with SIMD-accelerated bilinear
//! convolution via fast_image_resize (AVX2/NEON when available).

use super::decode::ensure_ready;
use crate::error::ExtractError;
use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, ImageBuffer, Rgb, RgbImage};

/// Capability to resample an image onto a fixed grid
pub trait SampleSurface {
    /// Resample `image`, ignoring aspect ratio, to exactly `width` x `height`
    fn resample(
        &mut self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<RgbImage, ExtractError>;
}

/// Bilinear resampler backed by fast_image_resize
pub struct FastResampler {
    resizer: Resizer,
}

impl FastResampler {
    pub fn new() -> Self {
        Self {
            resizer: Resizer::new(),
        }
    }
}

impl Default for FastResampler {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleSurface for FastResampler {
    fn resample(
        &mut self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<RgbImage, ExtractError> {
        ensure_ready(image)?;

        if width == 0 || height == 0 {
            return Err(ExtractError::SurfaceUnavailable(format!(
                "invalid grid {}x{}",
                width, height
            )));
        }

        let rgb = image.to_rgb8();
        let (src_width, src_height) = rgb.dimensions();

        let src_image = Image::from_vec_u8(src_width, src_height, rgb.into_raw(), PixelType::U8x3)
            .map_err(|e| {
                ExtractError::SurfaceUnavailable(format!("failed to create source image: {}", e))
            })?;

        let mut dst_image = Image::new(width, height, PixelType::U8x3);

        let options =
            ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));

        self.resizer
            .resize(&src_image, &mut dst_image, &options)
            .map_err(|e| ExtractError::SurfaceUnavailable(format!("resize failed: {}", e)))?;

        let grid: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_raw(width, height, dst_image.into_vec()).ok_or_else(|| {
                ExtractError::SurfaceUnavailable("failed to create result buffer".to_string())
            })?;

        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            let r = (x * 255 / width.max(1)) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            let b = ((x + y) * 128 / (width + height).max(1)) as u8;
            Rgb([r, g, b])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn resample_produces_requested_grid() {
        let mut surface = FastResampler::new();
        let grid = surface.resample(&create_test_image(100, 100), 9, 8).unwrap();

        assert_eq!(grid.dimensions(), (9, 8));
    }

    #[test]
    fn resample_ignores_aspect_ratio() {
        let mut surface = FastResampler::new();
        let grid = surface.resample(&create_test_image(300, 50), 32, 32).unwrap();

        assert_eq!(grid.dimensions(), (32, 32));
    }

    #[test]
    fn resample_upscales_tiny_images() {
        let mut surface = FastResampler::new();
        let grid = surface.resample(&create_test_image(2, 2), 9, 8).unwrap();

        assert_eq!(grid.dimensions(), (9, 8));
    }

    #[test]
    fn resampler_reuse() {
        let mut surface = FastResampler::new();
        let image = create_test_image(64, 64);

        let first = surface.resample(&image, 8, 8).unwrap();
        let second = surface.resample(&image, 8, 8).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn zero_grid_is_a_surface_error() {
        let mut surface = FastResampler::new();
        let result = surface.resample(&create_test_image(10, 10), 0, 8);

        assert!(matches!(result, Err(ExtractError::SurfaceUnavailable(_))));
    }

    #[test]
    fn empty_source_is_not_ready() {
        let mut surface = FastResampler::new();
        let result = surface.resample(&DynamicImage::new_rgb8(0, 0), 9, 8);

        assert!(matches!(result, Err(ExtractError::ImageNotReady { .. })));
    }
}
