//! # Capture Module
//!
//! Turns a camera frame or uploaded photo into the square thumbnail stored
//! with a catalogue item.
//!
//! The frame is fitted into a `size × size` black square keeping its aspect
//! ratio (letterbox), then encoded as a JPEG data URL. Fingerprints are
//! always computed from this normalised thumbnail so that captures from
//! different cameras compare on equal terms.

use crate::core::extractor::decode::ensure_ready;
use crate::core::extractor::{FastResampler, SampleSurface};
use crate::error::ExtractError;
use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, DynamicImage, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Edge length of a captured thumbnail
pub const DEFAULT_CAPTURE_SIZE: u32 = 256;

/// JPEG quality of a captured thumbnail
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Capture settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub size: u32,
    pub jpeg_quality: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CAPTURE_SIZE,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// A normalised capture
#[derive(Debug, Clone)]
pub struct Capture {
    /// The letterboxed square
    pub image: RgbImage,
    /// `data:image/jpeg;base64,...` encoding of `image`
    pub data_url: String,
}

impl Capture {
    pub fn as_dynamic(&self) -> DynamicImage {
        DynamicImage::ImageRgb8(self.image.clone())
    }
}

/// Capture with the default resampler
pub fn capture(image: &DynamicImage, config: &CaptureConfig) -> Result<Capture, ExtractError> {
    let mut surface = FastResampler::new();
    capture_with(image, config, &mut surface)
}

/// Letterbox `image` and encode it as JPEG
pub fn capture_with(
    image: &DynamicImage,
    config: &CaptureConfig,
    surface: &mut dyn SampleSurface,
) -> Result<Capture, ExtractError> {
    let square = letterbox(image, config.size, surface)?;
    let data_url = encode_jpeg_data_url(&square, config.jpeg_quality)?;

    debug!(
        source_width = image.width(),
        source_height = image.height(),
        size = config.size,
        "captured thumbnail"
    );

    Ok(Capture {
        image: square,
        data_url,
    })
}

/// Placement of a frame inside the square: (x, y, width, height)
pub fn letterbox_rect(width: u32, height: u32, size: u32) -> (u32, u32, u32, u32) {
    let aspect = width as f64 / height as f64;
    let target = size as f64;

    let (draw_width, draw_height) = if aspect > 1.0 {
        (target, target / aspect)
    } else {
        (target * aspect, target)
    };

    let draw_width = (draw_width.round() as u32).clamp(1, size);
    let draw_height = (draw_height.round() as u32).clamp(1, size);

    (
        (size - draw_width) / 2,
        (size - draw_height) / 2,
        draw_width,
        draw_height,
    )
}

/// Fit `image` into a `size × size` black square, preserving aspect ratio
pub fn letterbox(
    image: &DynamicImage,
    size: u32,
    surface: &mut dyn SampleSurface,
) -> Result<RgbImage, ExtractError> {
    ensure_ready(image)?;
    if size == 0 {
        return Err(ExtractError::SurfaceUnavailable(
            "capture size must be nonzero".to_string(),
        ));
    }

    let (x, y, width, height) = letterbox_rect(image.width(), image.height(), size);
    let frame = surface.resample(image, width, height)?;

    let mut canvas = RgbImage::from_pixel(size, size, Rgb([0, 0, 0]));
    imageops::overlay(&mut canvas, &frame, x as i64, y as i64);
    Ok(canvas)
}

/// Encode an RGB image as a `data:image/jpeg;base64,` URL
pub fn encode_jpeg_data_url(image: &RgbImage, quality: u8) -> Result<String, ExtractError> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
        .encode_image(image)
        .map_err(|e| ExtractError::PreviewEncoding(e.to_string()))?;

    Ok(format!(
        "data:image/jpeg;base64,{}",
        general_purpose::STANDARD.encode(bytes)
    ))
}
