//! Image decoding for the extractor.
//!
//! Uses zune-jpeg for JPEG files (1.5-2x faster than image crate),
//! falls back to image crate for other formats. Camera captures arrive as
//! `data:image/...;base64,` URLs and are decoded from memory.

use crate::core::scanner::ImageFormat;
use crate::error::ExtractError;
use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, GenericImageView, ImageBuffer, Luma, Rgb, Rgba};
use std::fs;
use std::path::{Path, PathBuf};
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

/// Fast image decoder that uses optimized decoders per format
pub struct FastDecoder;

impl FastDecoder {
    /// Decode an image from a file path using the fastest available decoder.
    pub fn decode(path: &Path) -> Result<DynamicImage, ExtractError> {
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(ImageFormat::from_extension)
            .unwrap_or(ImageFormat::Unknown);

        let image = match format {
            ImageFormat::Jpeg => Self::decode_jpeg(path).or_else(|_| Self::decode_fallback(path))?,
            _ => Self::decode_fallback(path)?,
        };

        ensure_ready(&image)?;
        Ok(image)
    }

    /// Decode an encoded image held in memory
    pub fn decode_bytes(bytes: &[u8]) -> Result<DynamicImage, ExtractError> {
        let image = image::load_from_memory(bytes).map_err(|e| ExtractError::DecodeError {
            path: PathBuf::from("<memory>"),
            reason: e.to_string(),
        })?;

        ensure_ready(&image)?;
        Ok(image)
    }

    /// Decode a base64 `data:` URL such as a camera capture
    pub fn decode_data_url(url: &str) -> Result<DynamicImage, ExtractError> {
        let invalid = |reason: &str| ExtractError::DecodeError {
            path: PathBuf::from("<data url>"),
            reason: reason.to_string(),
        };

        let rest = url
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| invalid("missing data: prefix"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| invalid("missing payload separator"))?;

        if !header.ends_with(";base64") {
            return Err(invalid("only base64 data URLs are supported"));
        }

        let bytes = general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| invalid(&e.to_string()))?;

        Self::decode_bytes(&bytes)
    }

    /// Fast JPEG decoding using zune-jpeg
    fn decode_jpeg(path: &Path) -> Result<DynamicImage, ExtractError> {
        let file_bytes = fs::read(path).map_err(|e| ExtractError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let options = DecoderOptions::new_fast().jpeg_set_out_colorspace(ColorSpace::RGB);
        let mut decoder = JpegDecoder::new_with_options(&file_bytes, options);

        let pixels = decoder.decode().map_err(|e| ExtractError::DecodeError {
            path: path.to_path_buf(),
            reason: format!("zune-jpeg decode failed: {:?}", e),
        })?;

        let info = decoder.info().ok_or_else(|| ExtractError::DecodeError {
            path: path.to_path_buf(),
            reason: "Failed to get image info".to_string(),
        })?;

        let width = info.width as u32;
        let height = info.height as u32;
        let buffer_error = || ExtractError::DecodeError {
            path: path.to_path_buf(),
            reason: "Decoded pixel buffer has the wrong size".to_string(),
        };

        let image = match decoder.get_output_colorspace().unwrap_or(ColorSpace::RGB) {
            ColorSpace::RGB => {
                let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels).ok_or_else(buffer_error)?;
                DynamicImage::ImageRgb8(buffer)
            }
            ColorSpace::RGBA => {
                let buffer: ImageBuffer<Rgba<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels).ok_or_else(buffer_error)?;
                DynamicImage::ImageRgba8(buffer)
            }
            ColorSpace::Luma => {
                let buffer: ImageBuffer<Luma<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels).ok_or_else(buffer_error)?;
                DynamicImage::ImageLuma8(buffer)
            }
            _ => return Self::decode_fallback(path),
        };

        Ok(image)
    }

    fn decode_fallback(path: &Path) -> Result<DynamicImage, ExtractError> {
        image::open(path).map_err(|e| ExtractError::DecodeError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// Reject images that have not been decoded into real pixels
pub fn ensure_ready(image: &DynamicImage) -> Result<(), ExtractError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ExtractError::ImageNotReady {
            reason: format!("image reports {}x{} pixels", width, height),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_fn(4, 3, |x, _| Rgb([(x * 60) as u8, 0, 0]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn decodes_png_bytes() {
        let image = FastDecoder::decode_bytes(&png_bytes()).unwrap();
        assert_eq!(image.dimensions(), (4, 3));
    }

    #[test]
    fn decodes_data_url() {
        let url = format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(png_bytes())
        );
        let image = FastDecoder::decode_data_url(&url).unwrap();
        assert_eq!(image.dimensions(), (4, 3));
    }

    #[test]
    fn rejects_data_url_without_base64() {
        let result = FastDecoder::decode_data_url("data:image/png,abc");
        assert!(matches!(result, Err(ExtractError::DecodeError { .. })));
    }

    #[test]
    fn rejects_garbage_bytes() {
        let result = FastDecoder::decode_bytes(b"this is not a valid image file");
        assert!(matches!(result, Err(ExtractError::DecodeError { .. })));
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = FastDecoder::decode(Path::new("/nonexistent/photo.jpg"));
        assert!(result.is_err());
    }

    #[test]
    fn empty_image_is_not_ready() {
        let image = DynamicImage::new_rgb8(0, 10);
        assert!(matches!(
            ensure_ready(&image),
            Err(ExtractError::ImageNotReady { .. })
        ));
    }
}
