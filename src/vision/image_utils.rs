// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image decoding into the canonical RGB form used by detection

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, RgbImage};
use thiserror::Error;

/// Maximum encoded image size (10MB)
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Custom error types for image decoding
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error("Invalid base64 encoding: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Image data is empty")]
    EmptyData,

    #[error("Image has zero width or height")]
    EmptyDimensions,
}

/// Image information extracted during loading
#[derive(Debug, Clone)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Detected format
    pub format: ImageFormat,
    /// Size in bytes of the encoded data
    pub size_bytes: usize,
    /// Whether the decoded raster had to be converted to RGB8
    pub converted: bool,
}

/// Decoded RGB8 raster owned by a single request
#[derive(Debug, Clone)]
pub struct CanonicalImage {
    rgb: RgbImage,
}

impl CanonicalImage {
    /// Normalize any decoded image into RGB8
    ///
    /// Palette, grayscale, alpha and 16-bit images are flattened to RGB8.
    pub fn from_dynamic(image: DynamicImage) -> Result<Self, ImageError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ImageError::EmptyDimensions);
        }
        let rgb = match image {
            DynamicImage::ImageRgb8(rgb) => rgb,
            other => other.into_rgb8(),
        };
        Ok(Self { rgb })
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    /// Pixel view handed to the detection model
    pub fn as_rgb(&self) -> &RgbImage {
        &self.rgb
    }
}

/// Strip a `data:image/...;base64,` prefix if present
///
/// Everything up to and including the first comma is removed. Payloads
/// without the prefix are returned unchanged.
pub fn strip_data_url_prefix(payload: &str) -> &str {
    let payload = payload.trim();
    if payload.starts_with("data:image") {
        match payload.split_once(',') {
            Some((_, data)) => data,
            None => payload,
        }
    } else {
        payload
    }
}

/// Decode a base64-encoded image, optionally data-URL prefixed
///
/// # Returns
/// * `Ok((CanonicalImage, ImageInfo))` - The decoded image and metadata
/// * `Err(ImageError)` - If decoding fails
///
/// # Example
/// ```ignore
/// let (image, info) = decode_base64_image("data:image/png;base64,iVBORw0KGgo...")?;
/// println!("Image size: {}x{}", info.width, info.height);
/// ```
pub fn decode_base64_image(base64_str: &str) -> Result<(CanonicalImage, ImageInfo), ImageError> {
    decode_base64_image_with_limit(base64_str, MAX_IMAGE_SIZE)
}

/// Same as [`decode_base64_image`] with a caller-chosen limit on decoded bytes
pub fn decode_base64_image_with_limit(
    base64_str: &str,
    max_bytes: usize,
) -> Result<(CanonicalImage, ImageInfo), ImageError> {
    let payload = strip_data_url_prefix(base64_str);
    if payload.is_empty() {
        return Err(ImageError::EmptyData);
    }

    let bytes = STANDARD.decode(payload)?;
    decode_image_bytes_with_limit(&bytes, max_bytes)
}

/// Decode raw image bytes (multipart uploads and decoded base64 payloads)
pub fn decode_image_bytes(bytes: &[u8]) -> Result<(CanonicalImage, ImageInfo), ImageError> {
    decode_image_bytes_with_limit(bytes, MAX_IMAGE_SIZE)
}

/// Same as [`decode_image_bytes`] with a caller-chosen size limit
pub fn decode_image_bytes_with_limit(
    bytes: &[u8],
    max_bytes: usize,
) -> Result<(CanonicalImage, ImageInfo), ImageError> {
    if bytes.len() > max_bytes {
        return Err(ImageError::TooLarge(bytes.len(), max_bytes));
    }

    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }

    // Detect format from magic bytes
    let format = detect_format(bytes)?;

    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;
    let converted = !matches!(img, DynamicImage::ImageRgb8(_));

    let canonical = CanonicalImage::from_dynamic(img)?;

    let info = ImageInfo {
        width: canonical.width(),
        height: canonical.height(),
        format,
        size_bytes: bytes.len(),
        converted,
    };

    Ok((canonical, info))
}

/// Detect image format from magic bytes
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    if bytes.len() < 4 {
        return Err(ImageError::UnsupportedFormat);
    }

    match bytes {
        // PNG: 89 50 4E 47 (0x89 P N G)
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(ImageFormat::Png),

        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),

        // WebP: RIFF .... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Ok(ImageFormat::WebP),

        // GIF: GIF87a or GIF89a
        [0x47, 0x49, 0x46, 0x38, x, ..] if *x == 0x37 || *x == 0x39 => Ok(ImageFormat::Gif),

        // BMP: BM
        [0x42, 0x4D, ..] => Ok(ImageFormat::Bmp),

        // TIFF: II (little-endian) or MM (big-endian)
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Ok(ImageFormat::Tiff),

        _ => Err(ImageError::UnsupportedFormat),
    }
}
