//! Decoding uploaded bytes and encoding processed bitmaps.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Format detection | `image::guess_format` (magic bytes, not file names) |
//! | Identify | `ImageReader::into_dimensions` (header only) |
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::load_from_memory_with_format` |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` on RGB8 |
//! | Encode → PNG | `PngEncoder`, color mode unchanged |
//! | Encode → JPEG 2000 | OpenJPEG (`openjpeg-sys`) on RGBA8, JP2 container |
//!
//! Decoded images are normalized to 8-bit RGB or RGBA so every later step
//! deals with exactly two channel layouts.

use crate::types::{ColorMode, OutputFormat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use thiserror::Error;

use super::jpeg2000;
use super::params::Quality;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("{0}")]
    Decode(String),
    #[error("{0}")]
    UnsupportedFormat(String),
    #[error("{0}")]
    Encode(String),
}

/// Input formats whose decoders are compiled in.
pub const SUPPORTED_INPUT_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Tiff,
    ImageFormat::WebP,
];

/// File extensions matching [`SUPPORTED_INPUT_FORMATS`].
pub fn supported_input_extensions() -> &'static [&'static str] {
    &["jpg", "jpeg", "png", "tif", "tiff", "webp"]
}

/// Header-level facts about an input, read without decoding pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

/// A decoded input plus the format it was detected as.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub format: ImageFormat,
}

/// Bytes ready to be written as `<stem>.<extension>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub extension: &'static str,
    pub color_mode: ColorMode,
    pub width: u32,
    pub height: u32,
}

pub fn format_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "JPEG",
        ImageFormat::Png => "PNG",
        ImageFormat::Tiff => "TIFF",
        ImageFormat::WebP => "WEBP",
        ImageFormat::Gif => "GIF",
        ImageFormat::Bmp => "BMP",
        ImageFormat::Avif => "AVIF",
        _ => "unknown",
    }
}

fn detect_format(bytes: &[u8]) -> Result<ImageFormat, CodecError> {
    let format = image::guess_format(bytes)
        .map_err(|_| CodecError::Decode("unrecognized image data".into()))?;
    if !SUPPORTED_INPUT_FORMATS.contains(&format) {
        return Err(CodecError::UnsupportedFormat(format!(
            "{} input is not supported",
            format_name(format)
        )));
    }
    Ok(format)
}

/// Read format and dimensions from the header.
pub fn identify(bytes: &[u8]) -> Result<ImageInfo, CodecError> {
    let format = detect_format(bytes)?;
    let (width, height) = ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(|e| CodecError::Decode(e.to_string()))?;
    Ok(ImageInfo {
        format,
        width,
        height,
    })
}

/// Channel layout of a decoded bitmap.
pub fn color_mode(image: &DynamicImage) -> ColorMode {
    if image.color().has_alpha() {
        ColorMode::Rgba
    } else {
        ColorMode::Rgb
    }
}

/// Convert to 8-bit RGB or RGBA, reusing the buffer when it already is one.
fn normalize_channels(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => image,
        other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Decode raw upload bytes.
///
/// Unrecognized or corrupt data is a [`CodecError::Decode`]; a recognized
/// format without a compiled-in decoder is [`CodecError::UnsupportedFormat`].
pub fn decode(bytes: &[u8]) -> Result<DecodedImage, CodecError> {
    let format = detect_format(bytes)?;
    let image = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| CodecError::Decode(e.to_string()))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(CodecError::Decode("image has zero area".into()));
    }
    Ok(DecodedImage {
        image: normalize_channels(image),
        format,
    })
}

/// Encode into the target format, converting color mode as the format requires.
pub fn encode(
    image: &DynamicImage,
    format: OutputFormat,
    quality: Quality,
) -> Result<EncodedImage, CodecError> {
    let mode = format.color_mode().unwrap_or_else(|| color_mode(image));
    let converted = match mode {
        ColorMode::Rgb => DynamicImage::ImageRgb8(image.to_rgb8()),
        ColorMode::Rgba => DynamicImage::ImageRgba8(image.to_rgba8()),
    };

    let bytes = match format {
        OutputFormat::Jpeg => {
            let mut bytes = Vec::new();
            let encoder = JpegEncoder::new_with_quality(&mut bytes, quality.value() as u8);
            converted
                .write_with_encoder(encoder)
                .map_err(|e| CodecError::Encode(format!("JPEG encode failed: {e}")))?;
            bytes
        }
        OutputFormat::Png => {
            let mut bytes = Vec::new();
            converted
                .write_with_encoder(PngEncoder::new(&mut bytes))
                .map_err(|e| CodecError::Encode(format!("PNG encode failed: {e}")))?;
            bytes
        }
        OutputFormat::Jpeg2000 => jpeg2000::encode_rgba(&converted.into_rgba8())?,
    };

    Ok(EncodedImage {
        bytes,
        format,
        extension: format.extension(),
        color_mode: mode,
        width: image.width(),
        height: image.height(),
    })
}
