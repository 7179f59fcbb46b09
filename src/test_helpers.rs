//! Shared test utilities for the pixbatch test suite.
//!
//! Fixtures are generated in memory with the `image` crate, so no test needs
//! image files on disk or the segmentation model.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let img = gradient_rgb(1000, 600);
//! let out = square_extend(img).to_rgb8();
//! assert!(is_white(out.get_pixel(0, 0)));
//!
//! let decoded = codec::decode(&rgb_jpeg_bytes(30, 20)).unwrap();
//! ```

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, Rgb, RgbImage};

// =========================================================================
// Bitmaps
// =========================================================================

/// RGB image where every pixel is distinct enough to tell positions apart.
///
/// Channel values never reach 255 together, so no pixel is pure white.
pub fn gradient_rgb(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 251) as u8, (y % 241) as u8, ((x + y) % 7) as u8])
    }))
}

pub fn is_white(pixel: &Rgb<u8>) -> bool {
    pixel.0 == [255, 255, 255]
}

// =========================================================================
// Encoded fixtures
// =========================================================================

/// Lossless PNG bytes, color mode preserved.
pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_with_encoder(PngEncoder::new(&mut bytes))
        .unwrap();
    bytes
}

/// A gradient JPEG of the given size.
pub fn rgb_jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    gradient_rgb(width, height)
        .write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, 90))
        .unwrap();
    bytes
}
