//! Deterministic pre- and post-processing around segmentation inference.
//!
//! ```text
//! RGB image ──resize to N×N──▶ normalize ──▶ NCHW tensor ──▶ model
//!                                                             │
//! opaque RGB ◀── composite on white ◀── resize to W×H ◀── min-max matte
//! ```
//!
//! Only the model call itself is non-deterministic territory; everything in
//! this module is a pure function and is tested without a model.

use super::backend::BackendError;
use super::params::SegmentationParams;
use image::imageops::FilterType;
use image::{GrayImage, Luma, Rgb, RgbImage};
use ndarray::Array4;

/// Build the `1×3×N×N` model input from an RGB image.
///
/// Pixels are divided by the brightest channel value in the resized image
/// (not a fixed 255), then normalized with the configured mean/std.
pub fn to_input_tensor(
    image: &RgbImage,
    params: &SegmentationParams,
) -> Result<Array4<f32>, BackendError> {
    let size = params.input_size;
    let resized = image::imageops::resize(image, size, size, FilterType::Lanczos3);

    let max = resized.as_raw().iter().copied().max().unwrap_or(0);
    let scale = f32::from(max).max(1e-6);

    let side = size as usize;
    let mut data = Vec::with_capacity(3 * side * side);
    for c in 0..3 {
        let mean = params.normalization.mean[c];
        let std = params.normalization.std[c];
        for pixel in resized.pixels() {
            data.push((f32::from(pixel[c]) / scale - mean) / std);
        }
    }

    Array4::from_shape_vec((1, 3, side, side), data)
        .map_err(|e| BackendError::Inference(format!("input tensor shape: {e}")))
}

/// Turn a raw model matte into a mask sized like the original image.
///
/// The matte is min-max normalized to 0..=255 first; a flat matte becomes
/// all background.
pub fn matte_to_mask(
    matte: &[f32],
    matte_size: (u32, u32),
    output_size: (u32, u32),
) -> Result<GrayImage, BackendError> {
    let (mw, mh) = matte_size;
    let expected = mw as usize * mh as usize;
    if matte.len() != expected {
        return Err(BackendError::Inference(format!(
            "matte has {} values, expected {}x{}",
            matte.len(),
            mw,
            mh
        )));
    }

    let (min, max) = matte
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;

    let bytes: Vec<u8> = matte
        .iter()
        .map(|&v| {
            if range > f32::EPSILON {
                (((v - min) / range) * 255.0).round().clamp(0.0, 255.0) as u8
            } else {
                0
            }
        })
        .collect();

    let small = GrayImage::from_raw(mw, mh, bytes)
        .ok_or_else(|| BackendError::Inference("matte buffer size mismatch".into()))?;

    let (ow, oh) = output_size;
    if (mw, mh) == (ow, oh) {
        return Ok(small);
    }
    Ok(image::imageops::resize(&small, ow, oh, FilterType::Lanczos3))
}

/// Blend one channel of the source over white with the given coverage.
#[inline]
fn over_white(channel: u8, alpha: u8) -> u8 {
    let c = u32::from(channel);
    let a = u32::from(alpha);
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}

/// Paste `source` onto an opaque white canvas using `mask` as the paste mask.
///
/// Any alpha the caller's image had is already gone from `source`; the mask
/// alone decides coverage, so the result is always opaque.
pub fn composite_on_white(source: &RgbImage, mask: &GrayImage) -> Result<RgbImage, BackendError> {
    if source.dimensions() != mask.dimensions() {
        return Err(BackendError::Inference(format!(
            "mask is {}x{} but image is {}x{}",
            mask.width(),
            mask.height(),
            source.width(),
            source.height()
        )));
    }

    let (w, h) = source.dimensions();
    let mut canvas = RgbImage::from_pixel(w, h, Rgb([255, 255, 255]));
    for (x, y, out) in canvas.enumerate_pixels_mut() {
        let src = source.get_pixel(x, y);
        let Luma([a]) = *mask.get_pixel(x, y);
        *out = Rgb([
            over_white(src[0], a),
            over_white(src[1], a),
            over_white(src[2], a),
        ]);
    }
    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // to_input_tensor
    // =========================================================================

    #[test]
    fn tensor_has_nchw_shape() {
        let img = RgbImage::from_pixel(40, 20, Rgb([10, 20, 30]));
        let params = SegmentationParams {
            input_size: 16,
            ..SegmentationParams::default()
        };
        let tensor = to_input_tensor(&img, &params).unwrap();
        assert_eq!(tensor.dim(), (1, 3, 16, 16));
    }

    #[test]
    fn tensor_scales_by_brightest_value() {
        // Uniform image: every channel value equals the max → 1.0 before mean/std
        let img = RgbImage::from_pixel(8, 8, Rgb([100, 100, 100]));
        let params = SegmentationParams {
            input_size: 4,
            ..SegmentationParams::default()
        };
        let tensor = to_input_tensor(&img, &params).unwrap();

        let n = params.normalization;
        let expected_r = (1.0 - n.mean[0]) / n.std[0];
        let expected_b = (1.0 - n.mean[2]) / n.std[2];
        assert!((tensor[[0, 0, 0, 0]] - expected_r).abs() < 1e-4);
        assert!((tensor[[0, 2, 3, 3]] - expected_b).abs() < 1e-4);
    }

    #[test]
    fn tensor_black_image_does_not_divide_by_zero() {
        let img = RgbImage::new(4, 4);
        let params = SegmentationParams {
            input_size: 4,
            ..SegmentationParams::default()
        };
        let tensor = to_input_tensor(&img, &params).unwrap();
        assert!(tensor.iter().all(|v| v.is_finite()));
    }

    // =========================================================================
    // matte_to_mask
    // =========================================================================

    #[test]
    fn matte_is_min_max_normalized() {
        let matte = [-1.0, 0.0, -0.5, 1.0];
        let mask = matte_to_mask(&matte, (2, 2), (2, 2)).unwrap();
        assert_eq!(mask.get_pixel(0, 0).0, [0]);
        assert_eq!(mask.get_pixel(1, 1).0, [255]);
        // 0.5 * 255 = 127.5 rounds up
        assert_eq!(mask.get_pixel(1, 0).0, [128]);
        assert_eq!(mask.get_pixel(0, 1).0, [64]);
    }

    #[test]
    fn flat_matte_is_background() {
        let matte = [0.5; 4];
        let mask = matte_to_mask(&matte, (2, 2), (2, 2)).unwrap();
        assert!(mask.pixels().all(|p| p.0 == [0]));
    }

    #[test]
    fn matte_resized_to_output() {
        let mut matte = vec![1.0; 16 * 16];
        matte[0] = 0.0;
        let mask = matte_to_mask(&matte, (16, 16), (100, 60)).unwrap();
        assert_eq!(mask.dimensions(), (100, 60));
    }

    #[test]
    fn matte_wrong_length_errors() {
        let result = matte_to_mask(&[0.0; 3], (2, 2), (2, 2));
        assert!(matches!(result, Err(BackendError::Inference(_))));
    }

    // =========================================================================
    // composite_on_white
    // =========================================================================

    #[test]
    fn composite_background_becomes_white() {
        let src = RgbImage::from_pixel(2, 1, Rgb([10, 20, 30]));
        let mask = GrayImage::from_raw(2, 1, vec![255, 0]).unwrap();
        let out = composite_on_white(&src, &mask).unwrap();
        assert_eq!(out.get_pixel(0, 0).0, [10, 20, 30]);
        assert_eq!(out.get_pixel(1, 0).0, [255, 255, 255]);
    }

    #[test]
    fn composite_blends_partial_coverage() {
        let src = RgbImage::from_pixel(1, 1, Rgb([0, 0, 0]));
        let mask = GrayImage::from_pixel(1, 1, Luma([128]));
        let out = composite_on_white(&src, &mask).unwrap();
        // 255 * 127 / 255 ≈ 127
        assert_eq!(out.get_pixel(0, 0).0, [127, 127, 127]);
    }

    #[test]
    fn composite_size_mismatch_errors() {
        let src = RgbImage::new(2, 2);
        let mask = GrayImage::new(3, 2);
        assert!(composite_on_white(&src, &mask).is_err());
    }
}
