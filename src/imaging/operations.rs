//! Pixel operations.
//!
//! These functions combine the geometry from [`calculations`](super::calculations)
//! with actual bitmaps. Shape operations take the image by value and hand it
//! back untouched when no change is needed, so an already-square image costs
//! nothing.
//!
//! Inputs are expected to be 8-bit RGB or RGBA (see
//! [`codec::decode`](super::codec::decode)); extend canvases take the same
//! layout as the image pasted onto them.

use super::backend::{BackendError, ForegroundSegmenter};
use super::calculations::{
    PasteLayout, rectangle_extend_layout, should_downscale, square_crop_box,
    square_extend_layout,
};
use super::codec::color_mode;
use super::matte::composite_on_white;
use crate::types::{ColorMode, ResizeTarget, Shape};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};

/// Solid white canvas. RGBA canvases are fully opaque white, never transparent.
pub fn white_canvas(width: u32, height: u32, mode: ColorMode) -> DynamicImage {
    match mode {
        ColorMode::Rgb => {
            DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])))
        }
        ColorMode::Rgba => DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([255, 255, 255, 255]),
        )),
    }
}

/// Paste `image` onto a fresh white canvas in the image's own color mode.
fn paste_on_white(image: &DynamicImage, layout: PasteLayout) -> DynamicImage {
    let x = i64::from(layout.offset_x);
    let y = i64::from(layout.offset_y);
    let mut canvas = white_canvas(layout.canvas_width, layout.canvas_height, color_mode(image));

    match (&mut canvas, image) {
        (DynamicImage::ImageRgb8(dst), DynamicImage::ImageRgb8(src)) => {
            imageops::replace(dst, src, x, y)
        }
        (DynamicImage::ImageRgba8(dst), DynamicImage::ImageRgba8(src)) => {
            imageops::replace(dst, src, x, y)
        }
        (dst, src) => imageops::replace(dst, src, x, y),
    }
    canvas
}

/// Centered square crop to `min(width, height)`. No resampling.
pub fn square_crop(image: DynamicImage) -> DynamicImage {
    match square_crop_box(image.width(), image.height()) {
        Some(b) => image.crop_imm(b.x, b.y, b.width, b.height),
        None => image,
    }
}

/// Pad to a `max(width, height)` square with white, original centered.
pub fn square_extend(image: DynamicImage) -> DynamicImage {
    match square_extend_layout(image.width(), image.height()) {
        Some(layout) => paste_on_white(&image, layout),
        None => image,
    }
}

/// Pad top and bottom with white until the image is 3:4.
pub fn rectangle_extend(image: DynamicImage) -> DynamicImage {
    match rectangle_extend_layout(image.width(), image.height()) {
        Some(layout) => paste_on_white(&image, layout),
        None => image,
    }
}

/// Dispatch a [`Shape`] choice. `Shape::None` returns the input as is.
pub fn apply_shape(image: DynamicImage, shape: Shape) -> DynamicImage {
    match shape {
        Shape::None => image,
        Shape::SquareCrop => square_crop(image),
        Shape::SquareExtend => square_extend(image),
        Shape::RatioExtend => rectangle_extend(image),
    }
}

/// Downscale-only resize straight to `target` (aspect ratio not preserved).
///
/// Applies only when both target sides are strictly smaller than the image;
/// otherwise the image comes back unchanged.
pub fn resize(image: DynamicImage, target: ResizeTarget) -> DynamicImage {
    if should_downscale(
        (image.width(), image.height()),
        (target.width, target.height),
    ) {
        image.resize_exact(target.width, target.height, FilterType::Lanczos3)
    } else {
        image
    }
}

/// Segment the foreground and composite it onto opaque white.
///
/// The result is always RGB with the input's dimensions.
pub fn remove_background(
    image: &DynamicImage,
    segmenter: &dyn ForegroundSegmenter,
) -> Result<DynamicImage, BackendError> {
    let rgb = image.to_rgb8();
    let mask = segmenter.segment(&rgb)?;
    let composited = composite_on_white(&rgb, &mask)?;
    Ok(DynamicImage::ImageRgb8(composited))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockSegmenter;
    use crate::test_helpers::{gradient_rgb, is_white};

    // =========================================================================
    // Shape identities
    // =========================================================================

    #[test]
    fn square_inputs_are_untouched() {
        let img = gradient_rgb(40, 40);
        assert_eq!(square_crop(img.clone()), img);
        assert_eq!(square_extend(img.clone()), img);
    }

    #[test]
    fn shape_none_is_identity() {
        let img = gradient_rgb(30, 10);
        assert_eq!(apply_shape(img.clone(), Shape::None), img);
    }

    // =========================================================================
    // square_crop
    // =========================================================================

    #[test]
    fn square_crop_keeps_center_pixels() {
        let img = gradient_rgb(100, 60);
        let out = square_crop(img.clone());
        assert_eq!((out.width(), out.height()), (60, 60));
        // Output (0, 0) is source (20, 0)
        assert_eq!(out.to_rgb8().get_pixel(0, 0), img.to_rgb8().get_pixel(20, 0));
    }

    #[test]
    fn square_crop_portrait() {
        let img = gradient_rgb(60, 100);
        let out = square_crop(img.clone());
        assert_eq!((out.width(), out.height()), (60, 60));
        assert_eq!(
            out.to_rgb8().get_pixel(5, 0),
            img.to_rgb8().get_pixel(5, 20)
        );
    }

    // =========================================================================
    // square_extend
    // =========================================================================

    #[test]
    fn square_extend_scenario_1000x600() {
        let img = gradient_rgb(1000, 600);
        let out = square_extend(img.clone());
        assert_eq!((out.width(), out.height()), (1000, 1000));

        let out = out.to_rgb8();
        let src = img.to_rgb8();
        // 200 px of white above and below
        assert!(is_white(out.get_pixel(500, 0)));
        assert!(is_white(out.get_pixel(500, 199)));
        assert!(is_white(out.get_pixel(500, 800)));
        assert!(is_white(out.get_pixel(999, 999)));
        // Original content unscaled in the middle band
        assert_eq!(out.get_pixel(0, 200), src.get_pixel(0, 0));
        assert_eq!(out.get_pixel(999, 799), src.get_pixel(999, 599));
        assert_eq!(out.get_pixel(123, 456), src.get_pixel(123, 256));
    }

    #[test]
    fn square_extend_rgba_padding_is_opaque_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 4, Rgba([1, 2, 3, 0])));
        let out = square_extend(img);
        let DynamicImage::ImageRgba8(out) = out else {
            panic!("expected RGBA output");
        };
        assert_eq!(out.dimensions(), (10, 10));
        assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255, 255]);
        // Pasted pixels are copied as is, transparency included
        assert_eq!(out.get_pixel(0, 3).0, [1, 2, 3, 0]);
    }

    #[test]
    fn square_extend_keeps_rgb_mode() {
        let out = square_extend(gradient_rgb(8, 2));
        assert!(matches!(out, DynamicImage::ImageRgb8(_)));
    }

    // =========================================================================
    // rectangle_extend
    // =========================================================================

    #[test]
    fn rectangle_extend_already_tall_is_identity() {
        let img = gradient_rgb(600, 1000);
        assert_eq!(rectangle_extend(img.clone()), img);
    }

    #[test]
    fn rectangle_extend_square_pads_vertically() {
        let img = gradient_rgb(600, 600);
        let out = rectangle_extend(img.clone());
        assert_eq!((out.width(), out.height()), (600, 800));

        let out = out.to_rgb8();
        assert!(is_white(out.get_pixel(300, 0)));
        assert!(is_white(out.get_pixel(300, 99)));
        assert!(is_white(out.get_pixel(300, 700)));
        assert_eq!(out.get_pixel(0, 100), img.to_rgb8().get_pixel(0, 0));
    }

    // =========================================================================
    // resize
    // =========================================================================

    #[test]
    fn resize_scenario_2000x3000_to_1500x1500() {
        let img = gradient_rgb(2000, 3000);
        let out = resize(img, ResizeTarget::square(1500).unwrap());
        assert_eq!((out.width(), out.height()), (1500, 1500));
    }

    #[test]
    fn resize_is_noop_when_any_side_not_smaller() {
        let img = gradient_rgb(1200, 3000);
        let out = resize(img.clone(), ResizeTarget::square(1500).unwrap());
        assert_eq!(out, img);

        let small = gradient_rgb(100, 80);
        let out = resize(small.clone(), ResizeTarget::new(100, 50).unwrap());
        assert_eq!(out, small);
    }

    // =========================================================================
    // remove_background
    // =========================================================================

    #[test]
    fn remove_background_is_opaque_and_same_size() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 6, Rgba([9, 8, 7, 100])));
        let segmenter = MockSegmenter::new();
        let out = remove_background(&img, &segmenter).unwrap();

        let DynamicImage::ImageRgb8(out) = out else {
            panic!("expected opaque RGB output");
        };
        assert_eq!(out.dimensions(), (10, 6));
        // Mock: left half foreground, right half background
        assert_eq!(out.get_pixel(0, 0).0, [9, 8, 7]);
        assert_eq!(out.get_pixel(9, 5).0, [255, 255, 255]);
        assert_eq!(segmenter.get_calls(), vec![(10, 6)]);
    }

    #[test]
    fn remove_background_propagates_model_error() {
        let segmenter = MockSegmenter::failing_for_width(10);
        let result = remove_background(&gradient_rgb(10, 6), &segmenter);
        assert!(matches!(result, Err(BackendError::Inference(_))));
    }

    #[test]
    fn white_canvas_modes() {
        let rgba = white_canvas(2, 2, ColorMode::Rgba).to_rgba8();
        assert!(rgba.pixels().all(|p| p.0 == [255, 255, 255, 255]));
        assert!(matches!(
            white_canvas(2, 2, ColorMode::Rgb),
            DynamicImage::ImageRgb8(_)
        ));
    }
}
