//! Pure geometry for the shape and resize operations.
//!
//! Everything here works on `(width, height)` pairs and returns either a crop
//! box or a canvas size plus paste offset. No pixels are touched, so the
//! whole module is unit testable without decoding a single image.
//!
//! Every function returns `None` when the input already satisfies the target
//! shape; callers treat that as "leave the image alone".

/// Target ratio for [`rectangle_extend_layout`], as `(width, height)`.
pub const RATIO_EXTEND_ASPECT: (u32, u32) = (3, 4);

/// Region of the source image to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Size of a fresh canvas and where to paste the source onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasteLayout {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

/// Centered offset for fitting `inner` into `outer` along one axis.
///
/// Rounds down, so an odd leftover puts the extra pixel at the far edge.
fn centered_offset(outer: u32, inner: u32) -> u32 {
    (outer - inner) / 2
}

/// Centered square crop along the longer axis.
///
/// # Examples
/// ```
/// # use pixbatch::imaging::calculations::{square_crop_box, CropBox};
/// // 1000x600 landscape → keep the middle 600x600
/// assert_eq!(
///     square_crop_box(1000, 600),
///     Some(CropBox { x: 200, y: 0, width: 600, height: 600 })
/// );
/// assert_eq!(square_crop_box(500, 500), None);
/// ```
pub fn square_crop_box(width: u32, height: u32) -> Option<CropBox> {
    if width == height {
        return None;
    }
    let side = width.min(height);
    let (x, y) = if width > height {
        (centered_offset(width, side), 0)
    } else {
        (0, centered_offset(height, side))
    };
    Some(CropBox {
        x,
        y,
        width: side,
        height: side,
    })
}

/// Square canvas with side `max(width, height)`, source centered on the
/// shorter axis.
pub fn square_extend_layout(width: u32, height: u32) -> Option<PasteLayout> {
    if width == height {
        return None;
    }
    let side = width.max(height);
    let (offset_x, offset_y) = if width > height {
        (0, centered_offset(side, height))
    } else {
        (centered_offset(side, width), 0)
    };
    Some(PasteLayout {
        canvas_width: side,
        canvas_height: side,
        offset_x,
        offset_y,
    })
}

/// Pad vertically until `width:height` reaches 3:4.
///
/// Images that are already at least as tall as 3:4 are left alone. Width is
/// never changed and there is no horizontal padding.
pub fn rectangle_extend_layout(width: u32, height: u32) -> Option<PasteLayout> {
    let (aspect_w, aspect_h) = RATIO_EXTEND_ASPECT;

    // aspect_w / aspect_h >= width / height, compared without division
    if u64::from(aspect_w) * u64::from(height) >= u64::from(aspect_h) * u64::from(width) {
        return None;
    }

    let ratio = aspect_w as f64 / aspect_h as f64;
    let canvas_height = (width as f64 / ratio).round() as u32;
    Some(PasteLayout {
        canvas_width: width,
        canvas_height,
        offset_x: 0,
        offset_y: centered_offset(canvas_height, height),
    })
}

/// Downscale-only predicate: both target sides must be strictly smaller.
pub fn should_downscale(current: (u32, u32), target: (u32, u32)) -> bool {
    let (cur_w, cur_h) = current;
    let (tgt_w, tgt_h) = target;
    tgt_w < cur_w && tgt_h < cur_h
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // square_crop_box
    // =========================================================================

    #[test]
    fn crop_square_is_identity() {
        assert_eq!(square_crop_box(800, 800), None);
    }

    #[test]
    fn crop_landscape_centers_horizontally() {
        assert_eq!(
            square_crop_box(1000, 600),
            Some(CropBox {
                x: 200,
                y: 0,
                width: 600,
                height: 600
            })
        );
    }

    #[test]
    fn crop_portrait_centers_vertically() {
        // Both margins are equal, not the whole leftover at the top
        assert_eq!(
            square_crop_box(600, 1000),
            Some(CropBox {
                x: 0,
                y: 200,
                width: 600,
                height: 600
            })
        );
    }

    #[test]
    fn crop_odd_leftover_rounds_down() {
        // 101 - 50 = 51 → offset 25, 26 px trimmed at the far edge
        let b = square_crop_box(101, 50).unwrap();
        assert_eq!((b.x, b.y, b.width, b.height), (25, 0, 50, 50));
    }

    #[test]
    fn crop_side_is_min_dimension() {
        for (w, h) in [(1, 7), (7, 1), (640, 480), (480, 640), (3, 2)] {
            let b = square_crop_box(w, h).unwrap();
            assert_eq!(b.width, w.min(h));
            assert_eq!(b.height, w.min(h));
            assert!(b.x + b.width <= w);
            assert!(b.y + b.height <= h);
        }
    }

    // =========================================================================
    // square_extend_layout
    // =========================================================================

    #[test]
    fn extend_square_is_identity() {
        assert_eq!(square_extend_layout(300, 300), None);
    }

    #[test]
    fn extend_landscape_pads_top_and_bottom() {
        // 1000x600 → 1000x1000, 200px above and below
        assert_eq!(
            square_extend_layout(1000, 600),
            Some(PasteLayout {
                canvas_width: 1000,
                canvas_height: 1000,
                offset_x: 0,
                offset_y: 200
            })
        );
    }

    #[test]
    fn extend_portrait_pads_left_and_right() {
        assert_eq!(
            square_extend_layout(600, 1000),
            Some(PasteLayout {
                canvas_width: 1000,
                canvas_height: 1000,
                offset_x: 200,
                offset_y: 0
            })
        );
    }

    #[test]
    fn extend_side_is_max_dimension() {
        for (w, h) in [(1, 7), (7, 1), (640, 480), (480, 640), (3, 2)] {
            let l = square_extend_layout(w, h).unwrap();
            assert_eq!(l.canvas_width, w.max(h));
            assert_eq!(l.canvas_height, w.max(h));
            assert!(l.offset_x + w <= l.canvas_width);
            assert!(l.offset_y + h <= l.canvas_height);
        }
    }

    // =========================================================================
    // rectangle_extend_layout
    // =========================================================================

    #[test]
    fn ratio_extend_already_tall_is_identity() {
        // 600x1000 is taller than 3:4
        assert_eq!(rectangle_extend_layout(600, 1000), None);
    }

    #[test]
    fn ratio_extend_exact_ratio_is_identity() {
        assert_eq!(rectangle_extend_layout(600, 800), None);
    }

    #[test]
    fn ratio_extend_square_to_three_four() {
        // 600x600 → 600x800, 100px above and below
        assert_eq!(
            rectangle_extend_layout(600, 600),
            Some(PasteLayout {
                canvas_width: 600,
                canvas_height: 800,
                offset_x: 0,
                offset_y: 100
            })
        );
    }

    #[test]
    fn ratio_extend_landscape() {
        // 1000x600 → height round(1000 / 0.75) = 1333, offset (1333-600)/2 = 366
        let l = rectangle_extend_layout(1000, 600).unwrap();
        assert_eq!(l.canvas_width, 1000);
        assert_eq!(l.canvas_height, 1333);
        assert_eq!(l.offset_x, 0);
        assert_eq!(l.offset_y, 366);
    }

    #[test]
    fn ratio_extend_rounds_to_nearest() {
        // 2 / 0.75 = 2.67 → 3
        assert_eq!(rectangle_extend_layout(2, 1).unwrap().canvas_height, 3);
        // 1 / 0.75 = 1.33 → 1
        assert_eq!(rectangle_extend_layout(1, 1).unwrap().canvas_height, 1);
    }

    #[test]
    fn ratio_extend_never_shrinks_or_widens() {
        for (w, h) in [(100, 10), (4, 5), (1000, 700), (3000, 2000), (9, 1)] {
            let l = rectangle_extend_layout(w, h).unwrap();
            assert_eq!(l.canvas_width, w);
            assert!(l.canvas_height >= h);
            assert_eq!(l.canvas_height, (w as f64 / 0.75).round() as u32);
        }
    }

    // =========================================================================
    // should_downscale
    // =========================================================================

    #[test]
    fn downscale_when_both_sides_smaller() {
        assert!(should_downscale((2000, 3000), (1500, 1500)));
    }

    #[test]
    fn no_downscale_when_one_side_not_smaller() {
        assert!(!should_downscale((2000, 1000), (1500, 1500)));
        assert!(!should_downscale((1500, 3000), (1500, 1500)));
    }

    #[test]
    fn no_upscale() {
        assert!(!should_downscale((800, 600), (1500, 1500)));
    }
}
