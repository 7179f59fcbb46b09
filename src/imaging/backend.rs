//! Foreground segmentation backend trait and shared error type.
//!
//! The [`ForegroundSegmenter`] trait is the single seam between the
//! deterministic pipeline and ML inference. Given an RGB bitmap it returns a
//! same-sized grayscale mask where 255 is foreground and 0 is background.
//!
//! The production implementation is
//! [`U2NetBackend`](super::onnx_backend::U2NetBackend). Tests use the
//! recording mock in [`tests`].

use image::{GrayImage, RgbImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Model failed to load: {0}")]
    ModelLoad(String),
    #[error("Inference failed: {0}")]
    Inference(String),
}

impl From<ort::Error> for BackendError {
    fn from(e: ort::Error) -> Self {
        BackendError::Inference(e.to_string())
    }
}

/// A model that separates subject from background.
///
/// Implementations must be `Send + Sync`: one instance is shared by every
/// worker of a batch.
pub trait ForegroundSegmenter: Send + Sync {
    /// Produce a per-pixel foreground mask with the same dimensions as `image`.
    fn segment(&self, image: &RgbImage) -> Result<GrayImage, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock segmenter that records every call.
    ///
    /// The mask marks the left half of the image as foreground. Images whose
    /// width is listed in `fail_widths` fail with an inference error, which
    /// lets batch tests pick the failing image deterministically even when
    /// workers run in parallel. Uses Mutex so it is Sync for rayon.
    #[derive(Default)]
    pub struct MockSegmenter {
        pub fail_widths: Vec<u32>,
        pub calls: Mutex<Vec<(u32, u32)>>,
    }

    impl MockSegmenter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_for_width(width: u32) -> Self {
            Self {
                fail_widths: vec![width],
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn get_calls(&self) -> Vec<(u32, u32)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ForegroundSegmenter for MockSegmenter {
        fn segment(&self, image: &RgbImage) -> Result<GrayImage, BackendError> {
            let (w, h) = image.dimensions();
            self.calls.lock().unwrap().push((w, h));

            if self.fail_widths.contains(&w) {
                return Err(BackendError::Inference(format!("mock failure for {w}x{h}")));
            }

            Ok(GrayImage::from_fn(w, h, |x, _| {
                if x < w / 2 {
                    image::Luma([255])
                } else {
                    image::Luma([0])
                }
            }))
        }
    }

    #[test]
    fn mock_records_calls() {
        let segmenter = MockSegmenter::new();
        let mask = segmenter.segment(&RgbImage::new(10, 4)).unwrap();

        assert_eq!(mask.dimensions(), (10, 4));
        assert_eq!(mask.get_pixel(0, 0).0, [255]);
        assert_eq!(mask.get_pixel(9, 3).0, [0]);
        assert_eq!(segmenter.get_calls(), vec![(10, 4)]);
    }

    #[test]
    fn mock_fails_for_configured_width() {
        let segmenter = MockSegmenter::failing_for_width(7);
        assert!(segmenter.segment(&RgbImage::new(8, 8)).is_ok());
        assert!(matches!(
            segmenter.segment(&RgbImage::new(7, 8)),
            Err(BackendError::Inference(_))
        ));
        assert_eq!(segmenter.get_calls().len(), 2);
    }
}
