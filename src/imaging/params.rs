//! Parameter types for encoding and inference.
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`Normalization`]: Per-channel mean/std applied to the model input tensor.
//! - [`SegmentationParams`]: Model input size plus normalization.

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Per-channel normalization: `(pixel / max - mean) / std`, RGB order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Normalization {
    /// ImageNet statistics, which U²-Net was trained with.
    pub fn imagenet() -> Self {
        Self {
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
        }
    }
}

/// How to feed an image to the segmentation model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentationParams {
    /// Square side the model expects (320 for U²-Net).
    pub input_size: u32,
    pub normalization: Normalization,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            input_size: 320,
            normalization: Normalization::imagenet(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_90() {
        assert_eq!(Quality::default().value(), 90);
    }

    #[test]
    fn segmentation_defaults_match_u2net() {
        let p = SegmentationParams::default();
        assert_eq!(p.input_size, 320);
        assert_eq!(p.normalization, Normalization::imagenet());
    }
}
