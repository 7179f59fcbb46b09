//! Image processing.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode / identify** | `image` (JPEG, PNG, TIFF, WebP) |
//! | **Resize** | `resize_exact` with Lanczos3, downscale only |
//! | **Square crop / extend, 3:4 extend** | `crop_imm`, `imageops::replace` on a white canvas |
//! | **Background removal** | U²-Net via `ort`, matte composited on white |
//! | **Encode** | `JpegEncoder` / `PngEncoder` / OpenJPEG for JPEG 2000 |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for canvas geometry (unit testable)
//! - **Parameters**: Quality and segmentation settings
//! - **Backend**: [`ForegroundSegmenter`] trait + [`U2NetBackend`]
//! - **Matte**: Tensor building and matte post-processing around the model
//! - **Codec**: Bytes in, bytes out
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
pub mod calculations;
pub mod codec;
mod jpeg2000;
pub mod matte;
pub mod onnx_backend;
pub mod operations;
mod params;

pub use backend::{BackendError, ForegroundSegmenter};
pub use codec::{CodecError, DecodedImage, EncodedImage, ImageInfo};
pub use onnx_backend::U2NetBackend;
pub use operations::{apply_shape, remove_background, resize};
pub use params::{Normalization, Quality, SegmentationParams};
