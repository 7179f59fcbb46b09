//! # pixbatch
//!
//! Batch image transformation: take a set of uploaded images, apply one
//! operation selection to all of them, and hand back encoded results ready
//! to be archived as `<name>.<ext>`.
//!
//! # Pipeline
//!
//! Every image runs through the same fixed sequence, skipping what was not
//! selected:
//!
//! ```text
//! bytes ─▶ Decode ─▶ Resize? ─▶ Shape? ─▶ Remove background? ─▶ Encode ─▶ bytes
//!                    (down     (square crop │    (U²-Net matte,
//!                     only)     square extend │   composited on
//!                               3:4 extend)   │   white)
//! ```
//!
//! A failing image is recorded with the stage it failed at; the rest of the
//! batch carries on. See [`process::process_batch`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | Strongly-typed operation selection and output format, parsed once at the boundary |
//! | [`imaging`] | Geometry, pixel operations, codecs and the segmentation backend |
//! | [`process`] | Batch orchestration: per-image isolation, parallel fan-out, progress events |
//! | [`session`] | Explicit per-batch context: output directory, cancellation, result writing |
//! | [`config`] | `pixbatch.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Geometry Separate From Pixels
//!
//! Crop boxes, canvas sizes and paste offsets are computed by pure functions
//! in [`imaging::calculations`] and only then applied to bitmaps. The math is
//! where the edge cases live (odd differences, the 3:4 threshold), and it can
//! be tested exhaustively without allocating a single image.
//!
//! ## One Seam For Inference
//!
//! Background removal goes through the [`imaging::ForegroundSegmenter`]
//! trait. The ONNX Runtime implementation loads its model once and is shared
//! by every worker; tests substitute a deterministic mask. Everything around
//! the model call, from tensor layout to white compositing, is plain code in
//! [`imaging::matte`].
//!
//! ## No Ambient Session State
//!
//! Output location and cancellation travel in a [`session::Session`] that the
//! caller creates and passes in. Two batches in one process never see each
//! other's files.

pub mod config;
pub mod imaging;
pub mod output;
pub mod process;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
