//! Batch pipeline orchestration.
//!
//! Takes a list of `(filename, bytes)` uploads plus one [`OperationSelection`]
//! and runs every image through the same fixed sequence:
//!
//! ```text
//! Decode → Resize? → Shape? → RemoveBackground? → Encode
//! ```
//!
//! Unselected steps are skipped outright. A failing step ends that image's
//! run with an [`ImageFailure`] naming the stage; the rest of the batch is
//! unaffected. Only an empty batch or an unusable session directory abort
//! the whole call. Filenames need not be unique: every input gets its own
//! entry, in input order.
//!
//! ## Parallel Processing
//!
//! Images are independent, so the batch fans out over the global
//! [rayon](https://docs.rs/rayon) pool. Results come back in input order no
//! matter which worker finished first. Cancellation is checked between
//! images: once the session's [`CancelToken`](crate::session::CancelToken)
//! fires, images that have not started are recorded as
//! [`Stage::Skipped`] rather than dropped.

use crate::imaging::codec::{self, CodecError, EncodedImage, format_name};
use crate::imaging::operations::{apply_shape, remove_background, resize};
use crate::imaging::{BackendError, ForegroundSegmenter, Quality};
use crate::session::{Session, entry_name};
use crate::types::{OperationSelection, OutputFormat, Shape};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use thiserror::Error;

/// Batch-level failures. Nothing is processed when one of these is returned.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("batch contains no images")]
    EmptyBatch,
    #[error("output location unavailable: {}: {source}", .path.display())]
    OutputUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot write report: {0}")]
    Report(#[from] serde_json::Error),
}

/// Why a single image did not make it through the pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("cannot decode image: {0}")]
    Decode(String),
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("background removal failed: {0}")]
    ModelInference(String),
    #[error("cannot encode image: {0}")]
    Encode(String),
    #[error("cancelled before processing started")]
    Cancelled,
}

impl From<CodecError> for PipelineError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::Decode(msg) => PipelineError::Decode(msg),
            CodecError::UnsupportedFormat(msg) => PipelineError::UnsupportedFormat(msg),
            CodecError::Encode(msg) => PipelineError::Encode(msg),
        }
    }
}

impl From<BackendError> for PipelineError {
    fn from(e: BackendError) -> Self {
        PipelineError::ModelInference(e.to_string())
    }
}

/// Pipeline steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Decode,
    Resize,
    Shape,
    RemoveBackground,
    Encode,
    /// Never started because the batch was cancelled.
    Skipped,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Decode => "decode",
            Stage::Resize => "resize",
            Stage::Shape => "shape",
            Stage::RemoveBackground => "remove background",
            Stage::Encode => "encode",
            Stage::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{stage}: {error}")]
pub struct ImageFailure {
    pub stage: Stage,
    pub error: PipelineError,
}

impl ImageFailure {
    fn at(stage: Stage) -> impl FnOnce(PipelineError) -> ImageFailure {
        move |error| ImageFailure { stage, error }
    }
}

/// One uploaded file.
#[derive(Debug, Clone)]
pub struct BatchInput {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl BatchInput {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// Everything that applies to every image of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOptions {
    pub selection: OperationSelection,
    pub format: OutputFormat,
    pub quality: Quality,
}

/// A successfully transformed image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    /// Archive entry name, `<stem>.<ext>`.
    pub entry_name: String,
    /// Detected input format, e.g. `"PNG"`.
    pub source_format: &'static str,
    pub original_size: (u32, u32),
    /// Steps that actually ran, in order.
    pub applied: Vec<Stage>,
    pub encoded: EncodedImage,
}

impl ProcessedImage {
    pub fn output_size(&self) -> (u32, u32) {
        (self.encoded.width, self.encoded.height)
    }
}

/// Result slot for one input filename.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub filename: String,
    pub outcome: Result<ProcessedImage, ImageFailure>,
}

/// Per-image outcomes, in the order the inputs were supplied.
///
/// There is one entry per input, including inputs that share a filename.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    entries: Vec<BatchEntry>,
}

impl BatchResult {
    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    /// Outcome for `filename`. With repeated filenames this is the first
    /// one; use [`entries`](Self::entries) to see them all.
    pub fn get(&self, filename: &str) -> Option<&Result<ProcessedImage, ImageFailure>> {
        self.entries
            .iter()
            .find(|e| e.filename == filename)
            .map(|e| &e.outcome)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn successes(&self) -> impl Iterator<Item = (&str, &ProcessedImage)> {
        self.entries
            .iter()
            .filter_map(|e| e.outcome.as_ref().ok().map(|img| (e.filename.as_str(), img)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &ImageFailure)> {
        self.entries
            .iter()
            .filter_map(|e| e.outcome.as_ref().err().map(|f| (e.filename.as_str(), f)))
    }

    pub fn succeeded_count(&self) -> usize {
        self.successes().count()
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    /// Serializable summary, one row per input.
    pub fn report(&self) -> Vec<ReportEntry> {
        self.entries
            .iter()
            .map(|e| match &e.outcome {
                Ok(img) => ReportEntry {
                    filename: e.filename.clone(),
                    status: "ok",
                    entry_name: Some(img.entry_name.clone()),
                    source_format: Some(img.source_format),
                    original_size: Some(img.original_size),
                    output_size: Some(img.output_size()),
                    stage: None,
                    error: None,
                },
                Err(failure) => ReportEntry {
                    filename: e.filename.clone(),
                    status: "failed",
                    entry_name: None,
                    source_format: None,
                    original_size: None,
                    output_size: None,
                    stage: Some(failure.stage),
                    error: Some(failure.error.to_string()),
                },
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct ReportEntry {
    pub filename: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_format: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_size: Option<(u32, u32)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_size: Option<(u32, u32)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Progress events for the CLI printer. `index` is 1-based input position.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    BatchStarted {
        image_count: usize,
        options: BatchOptions,
    },
    ImageProcessed {
        index: usize,
        filename: String,
        source_format: &'static str,
        original_size: (u32, u32),
        output_size: (u32, u32),
        entry_name: String,
    },
    ImageFailed {
        index: usize,
        filename: String,
        failure: ImageFailure,
    },
}

/// Run one image through the selected steps.
pub fn transform_image(
    filename: &str,
    bytes: &[u8],
    options: &BatchOptions,
    segmenter: Option<&dyn ForegroundSegmenter>,
) -> Result<ProcessedImage, ImageFailure> {
    let selection = &options.selection;
    let mut applied = vec![Stage::Decode];

    let decoded = codec::decode(bytes)
        .map_err(PipelineError::from)
        .map_err(ImageFailure::at(Stage::Decode))?;
    let source_format = format_name(decoded.format);
    let mut image = decoded.image;
    let original_size = (image.width(), image.height());
    log::debug!(
        "{filename}: decoded {source_format} {}x{}",
        original_size.0,
        original_size.1
    );

    if let Some(target) = selection.resize {
        let before = (image.width(), image.height());
        image = resize(image, target);
        if (image.width(), image.height()) != before {
            applied.push(Stage::Resize);
            log::debug!("{filename}: resize {target} -> {}x{}", image.width(), image.height());
        } else {
            log::debug!("{filename}: resize {target} skipped, not a downscale");
        }
    }

    if selection.shape != Shape::None {
        image = apply_shape(image, selection.shape);
        applied.push(Stage::Shape);
        log::debug!(
            "{filename}: {} -> {}x{}",
            selection.shape,
            image.width(),
            image.height()
        );
    }

    if selection.remove_background {
        let segmenter = segmenter.ok_or_else(|| ImageFailure {
            stage: Stage::RemoveBackground,
            error: PipelineError::ModelInference("no segmentation model configured".into()),
        })?;
        image = remove_background(&image, segmenter)
            .map_err(PipelineError::from)
            .map_err(ImageFailure::at(Stage::RemoveBackground))?;
        applied.push(Stage::RemoveBackground);
        log::debug!("{filename}: background removed");
    }

    let encoded = codec::encode(&image, options.format, options.quality)
        .map_err(PipelineError::from)
        .map_err(ImageFailure::at(Stage::Encode))?;
    applied.push(Stage::Encode);

    Ok(ProcessedImage {
        entry_name: entry_name(filename, encoded.extension),
        source_format,
        original_size,
        applied,
        encoded,
    })
}

/// Process a whole batch.
///
/// `segmenter` is only consulted when background removal is selected; pass
/// `None` otherwise. Per-image problems land in the returned [`BatchResult`];
/// `Err` is reserved for batch-level failures.
pub fn process_batch(
    session: &Session,
    inputs: &[BatchInput],
    options: &BatchOptions,
    segmenter: Option<&dyn ForegroundSegmenter>,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<BatchResult, ProcessError> {
    if inputs.is_empty() {
        return Err(ProcessError::EmptyBatch);
    }
    session.ensure_writable()?;

    log::info!(
        "Processing {} images ({:?}, {})",
        inputs.len(),
        options.selection,
        options.format
    );
    if let Some(tx) = &progress {
        tx.send(ProcessEvent::BatchStarted {
            image_count: inputs.len(),
            options: *options,
        })
        .ok();
    }

    let cancel = session.cancel_token();
    let entries: Vec<BatchEntry> = inputs
        .par_iter()
        .enumerate()
        .map(|(i, input)| {
            let outcome = if cancel.is_cancelled() {
                Err(ImageFailure {
                    stage: Stage::Skipped,
                    error: PipelineError::Cancelled,
                })
            } else {
                transform_image(&input.filename, &input.bytes, options, segmenter)
            };

            let event = match &outcome {
                Ok(img) => ProcessEvent::ImageProcessed {
                    index: i + 1,
                    filename: input.filename.clone(),
                    source_format: img.source_format,
                    original_size: img.original_size,
                    output_size: img.output_size(),
                    entry_name: img.entry_name.clone(),
                },
                Err(failure) => {
                    log::warn!("{}: {failure}", input.filename);
                    ProcessEvent::ImageFailed {
                        index: i + 1,
                        filename: input.filename.clone(),
                        failure: failure.clone(),
                    }
                }
            };
            if let Some(tx) = &progress {
                tx.send(event).ok();
            }

            BatchEntry {
                filename: input.filename.clone(),
                outcome,
            }
        })
        .collect();

    let result = BatchResult { entries };
    log::info!(
        "Batch finished: {} succeeded, {} failed",
        result.succeeded_count(),
        result.failed_count()
    );
    Ok(result)
}
