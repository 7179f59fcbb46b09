//! U²-Net foreground segmentation on ONNX Runtime.
//!
//! ## Lifecycle
//!
//! Loading the model is the expensive part, so [`U2NetBackend`] defers it to
//! the first [`segment`](ForegroundSegmenter::segment) call and keeps the
//! session for the backend's lifetime. Share one backend across a batch (and
//! across batches) behind an `Arc`; every clone of the `Arc` reuses the same
//! session.
//!
//! A load failure is cached too: every image that asks for background removal
//! gets the same inference error instead of retrying a broken model file for
//! each image.
//!
//! ## Concurrency
//!
//! `ort` sessions take `&mut self` to run, so the session sits behind a
//! `Mutex`. Inference is serialized; everything around it (tensor building,
//! matte resizing, compositing) runs in parallel on the calling workers.

use super::backend::{BackendError, ForegroundSegmenter};
use super::matte::{matte_to_mask, to_input_tensor};
use super::params::SegmentationParams;
use image::{GrayImage, RgbImage};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

pub struct U2NetBackend {
    model_path: PathBuf,
    params: SegmentationParams,
    session: OnceLock<Result<Mutex<Session>, String>>,
}

impl U2NetBackend {
    /// Create a backend for the model at `model_path`. Nothing is loaded yet.
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            params: SegmentationParams::default(),
            session: OnceLock::new(),
        }
    }

    pub fn with_params(mut self, params: SegmentationParams) -> Self {
        self.params = params;
        self
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// True once a session has been created successfully.
    pub fn is_loaded(&self) -> bool {
        matches!(self.session.get(), Some(Ok(_)))
    }

    fn load(&self) -> Result<Session, BackendError> {
        if !self.model_path.exists() {
            return Err(BackendError::ModelLoad(format!(
                "model file not found: {}",
                self.model_path.display()
            )));
        }
        log::info!("Loading segmentation model {}", self.model_path.display());

        Session::builder()
            .map_err(|e| BackendError::ModelLoad(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| BackendError::ModelLoad(e.to_string()))?
            .commit_from_file(&self.model_path)
            .map_err(|e| BackendError::ModelLoad(format!("{}: {e}", self.model_path.display())))
    }

    fn session(&self) -> Result<&Mutex<Session>, BackendError> {
        self.session
            .get_or_init(|| self.load().map(Mutex::new).map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|msg| BackendError::ModelLoad(msg.clone()))
    }

    /// Run the model and return the raw matte values with their size.
    fn infer(&self, image: &RgbImage) -> Result<(Vec<f32>, (u32, u32)), BackendError> {
        let input = Tensor::from_array(to_input_tensor(image, &self.params)?)?;

        let mut session = self
            .session()?
            .lock()
            .map_err(|_| BackendError::Inference("model session lock poisoned".into()))?;
        let outputs = session.run(ort::inputs![input])?;
        let matte = outputs[0].try_extract_array::<f32>()?;

        // U²-Net emits [1, 1, H, W]; the first output is the fused matte.
        let shape = matte.shape().to_vec();
        let (h, w) = match shape.as_slice() {
            [.., h, w] => (*h as u32, *w as u32),
            _ => {
                return Err(BackendError::Inference(format!(
                    "unexpected matte shape {shape:?}"
                )));
            }
        };
        let values: Vec<f32> = matte.iter().take(h as usize * w as usize).copied().collect();
        Ok((values, (w, h)))
    }
}

impl ForegroundSegmenter for U2NetBackend {
    fn segment(&self, image: &RgbImage) -> Result<GrayImage, BackendError> {
        let (matte, matte_size) = self.infer(image)?;
        matte_to_mask(&matte, matte_size, image.dimensions())
    }
}
