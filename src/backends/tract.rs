//! Tract backend implementation for background removal models
//!
//! Pure Rust inference with no native runtime to install. CPU only.

use crate::error::{BgRemovalError, Result};
use crate::inference::{array4_from_parts, InferenceBackend};
use crate::models::ModelLocation;
use ndarray::Array4;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tract_onnx::prelude::*;

/// Type alias for the optimized, runnable Tract model
type TractModel = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Tract backend for running background removal models using pure Rust inference
#[derive(Debug)]
pub struct TractBackend {
    model_file: PathBuf,
    target_size: usize,
    model: Option<TractModel>,
}

impl TractBackend {
    /// Create an uninitialized backend for the located model
    #[must_use]
    pub fn new(location: &ModelLocation) -> Self {
        Self {
            model_file: location.model_file.clone(),
            target_size: location.preprocessing.target_size as usize,
            model: None,
        }
    }

    fn load_model(&self) -> Result<TractModel> {
        let size = self.target_size;
        onnx()
            .model_for_path(&self.model_file)
            .map_err(|e| {
                BgRemovalError::model(format!(
                    "Failed to load ONNX model '{}': {e}",
                    self.model_file.display()
                ))
            })?
            // Pin the input shape so the graph can be fully optimized
            .with_input_fact(0, f32::fact([1, 3, size, size]).into())
            .map_err(|e| BgRemovalError::model(format!("Failed to set input shape: {e}")))?
            .into_optimized()
            .map_err(|e| BgRemovalError::model(format!("Failed to optimize model: {e}")))?
            .into_runnable()
            .map_err(|e| BgRemovalError::model(format!("Failed to create runnable model: {e}")))
    }
}

impl InferenceBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn initialize(&mut self) -> Result<Option<Duration>> {
        if self.model.is_some() {
            return Ok(None);
        }

        let start = Instant::now();
        tracing::info!(model = %self.model_file.display(), "Loading ONNX model with Tract");
        self.model = Some(self.load_model()?);
        Ok(Some(start.elapsed()))
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| BgRemovalError::inference("Tract model not initialized"))?;

        tracing::debug!(shape = ?input.dim(), "Running Tract inference");
        let start = Instant::now();

        let standard = input.as_standard_layout();
        let data = standard
            .as_slice()
            .ok_or_else(|| BgRemovalError::processing("Input tensor is not contiguous"))?;
        let input_tensor = Tensor::from_shape(input.shape(), data).map_err(|e| {
            BgRemovalError::processing(format!("Failed to convert input tensor: {e}"))
        })?;

        let outputs = model
            .run(tvec![input_tensor.into()])
            .map_err(|e| BgRemovalError::inference(format!("Tract inference failed: {e}")))?;

        let output = outputs
            .first()
            .ok_or_else(|| BgRemovalError::inference("No output tensor found"))?;
        let values = output
            .as_slice::<f32>()
            .map_err(|e| {
                BgRemovalError::inference(format!("Failed to convert output tensor: {e}"))
            })?
            .to_vec();

        tracing::debug!(
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Tract inference complete"
        );
        array4_from_parts(output.shape(), values)
    }

    fn is_initialized(&self) -> bool {
        self.model.is_some()
    }
}
