//! ONNX Runtime backend implementation for background removal models
//!
//! Runs the model through the `ort` crate with an execution provider chosen
//! from the configuration (CPU, CUDA, `CoreML`, or auto-detection).

use crate::config::{ExecutionProvider, RemovalConfig};
use crate::error::{BgRemovalError, Result};
use crate::inference::{array4_from_parts, InferenceBackend};
use crate::models::ModelLocation;
use ndarray::Array4;
use ort::execution_providers::{
    CUDAExecutionProvider, CoreMLExecutionProvider, ExecutionProvider as OrtExecutionProvider,
    ExecutionProviderDispatch,
};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// ONNX Runtime backend for running background removal models
#[derive(Debug)]
pub struct OnnxBackend {
    model_file: PathBuf,
    execution_provider: ExecutionProvider,
    intra_threads: usize,
    session: Option<Session>,
}

impl OnnxBackend {
    /// Create an uninitialized backend for the located model
    #[must_use]
    pub fn new(location: &ModelLocation, config: &RemovalConfig) -> Self {
        Self {
            model_file: location.model_file.clone(),
            execution_provider: config.execution_provider,
            intra_threads: config.intra_threads,
            session: None,
        }
    }

    /// Execution providers to register for the requested provider, in priority order
    ///
    /// An empty list means plain CPU execution.
    fn execution_providers(&self) -> Vec<ExecutionProviderDispatch> {
        let cuda_available = || {
            OrtExecutionProvider::is_available(&CUDAExecutionProvider::default()).unwrap_or(false)
        };
        let coreml_available = || {
            OrtExecutionProvider::is_available(&CoreMLExecutionProvider::default())
                .unwrap_or(false)
        };

        let mut providers = Vec::new();
        match self.execution_provider {
            ExecutionProvider::Auto => {
                if cuda_available() {
                    debug!("CUDA execution provider is available and will be used");
                    providers.push(CUDAExecutionProvider::default().build());
                }
                if coreml_available() {
                    debug!("CoreML execution provider is available and will be used");
                    providers.push(
                        CoreMLExecutionProvider::default()
                            .with_subgraphs(true)
                            .build(),
                    );
                }
                if providers.is_empty() {
                    debug!("No hardware acceleration available, using CPU");
                }
            },
            ExecutionProvider::Cpu => {
                debug!("Using CPU execution provider");
            },
            ExecutionProvider::Cuda => {
                if cuda_available() {
                    providers.push(CUDAExecutionProvider::default().build());
                } else {
                    warn!("CUDA execution provider requested but not available, falling back to CPU");
                }
            },
            ExecutionProvider::CoreMl => {
                if coreml_available() {
                    providers.push(
                        CoreMLExecutionProvider::default()
                            .with_subgraphs(true)
                            .build(),
                    );
                } else {
                    warn!(
                        "CoreML execution provider requested but not available, falling back to CPU"
                    );
                }
            },
        }
        providers
    }

    fn load_session(&self) -> Result<Session> {
        let intra_threads = if self.intra_threads > 0 {
            self.intra_threads
        } else {
            std::thread::available_parallelism()
                .map(std::num::NonZero::get)
                .unwrap_or(4)
        };

        let mut builder = Session::builder()
            .map_err(|e| {
                BgRemovalError::inference(format!("Failed to create session builder: {e}"))
            })?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| {
                BgRemovalError::inference(format!("Failed to set optimization level: {e}"))
            })?
            .with_intra_threads(intra_threads)
            .map_err(|e| BgRemovalError::inference(format!("Failed to set intra threads: {e}")))?;

        let providers = self.execution_providers();
        if !providers.is_empty() {
            builder = builder.with_execution_providers(providers).map_err(|e| {
                BgRemovalError::inference(format!(
                    "Failed to set {} execution provider: {e}",
                    self.execution_provider
                ))
            })?;
        }

        let session = builder.commit_from_file(&self.model_file).map_err(|e| {
            BgRemovalError::model(format!(
                "Failed to load ONNX model '{}': {e}",
                self.model_file.display()
            ))
        })?;

        debug!(
            provider = %self.execution_provider,
            intra_threads,
            "ONNX Runtime session created"
        );
        Ok(session)
    }
}

impl InferenceBackend for OnnxBackend {
    fn name(&self) -> &'static str {
        "onnx"
    }

    fn initialize(&mut self) -> Result<Option<Duration>> {
        if self.session.is_some() {
            return Ok(None);
        }

        let start = Instant::now();
        info!(model = %self.model_file.display(), "Loading ONNX model");
        self.session = Some(self.load_session()?);
        Ok(Some(start.elapsed()))
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| BgRemovalError::inference("ONNX session not initialized"))?;

        debug!(shape = ?input.dim(), "Starting ONNX inference");
        let start = Instant::now();

        let input_value = Value::from_array(input.clone()).map_err(|e| {
            BgRemovalError::processing(format!("Failed to convert input tensor: {e}"))
        })?;

        // Positional input and first output, so tensor names never matter
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| BgRemovalError::inference(format!("ONNX inference failed: {e}")))?;

        let (shape, data) = {
            let keys: Vec<_> = outputs.keys().collect();
            let first_key = keys
                .first()
                .ok_or_else(|| BgRemovalError::inference("No output tensors found"))?;
            let output_tensor = outputs
                .get(first_key)
                .ok_or_else(|| BgRemovalError::inference("First output tensor not found"))?
                .try_extract_array::<f32>()
                .map_err(|e| {
                    BgRemovalError::inference(format!("Failed to extract output tensor: {e}"))
                })?;
            (
                output_tensor.shape().to_vec(),
                output_tensor.iter().copied().collect::<Vec<f32>>(),
            )
        };

        debug!(
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "ONNX inference complete"
        );
        array4_from_parts(&shape, data)
    }

    fn is_initialized(&self) -> bool {
        self.session.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PreprocessingConfig;
    use std::fs;
    use tempfile::TempDir;

    fn location(model_file: PathBuf) -> ModelLocation {
        ModelLocation {
            model_file,
            preprocessing: PreprocessingConfig::default(),
        }
    }

    #[test]
    fn test_new_backend_is_uninitialized() {
        let backend = OnnxBackend::new(
            &location(PathBuf::from("model.onnx")),
            &RemovalConfig::default(),
        );
        assert!(!backend.is_initialized());
        assert_eq!(backend.name(), "onnx");
    }

    #[test]
    fn test_infer_before_initialize_fails() {
        let mut backend = OnnxBackend::new(
            &location(PathBuf::from("model.onnx")),
            &RemovalConfig::default(),
        );
        let input = Array4::<f32>::zeros((1, 3, 8, 8));
        assert!(backend.infer(&input).is_err());
    }

    #[test]
    fn test_invalid_model_file_fails_to_initialize() {
        let temp = TempDir::new().unwrap();
        let model = temp.path().join("broken.onnx");
        fs::write(&model, b"this is not a protobuf").unwrap();

        let config = RemovalConfig::builder()
            .execution_provider(ExecutionProvider::Cpu)
            .build();
        let mut backend = OnnxBackend::new(&location(model), &config);
        let err = backend.initialize().unwrap_err();
        assert!(err.to_string().contains("broken.onnx"));
        assert!(!backend.is_initialized());
    }
}
