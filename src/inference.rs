//! Inference backend abstraction

use crate::error::Result;
use ndarray::Array4;
use std::time::Duration;

/// Trait for inference backends
pub trait InferenceBackend {
    /// Short backend name for diagnostics
    fn name(&self) -> &'static str;

    /// Load the model
    ///
    /// Returns the load time on the first call and `None` once initialized.
    ///
    /// # Errors
    /// - Model file unreadable or not a valid ONNX graph
    /// - Runtime or execution provider setup failures
    fn initialize(&mut self) -> Result<Option<Duration>>;

    /// Run inference on a `(1, 3, H, W)` input, returning the `(1, 1, H, W)` mask tensor
    ///
    /// # Errors
    /// - Backend not initialized
    /// - Model inference failures
    /// - Output is not a 4D tensor
    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>>;

    /// Check if backend is initialized
    fn is_initialized(&self) -> bool;
}

/// Rebuild a 4D array from a flat buffer and a dynamic shape
///
/// # Errors
/// - The shape does not have exactly four dimensions or does not match the data length
pub(crate) fn array4_from_parts(shape: &[usize], data: Vec<f32>) -> Result<Array4<f32>> {
    let &[n, c, h, w] = shape else {
        return Err(crate::error::BgRemovalError::inference(format!(
            "Expected 4D output tensor, got {}D",
            shape.len()
        )));
    };

    Array4::from_shape_vec((n, c, h, w), data).map_err(|e| {
        crate::error::BgRemovalError::inference(format!("Failed to reshape output tensor: {e}"))
    })
}
