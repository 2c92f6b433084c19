//! Mock backend for testing the processing pipeline
//!
//! Lets the processor and shell be exercised without model files or a
//! native inference runtime.

use crate::{
    error::{BgRemovalError, Result},
    inference::InferenceBackend,
};
use ndarray::Array4;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock backend that returns a mask marking everything above a brightness threshold as foreground
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    initialized: bool,
    call_history: Arc<Mutex<Vec<String>>>,
    should_fail_init: bool,
    should_fail_inference: bool,
}

impl MockBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock backend that will fail during initialization
    #[must_use]
    pub fn new_failing_init() -> Self {
        Self {
            should_fail_init: true,
            ..Self::default()
        }
    }

    /// Create a mock backend that will fail during inference
    #[must_use]
    pub fn new_failing_inference() -> Self {
        Self {
            should_fail_inference: true,
            ..Self::default()
        }
    }

    /// Shared handle to the call history; stays valid after the backend is moved
    #[must_use]
    pub fn call_history(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.call_history)
    }

    fn record_call(&self, method: &str) {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(method.to_string());
        }
    }
}

impl InferenceBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn initialize(&mut self) -> Result<Option<Duration>> {
        self.record_call("initialize");
        if self.should_fail_init {
            return Err(BgRemovalError::model("Mock initialization failure"));
        }
        if self.initialized {
            return Ok(None);
        }
        self.initialized = true;
        Ok(Some(Duration::from_millis(1)))
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        self.record_call("infer");
        if !self.initialized {
            return Err(BgRemovalError::inference("Backend not initialized"));
        }
        if self.should_fail_inference {
            return Err(BgRemovalError::inference("Mock inference failure"));
        }

        // Foreground where the red channel is above the normalized midpoint
        let (_, _, height, width) = input.dim();
        let mut output = Array4::<f32>::zeros((1, 1, height, width));
        for y in 0..height {
            for x in 0..width {
                output[[0, 0, y, x]] = if input[[0, 0, y, x]] > 0.0 { 1.0 } else { 0.0 };
            }
        }
        Ok(output)
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}
