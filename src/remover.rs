//! The background removal capability and its startup resolution
//!
//! Everything above this module treats removal as one opaque call on raw
//! encoded bytes. [`resolve`] decides, once at startup, whether that call can
//! be made in this build and environment.

use crate::{
    config::{BackendType, RemovalConfig},
    error::{BgRemovalError, Result},
    models::{ModelLocation, ModelLocator},
};

/// Turns encoded image bytes into encoded image bytes with the background removed
pub trait BackgroundRemover {
    /// Remove the background from `image_bytes`
    ///
    /// # Errors
    /// - Input is not a supported image
    /// - Model loading, inference or encoding failures
    fn remove(&mut self, image_bytes: &[u8]) -> Result<Vec<u8>>;
}

/// Resolve the removal capability for `config`
///
/// This only checks that the requested backend is compiled in and that a model
/// file exists; the model itself is loaded on the first [`BackgroundRemover::remove`].
///
/// # Errors
/// - `Unavailable` when the backend feature is missing or no model can be found
/// - `InvalidConfig` when the model's preprocessing configuration is malformed
pub fn resolve(config: &RemovalConfig) -> Result<Box<dyn BackgroundRemover>> {
    let backend = config.backend_type;
    if !backend.is_compiled() {
        return Err(backend_unavailable(backend));
    }

    let location = ModelLocator::from_config(config).locate()?;
    tracing::debug!(
        backend = %backend,
        model = %location.model_file.display(),
        target_size = location.preprocessing.target_size,
        "Background removal capability resolved"
    );

    build_remover(config, location)
}

#[allow(unused_imports, unused_variables, unreachable_patterns)]
fn build_remover(
    config: &RemovalConfig,
    location: ModelLocation,
) -> Result<Box<dyn BackgroundRemover>> {
    use crate::processor::BackgroundRemovalProcessor;

    match config.backend_type {
        #[cfg(feature = "onnx")]
        BackendType::Onnx => Ok(Box::new(BackgroundRemovalProcessor::new(
            crate::backends::OnnxBackend::new(&location, config),
            location.preprocessing,
        ))),
        #[cfg(feature = "tract")]
        BackendType::Tract => Ok(Box::new(BackgroundRemovalProcessor::new(
            crate::backends::TractBackend::new(&location),
            location.preprocessing,
        ))),
        other => Err(backend_unavailable(other)),
    }
}

fn backend_unavailable(backend: BackendType) -> BgRemovalError {
    let compiled: Vec<&str> = [BackendType::Onnx, BackendType::Tract]
        .into_iter()
        .filter(|candidate| candidate.is_compiled())
        .map(BackendType::feature_name)
        .collect();

    let alternative = if compiled.is_empty() {
        String::new()
    } else {
        format!(
            ", or set {}={}",
            crate::config::ENV_BACKEND,
            compiled.join("|")
        )
    };

    BgRemovalError::unavailable(
        format!("{backend} inference backend"),
        format!(
            "cargo install bgremove --features {}{alternative}",
            backend.feature_name()
        ),
    )
}
