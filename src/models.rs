//! Model location and preprocessing parameters
//!
//! Models are never downloaded by this crate. A model is either named
//! explicitly through `BGREMOVE_MODEL` or found in the cache directory using
//! the `HuggingFace` repository layout:
//!
//! ```text
//! <cache>/models/imgly--isnet-general-onnx/
//! ├── preprocessor_config.json
//! └── onnx/
//!     ├── model_fp16.onnx
//!     └── model.onnx
//! ```

use crate::config::{RemovalConfig, ENV_CACHE_DIR, ENV_MODEL};
use crate::error::{BgRemovalError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Repository of the default `ISNet` model
pub const DEFAULT_MODEL_URL: &str = "https://huggingface.co/imgly/isnet-general-onnx";

/// Cache-safe identifier of the default model
pub const DEFAULT_MODEL_ID: &str = "imgly--isnet-general-onnx";

const PREPROCESSOR_CONFIG_FILE: &str = "preprocessor_config.json";

/// Model files tried inside `onnx/`, in order of preference
const MODEL_FILE_CANDIDATES: [&str; 2] = ["model_fp16.onnx", "model.onnx"];

/// Input preprocessing parameters for a segmentation model
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessingConfig {
    /// Side of the square model input in pixels
    pub target_size: u32,
    /// Per-channel mean in 0..1 range
    pub normalization_mean: [f32; 3],
    /// Per-channel standard deviation in 0..1 range
    pub normalization_std: [f32; 3],
}

impl Default for PreprocessingConfig {
    /// `ISNet` defaults: 1024x1024, mean 128, std 256 (on the 0-255 scale)
    fn default() -> Self {
        Self {
            target_size: 1024,
            normalization_mean: [128.0 / 255.0; 3],
            normalization_std: [256.0 / 255.0; 3],
        }
    }
}

#[derive(Debug, Deserialize)]
struct HuggingFaceSize {
    height: u32,
    width: u32,
}

#[derive(Debug, Deserialize)]
struct HuggingFacePreprocessor {
    size: HuggingFaceSize,
    image_mean: [f32; 3],
    image_std: [f32; 3],
}

impl PreprocessingConfig {
    /// Parse a `HuggingFace` `preprocessor_config.json` (values on the 0-255 scale)
    ///
    /// # Errors
    /// - Malformed JSON or missing `size`, `image_mean`, `image_std`
    /// - Non-square or zero target size
    /// - Zero standard deviation
    pub fn from_huggingface_json(json: &str) -> Result<Self> {
        let raw: HuggingFacePreprocessor = serde_json::from_str(json).map_err(|e| {
            BgRemovalError::invalid_config(format!("Malformed preprocessor config: {e}"))
        })?;

        if raw.size.height != raw.size.width {
            return Err(BgRemovalError::invalid_config(format!(
                "Only square model inputs are supported, got {}x{}",
                raw.size.width, raw.size.height
            )));
        }
        if raw.size.width == 0 {
            return Err(BgRemovalError::invalid_config(
                "Model input size must be greater than zero",
            ));
        }
        if raw.image_std.iter().any(|std| *std == 0.0) {
            return Err(BgRemovalError::invalid_config(
                "image_std values must be non-zero",
            ));
        }

        Ok(Self {
            target_size: raw.size.width,
            normalization_mean: raw.image_mean.map(|v| v / 255.0),
            normalization_std: raw.image_std.map(|v| v / 255.0),
        })
    }
}

/// A model file ready to be loaded by a backend
#[derive(Debug, Clone, PartialEq)]
pub struct ModelLocation {
    /// Path of the `.onnx` file
    pub model_file: PathBuf,
    /// How inputs must be prepared for this model
    pub preprocessing: PreprocessingConfig,
}

/// Finds the model file for a configuration
#[derive(Debug, Clone)]
pub struct ModelLocator {
    explicit: Option<PathBuf>,
    models_dir: Option<PathBuf>,
}

impl ModelLocator {
    /// Create a locator from the run configuration
    #[must_use]
    pub fn from_config(config: &RemovalConfig) -> Self {
        let models_dir = config
            .cache_dir
            .clone()
            .or_else(default_cache_dir)
            .map(|root| root.join("models"));

        Self {
            explicit: config.model_path.clone(),
            models_dir,
        }
    }

    /// Resolve the model file and its preprocessing parameters
    ///
    /// # Errors
    /// - `Unavailable` when no model file exists at the configured or cached location
    /// - `InvalidConfig` when a `preprocessor_config.json` is present but malformed
    pub fn locate(&self) -> Result<ModelLocation> {
        if let Some(path) = &self.explicit {
            tracing::debug!(path = %path.display(), "Using model from {ENV_MODEL}");
            return Self::from_path(path)?.ok_or_else(|| {
                BgRemovalError::unavailable(
                    format!("ONNX model at {ENV_MODEL}={}", path.display()),
                    format!(
                        "point {ENV_MODEL} at an existing .onnx file or a model directory downloaded from {DEFAULT_MODEL_URL}"
                    ),
                )
            });
        }

        let Some(models_dir) = &self.models_dir else {
            return Err(BgRemovalError::unavailable(
                "ONNX model (no cache directory could be determined)",
                format!(
                    "set {ENV_MODEL} to a model downloaded from {DEFAULT_MODEL_URL}, or set {ENV_CACHE_DIR}"
                ),
            ));
        };

        let model_dir = models_dir.join(DEFAULT_MODEL_ID);
        tracing::debug!(path = %model_dir.display(), "Looking for cached model");
        Self::from_path(&model_dir)?.ok_or_else(|| {
            BgRemovalError::unavailable(
                format!("ONNX model (searched {})", model_dir.display()),
                format!(
                    "download the model repository from {DEFAULT_MODEL_URL} into {}, or set {ENV_MODEL}",
                    model_dir.display()
                ),
            )
        })
    }

    /// `Ok(None)` when nothing usable exists at `path`
    fn from_path(path: &Path) -> Result<Option<ModelLocation>> {
        if path.is_file() {
            // A bare model file may still sit inside a HuggingFace checkout (<repo>/onnx/model.onnx)
            let repo_root = path.parent().and_then(|parent| {
                if parent.file_name().is_some_and(|name| name == "onnx") {
                    parent.parent()
                } else {
                    Some(parent)
                }
            });
            let preprocessing = match repo_root {
                Some(root) => Self::read_preprocessing(root)?,
                None => PreprocessingConfig::default(),
            };
            return Ok(Some(ModelLocation {
                model_file: path.to_path_buf(),
                preprocessing,
            }));
        }

        if path.is_dir() {
            let onnx_dir = path.join("onnx");
            let candidates = MODEL_FILE_CANDIDATES
                .iter()
                .map(|name| onnx_dir.join(name))
                .chain(MODEL_FILE_CANDIDATES.iter().map(|name| path.join(name)));

            for candidate in candidates {
                if candidate.is_file() {
                    return Ok(Some(ModelLocation {
                        model_file: candidate,
                        preprocessing: Self::read_preprocessing(path)?,
                    }));
                }
            }
        }

        Ok(None)
    }

    fn read_preprocessing(model_dir: &Path) -> Result<PreprocessingConfig> {
        let config_path = model_dir.join(PREPROCESSOR_CONFIG_FILE);
        if !config_path.is_file() {
            return Ok(PreprocessingConfig::default());
        }

        let json = fs::read_to_string(&config_path)?;
        PreprocessingConfig::from_huggingface_json(&json).map_err(|e| {
            BgRemovalError::invalid_config(format!("{}: {e}", config_path.display()))
        })
    }
}

/// Platform cache root for this tool (`~/.cache/bgremove` on Linux)
#[must_use]
pub fn default_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("bgremove"))
}
