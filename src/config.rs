//! Configuration types for background removal operations
//!
//! The command-line surface takes no flags, so everything tunable is read from
//! environment variables. [`RemovalConfig::from_lookup`] does the actual parsing
//! against any key lookup, which keeps tests away from the process environment.

use crate::error::{BgRemovalError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Explicit model file or `HuggingFace` model directory
pub const ENV_MODEL: &str = "BGREMOVE_MODEL";
/// Root of the model cache
pub const ENV_CACHE_DIR: &str = "BGREMOVE_CACHE_DIR";
/// Inference backend (`onnx`, `tract`)
pub const ENV_BACKEND: &str = "BGREMOVE_BACKEND";
/// ONNX Runtime execution provider (`auto`, `cpu`, `cuda`, `coreml`)
pub const ENV_EXECUTION_PROVIDER: &str = "BGREMOVE_EXECUTION_PROVIDER";
/// Intra-op thread count, 0 = auto
pub const ENV_THREADS: &str = "BGREMOVE_THREADS";

/// Inference backend used to run the segmentation model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// ONNX Runtime (native library, GPU capable)
    Onnx,
    /// Tract (pure Rust, CPU only)
    Tract,
}

impl BackendType {
    /// Cargo feature that compiles this backend in
    #[must_use]
    pub fn feature_name(self) -> &'static str {
        match self {
            Self::Onnx => "onnx",
            Self::Tract => "tract",
        }
    }

    /// Whether this backend is part of the current build
    #[must_use]
    pub fn is_compiled(self) -> bool {
        match self {
            Self::Onnx => cfg!(feature = "onnx"),
            Self::Tract => cfg!(feature = "tract"),
        }
    }
}

impl Default for BackendType {
    fn default() -> Self {
        // Prefer ONNX Runtime; fall back to Tract when it is the only backend built
        if cfg!(not(feature = "onnx")) && cfg!(feature = "tract") {
            Self::Tract
        } else {
            Self::Onnx
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.feature_name())
    }
}

impl FromStr for BackendType {
    type Err = BgRemovalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "onnx" => Ok(Self::Onnx),
            "tract" => Ok(Self::Tract),
            _ => Err(BgRemovalError::config_value_error(
                ENV_BACKEND,
                s,
                "one of: onnx, tract",
            )),
        }
    }
}

/// Execution provider options for ONNX Runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionProvider {
    /// Auto-detect best available provider (CUDA > `CoreML` > CPU)
    #[default]
    Auto,
    /// CPU execution (always available)
    Cpu,
    /// NVIDIA CUDA GPU acceleration
    Cuda,
    /// Apple Silicon acceleration
    CoreMl,
}

impl std::fmt::Display for ExecutionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda => write!(f, "cuda"),
            Self::CoreMl => write!(f, "coreml"),
        }
    }
}

impl FromStr for ExecutionProvider {
    type Err = BgRemovalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda),
            "coreml" => Ok(Self::CoreMl),
            _ => Err(BgRemovalError::config_value_error(
                ENV_EXECUTION_PROVIDER,
                s,
                "one of: auto, cpu, cuda, coreml",
            )),
        }
    }
}

/// Configuration for a background removal run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemovalConfig {
    /// Backend that runs the model
    pub backend_type: BackendType,
    /// Execution provider (ONNX Runtime only)
    pub execution_provider: ExecutionProvider,
    /// Intra-op threads (0 = available parallelism)
    pub intra_threads: usize,
    /// Explicit model file or model directory, bypassing the cache lookup
    pub model_path: Option<PathBuf>,
    /// Cache root override
    pub cache_dir: Option<PathBuf>,
}

impl RemovalConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> RemovalConfigBuilder {
        RemovalConfigBuilder::default()
    }

    /// Build the configuration from the process environment
    ///
    /// # Errors
    /// - A `BGREMOVE_*` variable holds a value that cannot be parsed
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    ///
    /// Unset and empty values both mean "use the default".
    ///
    /// # Errors
    /// - A variable holds a value that cannot be parsed
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut builder = Self::builder();

        if let Some(value) = get(ENV_BACKEND) {
            builder = builder.backend_type(value.parse()?);
        }
        if let Some(value) = get(ENV_EXECUTION_PROVIDER) {
            builder = builder.execution_provider(value.parse()?);
        }
        if let Some(value) = get(ENV_THREADS) {
            let threads = value.trim().parse::<usize>().map_err(|_| {
                BgRemovalError::config_value_error(ENV_THREADS, &value, "a non-negative integer")
            })?;
            builder = builder.intra_threads(threads);
        }
        if let Some(value) = get(ENV_MODEL) {
            builder = builder.model_path(value);
        }
        if let Some(value) = get(ENV_CACHE_DIR) {
            builder = builder.cache_dir(value);
        }

        let config = builder.build();
        tracing::debug!(
            backend = %config.backend_type,
            provider = %config.execution_provider,
            threads = config.intra_threads,
            "Configuration loaded"
        );
        Ok(config)
    }
}

/// Builder for [`RemovalConfig`]
#[derive(Debug, Default)]
pub struct RemovalConfigBuilder {
    config: RemovalConfig,
}

impl RemovalConfigBuilder {
    #[must_use]
    pub fn backend_type(mut self, backend_type: BackendType) -> Self {
        self.config.backend_type = backend_type;
        self
    }

    #[must_use]
    pub fn execution_provider(mut self, provider: ExecutionProvider) -> Self {
        self.config.execution_provider = provider;
        self
    }

    #[must_use]
    pub fn intra_threads(mut self, threads: usize) -> Self {
        self.config.intra_threads = threads;
        self
    }

    #[must_use]
    pub fn model_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.model_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn cache_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.cache_dir = Some(path.into());
        self
    }

    #[must_use]
    pub fn build(self) -> RemovalConfig {
        self.config
    }
}
