#![allow(clippy::missing_errors_doc)]
#![allow(clippy::uninlined_format_args)]

//! # bgremove
//!
//! Remove the background of an image with an `ISNet` segmentation model.
//!
//! The crate exposes one capability, [`BackgroundRemover`]: encoded image bytes
//! in, encoded PNG bytes with a transparent background out. [`resolve`] picks an
//! implementation at startup from a [`RemovalConfig`], or reports why none is
//! available.
//!
//! ## Backends
//!
//! - **ONNX Runtime** (`onnx` feature, default): CPU, CUDA or `CoreML` execution
//! - **Tract** (`tract` feature): pure Rust, CPU only
//!
//! ## Example
//!
//! ```rust,no_run
//! use bgremove::{resolve, RemovalConfig};
//!
//! # fn example() -> bgremove::Result<()> {
//! let config = RemovalConfig::from_env()?;
//! let mut remover = resolve(&config)?;
//!
//! let input = std::fs::read("photo.jpg")?;
//! let output = remover.remove(&input)?;
//! std::fs::write("photo.png", output)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Model lookup
//!
//! `BGREMOVE_MODEL` names an `.onnx` file or a model directory. Otherwise the
//! model is read from `<cache>/models/imgly--isnet-general-onnx`, where `<cache>`
//! is `BGREMOVE_CACHE_DIR` or the platform cache directory joined with `bgremove`.

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod inference;
pub mod models;
pub mod processor;
pub mod remover;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;

#[cfg(feature = "onnx")]
pub use backends::OnnxBackend;
#[cfg(feature = "tract")]
pub use backends::TractBackend;
pub use config::{BackendType, ExecutionProvider, RemovalConfig, RemovalConfigBuilder};
pub use error::{BgRemovalError, Result};
pub use inference::InferenceBackend;
pub use models::{ModelLocation, ModelLocator, PreprocessingConfig};
pub use processor::BackgroundRemovalProcessor;
pub use remover::{resolve, BackgroundRemover};
pub use types::SegmentationMask;
#[cfg(feature = "cli")]
pub use tracing_config::TracingConfig;
