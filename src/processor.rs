//! Background removal pipeline over an inference backend
//!
//! decode → preprocess → infer → mask → compose → encode (PNG)

use crate::{
    error::{BgRemovalError, Result},
    inference::InferenceBackend,
    models::PreprocessingConfig,
    remover::BackgroundRemover,
    types::SegmentationMask,
    utils::ImagePreprocessor,
};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use std::time::Instant;
use tracing::{debug, info};

/// Runs a segmentation model over images and returns them with the background made transparent
pub struct BackgroundRemovalProcessor<B: InferenceBackend> {
    backend: B,
    preprocessing: PreprocessingConfig,
}

impl<B: InferenceBackend> BackgroundRemovalProcessor<B> {
    /// Create a processor; the backend is initialized lazily on first use
    #[must_use]
    pub fn new(backend: B, preprocessing: PreprocessingConfig) -> Self {
        Self {
            backend,
            preprocessing,
        }
    }

    /// Whether the backend has loaded its model
    pub fn is_initialized(&self) -> bool {
        self.backend.is_initialized()
    }

    /// Load the model if that has not happened yet
    ///
    /// # Errors
    /// - Backend initialization failures
    pub fn initialize(&mut self) -> Result<()> {
        if let Some(load_time) = self.backend.initialize()? {
            info!(
                backend = self.backend.name(),
                "Model loaded in {:.0}ms",
                load_time.as_secs_f64() * 1000.0
            );
        }
        Ok(())
    }

    /// Remove the background of a decoded image
    ///
    /// # Errors
    /// - Backend initialization or inference failures
    /// - Unexpected output tensor shape
    pub fn process_image(&mut self, image: &DynamicImage) -> Result<RgbaImage> {
        self.initialize()?;

        let dimensions = (image.width(), image.height());

        let start = Instant::now();
        let (letterbox, input) = ImagePreprocessor::preprocess(image, &self.preprocessing)?;
        let preprocess_time = start.elapsed();

        let start = Instant::now();
        let output = self.backend.infer(&input)?;
        let inference_time = start.elapsed();

        let start = Instant::now();
        let mask = SegmentationMask::from_tensor(&output, dimensions, &letterbox)?;
        let result = mask.apply_to_image(&image.to_rgba8())?;
        let postprocess_time = start.elapsed();

        debug!(
            width = dimensions.0,
            height = dimensions.1,
            preprocess_ms = preprocess_time.as_secs_f64() * 1000.0,
            inference_ms = inference_time.as_secs_f64() * 1000.0,
            postprocess_ms = postprocess_time.as_secs_f64() * 1000.0,
            "Processed image"
        );

        Ok(result)
    }

    /// Decode, process and re-encode as PNG
    ///
    /// # Errors
    /// - Bytes are not a decodable image
    /// - Any processing failure
    /// - PNG encoding failure
    pub fn process_bytes(&mut self, image_bytes: &[u8]) -> Result<Vec<u8>> {
        let image = image::load_from_memory(image_bytes).map_err(|e| {
            BgRemovalError::processing(format!("Failed to decode image from bytes: {e}"))
        })?;

        let result = self.process_image(&image)?;

        let mut encoded = Vec::new();
        DynamicImage::ImageRgba8(result).write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)?;
        debug!(bytes = encoded.len(), "Encoded PNG output");
        Ok(encoded)
    }
}

impl<B: InferenceBackend> BackgroundRemover for BackgroundRemovalProcessor<B> {
    fn remove(&mut self, image_bytes: &[u8]) -> Result<Vec<u8>> {
        self.process_bytes(image_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::test_utils::MockBackend;
    use image::{GenericImageView, Rgb, RgbImage};

    fn small_config() -> PreprocessingConfig {
        PreprocessingConfig {
            target_size: 32,
            ..PreprocessingConfig::default()
        }
    }

    /// Left half bright (foreground for the mock), right half dark
    fn half_bright_image() -> DynamicImage {
        let mut image = RgbImage::from_pixel(16, 8, Rgb([20, 20, 20]));
        for y in 0..8 {
            for x in 0..8 {
                image.put_pixel(x, y, Rgb([240, 100, 50]));
            }
        }
        DynamicImage::ImageRgb8(image)
    }

    fn encode_png(image: &DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_lazy_initialization() {
        let mut processor = BackgroundRemovalProcessor::new(MockBackend::new(), small_config());
        assert!(!processor.is_initialized());

        processor.process_image(&half_bright_image()).unwrap();
        assert!(processor.is_initialized());
    }

    #[test]
    fn test_process_image_applies_mask() {
        let mut processor = BackgroundRemovalProcessor::new(MockBackend::new(), small_config());
        let result = processor.process_image(&half_bright_image()).unwrap();

        assert_eq!(result.dimensions(), (16, 8));
        assert_eq!(result.get_pixel(2, 2).0, [240, 100, 50, 255]);
        assert_eq!(result.get_pixel(13, 5).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_remove_returns_png_with_alpha() {
        let mut processor = BackgroundRemovalProcessor::new(MockBackend::new(), small_config());
        let output = processor.remove(&encode_png(&half_bright_image())).unwrap();

        assert_eq!(image::guess_format(&output).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&output).unwrap();
        assert_eq!(decoded.dimensions(), (16, 8));
        assert!(decoded.color().has_alpha());
        assert_eq!(decoded.get_pixel(15, 7).0[3], 0);
    }

    #[test]
    fn test_backend_initialized_once() {
        let backend = MockBackend::new();
        let history = backend.call_history();
        let mut processor = BackgroundRemovalProcessor::new(backend, small_config());

        let bytes = encode_png(&half_bright_image());
        processor.remove(&bytes).unwrap();
        processor.remove(&bytes).unwrap();

        let calls = history.lock().unwrap().clone();
        assert_eq!(calls, ["initialize", "infer", "initialize", "infer"]);
        assert!(processor.is_initialized());
    }

    #[test]
    fn test_undecodable_bytes() {
        let mut processor = BackgroundRemovalProcessor::new(MockBackend::new(), small_config());
        let err = processor.remove(b"definitely not an image").unwrap_err();
        assert!(err.to_string().contains("Failed to decode image"));
    }

    #[test]
    fn test_backend_failures_propagate() {
        let bytes = encode_png(&half_bright_image());

        let mut processor =
            BackgroundRemovalProcessor::new(MockBackend::new_failing_init(), small_config());
        let err = processor.remove(&bytes).unwrap_err();
        assert!(matches!(err, BgRemovalError::Model(_)));

        let mut processor =
            BackgroundRemovalProcessor::new(MockBackend::new_failing_inference(), small_config());
        let err = processor.remove(&bytes).unwrap_err();
        assert!(matches!(err, BgRemovalError::Inference(_)));
    }
}
