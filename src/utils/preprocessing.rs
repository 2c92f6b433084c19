//! Image preprocessing for model inference
//!
//! The model sees a letterboxed copy of the input: resized to fit the square
//! target while keeping the aspect ratio, then centred on a padded canvas.
//! [`Letterbox`] records that geometry so the mask can be mapped back.

use crate::{
    error::{BgRemovalError, Result},
    models::PreprocessingConfig,
};
use image::{DynamicImage, ImageBuffer, RgbImage};
use ndarray::Array4;

/// Padding colour around the resized image (white)
const PADDING_COLOR: [u8; 3] = [255, 255, 255];

/// Geometry of an aspect-preserving fit into a square canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Scale factor from original to resized coordinates
    pub scale: f32,
    /// Resized width
    pub width: u32,
    /// Resized height
    pub height: u32,
    /// Horizontal offset of the resized image on the canvas
    pub offset_x: u32,
    /// Vertical offset of the resized image on the canvas
    pub offset_y: u32,
    /// Canvas side
    pub target_size: u32,
}

impl Letterbox {
    /// Compute the letterbox of an image with `dimensions` (width, height) in a `target_size` square
    ///
    /// # Errors
    /// - Zero-sized image or target
    pub fn fit(dimensions: (u32, u32), target_size: u32) -> Result<Self> {
        let (orig_width, orig_height) = dimensions;
        if orig_width == 0 || orig_height == 0 {
            return Err(BgRemovalError::processing(format!(
                "Cannot preprocess an empty image ({orig_width}x{orig_height})"
            )));
        }
        if target_size == 0 {
            return Err(BgRemovalError::processing("Target size must be non-zero"));
        }

        let target = target_size as f32;
        let scale = (target / orig_width as f32).min(target / orig_height as f32);

        // Rounding can never push a side past the canvas, but clamp anyway so offsets stay unsigned
        let width = ((orig_width as f32 * scale).round() as u32).clamp(1, target_size);
        let height = ((orig_height as f32 * scale).round() as u32).clamp(1, target_size);

        Ok(Self {
            scale,
            width,
            height,
            offset_x: (target_size - width) / 2,
            offset_y: (target_size - height) / 2,
            target_size,
        })
    }

    /// Map an original-image coordinate onto the canvas
    #[must_use]
    pub fn to_canvas(&self, x: u32, y: u32) -> (u32, u32) {
        let scaled_x = ((x as f32 * self.scale).round() as u32).min(self.width - 1);
        let scaled_y = ((y as f32 * self.scale).round() as u32).min(self.height - 1);
        (scaled_x + self.offset_x, scaled_y + self.offset_y)
    }
}

/// Converts decoded images into normalized NCHW tensors
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Preprocess an image for inference
    ///
    /// Handles RGB conversion, aspect-ratio preserving resize, centre padding
    /// and normalization into a `(1, 3, size, size)` tensor.
    ///
    /// # Errors
    /// - Zero-sized image or target size
    pub fn preprocess(
        image: &DynamicImage,
        config: &PreprocessingConfig,
    ) -> Result<(Letterbox, Array4<f32>)> {
        let rgb_image = image.to_rgb8();
        let letterbox = Letterbox::fit(rgb_image.dimensions(), config.target_size)?;

        let resized = image::imageops::resize(
            &rgb_image,
            letterbox.width,
            letterbox.height,
            image::imageops::FilterType::Triangle,
        );

        let mut canvas = ImageBuffer::from_pixel(
            letterbox.target_size,
            letterbox.target_size,
            image::Rgb(PADDING_COLOR),
        );
        image::imageops::replace(
            &mut canvas,
            &resized,
            i64::from(letterbox.offset_x),
            i64::from(letterbox.offset_y),
        );

        tracing::trace!(
            width = letterbox.width,
            height = letterbox.height,
            offset_x = letterbox.offset_x,
            offset_y = letterbox.offset_y,
            "Letterboxed input"
        );

        Ok((letterbox, Self::canvas_to_tensor(&canvas, config)))
    }

    /// Convert canvas to normalized tensor
    fn canvas_to_tensor(canvas: &RgbImage, config: &PreprocessingConfig) -> Array4<f32> {
        let (width, height) = canvas.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

        for (x, y, pixel) in canvas.enumerate_pixels() {
            for channel in 0..3 {
                let value = (f32::from(pixel.0[channel]) / 255.0
                    - config.normalization_mean[channel])
                    / config.normalization_std[channel];
                if let Some(slot) = tensor.get_mut([0, channel, y as usize, x as usize]) {
                    *slot = value;
                }
            }
        }

        tensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn config(target_size: u32) -> PreprocessingConfig {
        PreprocessingConfig {
            target_size,
            normalization_mean: [0.0; 3],
            normalization_std: [1.0; 3],
        }
    }

    #[test]
    fn test_letterbox_landscape() {
        let letterbox = Letterbox::fit((200, 100), 100).unwrap();
        assert_eq!(letterbox.width, 100);
        assert_eq!(letterbox.height, 50);
        assert_eq!(letterbox.offset_x, 0);
        assert_eq!(letterbox.offset_y, 25);
        assert!((letterbox.scale - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_letterbox_upscales_small_images() {
        let letterbox = Letterbox::fit((10, 20), 100).unwrap();
        assert_eq!(letterbox.height, 100);
        assert_eq!(letterbox.width, 50);
        assert_eq!(letterbox.offset_x, 25);
        assert_eq!(letterbox.offset_y, 0);
    }

    #[test]
    fn test_letterbox_rejects_empty() {
        assert!(Letterbox::fit((0, 10), 100).is_err());
        assert!(Letterbox::fit((10, 10), 0).is_err());
    }

    #[test]
    fn test_to_canvas_stays_inside_resized_region() {
        let letterbox = Letterbox::fit((200, 100), 100).unwrap();
        assert_eq!(letterbox.to_canvas(0, 0), (0, 25));
        let (x, y) = letterbox.to_canvas(199, 99);
        assert!(x < 100);
        assert!((25..75).contains(&y));
    }

    #[test]
    fn test_preprocess_shape_and_padding() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 20, Rgb([0, 0, 0])));
        let (letterbox, tensor) = ImagePreprocessor::preprocess(&image, &config(20)).unwrap();

        assert_eq!(tensor.shape(), &[1, 3, 20, 20]);
        assert_eq!(letterbox.offset_y, 5);
        // Padding rows are white, image rows are black
        assert!((tensor[[0, 0, 0, 10]] - 1.0).abs() < 1e-6);
        assert!(tensor[[0, 0, 10, 10]].abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_normalization() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([255, 128, 0])));
        let (_, tensor) =
            ImagePreprocessor::preprocess(&image, &PreprocessingConfig {
                target_size: 8,
                ..PreprocessingConfig::default()
            })
            .unwrap();

        let mean = 128.0 / 255.0;
        let std = 256.0 / 255.0;
        let expected_r = (1.0 - mean) / std;
        let expected_b = (0.0 - mean) / std;
        assert!((tensor[[0, 0, 4, 4]] - expected_r).abs() < 1e-5);
        assert!((tensor[[0, 2, 4, 4]] - expected_b).abs() < 1e-5);
    }
}
