//! Core types for background removal operations

use crate::error::{BgRemovalError, Result};
use crate::utils::Letterbox;
use image::{ImageBuffer, Rgba, RgbaImage};
use ndarray::Array4;

/// Foreground probability per pixel of the original image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMask {
    /// Mask data as grayscale values (0-255), row-major
    pub data: Vec<u8>,

    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl SegmentationMask {
    /// Create a new segmentation mask
    #[must_use]
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Self {
        Self { data, dimensions }
    }

    /// Map a `(1, 1, H, W)` model output back onto the original image
    ///
    /// Each original pixel samples the tensor at its letterboxed position.
    /// Values are clamped to 0..1 and scaled to 0..255.
    ///
    /// # Errors
    /// - Tensor is not `(1, 1, target, target)` for the given letterbox
    pub fn from_tensor(
        tensor: &Array4<f32>,
        original_dimensions: (u32, u32),
        letterbox: &Letterbox,
    ) -> Result<Self> {
        let shape = tensor.shape();
        let target = letterbox.target_size as usize;
        if shape != [1, 1, target, target] {
            return Err(BgRemovalError::processing(format!(
                "Invalid output tensor shape {shape:?}, expected [1, 1, {target}, {target}]"
            )));
        }

        let (width, height) = original_dimensions;
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                let (tx, ty) = letterbox.to_canvas(x, y);
                let value = tensor
                    .get([0, 0, ty as usize, tx as usize])
                    .copied()
                    .unwrap_or(0.0);
                data.push((value.clamp(0.0, 1.0) * 255.0).round() as u8);
            }
        }

        Ok(Self::new(data, original_dimensions))
    }

    /// Compose an RGBA image using this mask as the alpha channel
    ///
    /// Fully transparent pixels are zeroed so no background colour leaks
    /// into the encoded output.
    ///
    /// # Errors
    /// - Image and mask dimensions differ
    pub fn apply_to_image(&self, image: &RgbaImage) -> Result<RgbaImage> {
        if image.dimensions() != self.dimensions {
            return Err(BgRemovalError::processing(format!(
                "Image dimensions {:?} do not match mask dimensions {:?}",
                image.dimensions(),
                self.dimensions
            )));
        }

        let (width, height) = self.dimensions;
        let mut result = ImageBuffer::new(width, height);
        for ((target, source), alpha) in result
            .pixels_mut()
            .zip(image.pixels())
            .zip(self.data.iter().copied())
        {
            *target = if alpha > 0 {
                Rgba([source[0], source[1], source[2], alpha])
            } else {
                Rgba([0, 0, 0, 0])
            };
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tensor_inverts_letterbox() {
        // 4x2 image in a 4x4 canvas: rows 1..3 hold the image
        let letterbox = Letterbox::fit((4, 2), 4).unwrap();
        let mut tensor = Array4::<f32>::zeros((1, 1, 4, 4));
        for x in 0..4 {
            tensor[[0, 0, 1, x]] = 1.0;
            tensor[[0, 0, 2, x]] = 0.5;
        }
        // Padding rows must never be sampled
        tensor[[0, 0, 0, 0]] = 0.25;

        let mask = SegmentationMask::from_tensor(&tensor, (4, 2), &letterbox).unwrap();
        assert_eq!(mask.dimensions, (4, 2));
        assert_eq!(&mask.data[..4], &[255, 255, 255, 255]);
        assert_eq!(&mask.data[4..], &[128, 128, 128, 128]);
    }

    #[test]
    fn test_from_tensor_clamps_values() {
        let letterbox = Letterbox::fit((2, 2), 2).unwrap();
        let tensor = Array4::from_shape_vec((1, 1, 2, 2), vec![-1.0, 2.0, 0.0, 1.0]).unwrap();

        let mask = SegmentationMask::from_tensor(&tensor, (2, 2), &letterbox).unwrap();
        assert_eq!(mask.data, vec![0, 255, 0, 255]);
    }

    #[test]
    fn test_from_tensor_rejects_wrong_shape() {
        let letterbox = Letterbox::fit((2, 2), 2).unwrap();
        let tensor = Array4::<f32>::zeros((1, 3, 2, 2));
        assert!(SegmentationMask::from_tensor(&tensor, (2, 2), &letterbox).is_err());
    }

    #[test]
    fn test_apply_to_image() {
        let image = RgbaImage::from_pixel(2, 1, Rgba([10, 20, 30, 255]));
        let mask = SegmentationMask::new(vec![0, 200], (2, 1));

        let result = mask.apply_to_image(&image).unwrap();
        assert_eq!(result.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
        assert_eq!(result.get_pixel(1, 0), &Rgba([10, 20, 30, 200]));
    }

    #[test]
    fn test_apply_to_image_dimension_mismatch() {
        let image = RgbaImage::new(3, 3);
        let mask = SegmentationMask::new(vec![255; 4], (2, 2));
        assert!(mask.apply_to_image(&image).is_err());
    }
}
