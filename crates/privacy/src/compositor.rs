use crate::errors::MaskError;
use common::span_debug;
use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image, ImageRef},
};
use image::{RgbImage, imageops};
use inference::Mask;

/// Kernel width the background blur is sized from.
pub const BLUR_KERNEL_SIZE: u32 = 99;

/// Resized mask scores strictly above this are foreground.
pub const MASK_THRESHOLD: f32 = 0.5;

/// Gaussian sigma for a kernel of the given width, as OpenCV derives it when sigma is 0.
pub fn blur_sigma(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Blends one image with a blurred copy of itself under instance masks.
///
/// The blurred copy is computed once on construction and shared by every
/// call to [`Compositor::composite`], so one value serves all detections of an image.
pub struct Compositor<'a> {
    image: &'a RgbImage,
    blurred: RgbImage,
}

impl<'a> Compositor<'a> {
    pub fn new(image: &'a RgbImage) -> Self {
        let _s = span_debug!("blur_background");
        let blurred = if image.width() == 0 || image.height() == 0 {
            image.clone()
        } else {
            imageops::blur(image, blur_sigma(BLUR_KERNEL_SIZE))
        };
        Self { image, blurred }
    }

    pub fn blurred(&self) -> &RgbImage {
        &self.blurred
    }

    /// Keeps pixels under the thresholded mask sharp and takes every other
    /// pixel from the blurred copy. The result has the source dimensions.
    pub fn composite(&self, mask: &Mask) -> Result<RgbImage, MaskError> {
        let _s = span_debug!("composite_mask");

        let (width, height) = self.image.dimensions();
        if width == 0 || height == 0 {
            return Err(MaskError::EmptyImage { width, height });
        }

        let scores = resize_mask(mask, width, height)?;

        let mut output = self.blurred.clone();
        for ((dst, src), score) in output
            .pixels_mut()
            .zip(self.image.pixels())
            .zip(scores.iter())
        {
            if *score > MASK_THRESHOLD {
                *dst = *src;
            }
        }

        Ok(output)
    }
}

/// One-shot composite of `image` under `mask`.
pub fn composite(image: &RgbImage, mask: &Mask) -> Result<RgbImage, MaskError> {
    Compositor::new(image).composite(mask)
}

/// Bilinear resample of `mask` to `width` x `height`, row-major.
fn resize_mask(mask: &Mask, width: u32, height: u32) -> Result<Vec<f32>, MaskError> {
    let (rows, cols) = mask.dim();
    if rows == 0 || cols == 0 {
        return Err(MaskError::EmptyMask { rows, cols });
    }
    if mask.iter().any(|score| !score.is_finite()) {
        return Err(MaskError::NonFiniteScores);
    }

    let scores: Vec<f32> = mask.iter().copied().collect();
    if (rows, cols) == (height as usize, width as usize) {
        return Ok(scores);
    }

    let src = ImageRef::new(
        cols as u32,
        rows as u32,
        bytemuck::cast_slice(&scores),
        PixelType::F32,
    )?;
    let mut dst = Image::new(width, height, PixelType::F32);

    Resizer::new().resize(
        &src,
        &mut dst,
        &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
    )?;

    Ok(bytemuck::allocation::pod_collect_to_vec(dst.buffer()))
}
