use crate::geometry::CropRegion;
use thiserror::Error;

/// Why a mask could not be applied to an image. Always recoverable: the
/// caller falls back to the unblurred image for that detection.
#[derive(Error, Debug)]
pub enum MaskError {
    #[error("Detection has no mask")]
    Missing,

    #[error("Mask is empty ({rows}x{cols})")]
    EmptyMask { rows: usize, cols: usize },

    #[error("Image is empty ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("Mask contains non-finite scores")]
    NonFiniteScores,

    #[error("Mask buffer error: {0}")]
    Buffer(#[from] fast_image_resize::ImageBufferError),

    #[error("Mask resize failed: {0}")]
    Resize(#[from] fast_image_resize::ResizeError),
}

#[derive(Error, Debug)]
pub enum CropError {
    #[error("Crop region {0:?} has zero area")]
    Degenerate(CropRegion),

    #[error("Crop buffer error: {0}")]
    Buffer(#[from] fast_image_resize::ImageBufferError),

    #[error("Crop resize failed: {0}")]
    Resize(#[from] fast_image_resize::ResizeError),
}
