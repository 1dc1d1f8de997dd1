use crate::{config::InferenceConfig, detection::Detection};
use image::RgbImage;

#[cfg(feature = "ort-backend")]
pub mod ort;

/// Detection + segmentation model.
///
/// Implementations return detections in model order, with box coordinates
/// already mapped back to the pixel space of `image`.
pub trait InferenceBackend {
    fn load_model(config: &InferenceConfig) -> anyhow::Result<Self>
    where
        Self: Sized;

    fn infer(&mut self, image: &RgbImage) -> anyhow::Result<Vec<Detection>>;
}
