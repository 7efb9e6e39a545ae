use crate::config::InferenceConfig;
use ndarray::{Array, IxDyn};

#[cfg(feature = "ort-backend")]
pub mod ort;

pub trait InferenceBackend {
    fn load_model(config: &InferenceConfig) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Run inference on a letterboxed `[1, 3, H, W]` tensor scaled to 0-1
    fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput>;
}

pub struct InferenceOutput {
    pub predictions: ndarray::ArrayD<f32>, // [1, 4 + num_classes, num_anchors] cxcywh in input pixels
}
