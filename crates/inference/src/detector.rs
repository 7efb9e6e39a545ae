use crate::{
    annotate::Annotator,
    backend::{InferenceBackend, InferenceOutput},
    config::InferenceConfig,
    processing::{
        post::{Detection, PostProcessor},
        pre::PreProcessor,
    },
};
use anyhow::Context;
use common::span;
use image::{ImageReader, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};

pub struct DetectionOutput {
    pub detections: Vec<Detection>,
    /// Annotated copy of the input, `run_dir/<input file name>`.
    pub annotated_path: PathBuf,
}

/// Single-shot detection on an image file.
///
/// Implementations write an annotated copy of the image into `run_dir`
/// using the input's file name, so callers can derive the artifact path
/// from the request alone.
pub trait ObjectDetector: Send {
    fn detect(&mut self, image_path: &Path, run_dir: &Path) -> anyhow::Result<DetectionOutput>;
}

pub struct Detector<B: InferenceBackend> {
    backend: B,
    preprocessor: PreProcessor,
    postprocessor: PostProcessor,
    annotator: Annotator,
}

impl<B: InferenceBackend> Detector<B> {
    pub fn new(backend: B, config: &InferenceConfig) -> Self {
        Self {
            backend,
            preprocessor: PreProcessor::new(config.input_size),
            postprocessor: PostProcessor::new(
                config.confidence_threshold,
                config.iou_threshold,
                config.max_detections,
            ),
            annotator: Annotator,
        }
    }

    pub fn load(config: &InferenceConfig) -> anyhow::Result<Self> {
        let backend = B::load_model(config)?;
        Ok(Self::new(backend, config))
    }

    fn decode(image_path: &Path) -> anyhow::Result<RgbImage> {
        let image = ImageReader::open(image_path)
            .with_context(|| format!("failed to open {}", image_path.display()))?
            .with_guessed_format()?
            .decode()
            .with_context(|| format!("failed to decode {}", image_path.display()))?;
        Ok(image.to_rgb8())
    }
}

impl<B: InferenceBackend + Send> ObjectDetector for Detector<B> {
    #[tracing::instrument(skip(self), fields(detections))]
    fn detect(&mut self, image_path: &Path, run_dir: &Path) -> anyhow::Result<DetectionOutput> {
        let mut image = Self::decode(image_path)?;

        let (input, transform) = self.preprocessor.preprocess(&image)?;

        let InferenceOutput { predictions } = {
            let _s = span!("model_inference");
            self.backend.infer(&input)?
        };

        let detections = self
            .postprocessor
            .parse_detections(&predictions.view(), &transform)?;
        tracing::Span::current().record("detections", detections.len());

        self.annotator.annotate(&mut image, &detections);

        let file_name = image_path
            .file_name()
            .with_context(|| format!("{} has no file name", image_path.display()))?;
        fs::create_dir_all(run_dir)
            .with_context(|| format!("failed to create {}", run_dir.display()))?;
        let annotated_path = run_dir.join(file_name);
        image
            .save(&annotated_path)
            .with_context(|| format!("failed to write {}", annotated_path.display()))?;

        Ok(DetectionOutput {
            detections,
            annotated_path,
        })
    }
}
