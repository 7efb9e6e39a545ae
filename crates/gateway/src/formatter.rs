//! Turns detector output into the public predict response.

use crate::catalog;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use inference::{Detection, InferenceConfig};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionRecord {
    pub constellation: String,
    /// Percent, two decimals.
    pub confidence: f64,
    /// `[x1, y1, x2, y2]` in source-image pixels.
    pub bbox: [f32; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstellationSummary {
    pub name: String,
    pub count: usize,
    pub description: &'static str,
    pub facts: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub classes: usize,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
}

impl From<&InferenceConfig> for ModelInfo {
    fn from(config: &InferenceConfig) -> Self {
        Self {
            classes: catalog::len(),
            confidence_threshold: config.confidence_threshold,
            iou_threshold: config.iou_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AnnotatedImage {
    #[serde(rename = "annotated_image")]
    Inline(String),
    #[serde(rename = "annotated_image_url")]
    Url(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictResponse {
    pub success: bool,
    pub total_detections: usize,
    pub constellations_found: usize,
    pub constellations: Vec<ConstellationSummary>,
    pub detections: Vec<DetectionRecord>,
    #[serde(flatten)]
    pub annotated: AnnotatedImage,
    pub model_info: ModelInfo,
}

/// Model confidence in `[0, 1]` as a percentage rounded to two decimals.
pub fn confidence_percent(confidence: f32) -> f64 {
    let percent = (confidence as f64 * 100.0).clamp(0.0, 100.0);
    (percent * 100.0).round() / 100.0
}

pub fn data_uri(extension: &str, bytes: &[u8]) -> String {
    format!("data:image/{};base64,{}", extension, STANDARD.encode(bytes))
}

pub fn to_records(detections: &[Detection]) -> Vec<DetectionRecord> {
    detections
        .iter()
        .map(|det| DetectionRecord {
            constellation: catalog::label_for(det.class_id),
            confidence: confidence_percent(det.confidence),
            bbox: det.bbox(),
        })
        .collect()
}

/// Group records by label, most frequent first. Equal counts keep the
/// order in which labels first appeared.
pub fn summarize(records: &[DetectionRecord]) -> Vec<ConstellationSummary> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for record in records {
        match counts
            .iter_mut()
            .find(|(name, _)| *name == record.constellation)
        {
            Some((_, count)) => *count += 1,
            None => counts.push((&record.constellation, 1)),
        }
    }

    // sort_by is stable
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    counts
        .into_iter()
        .map(|(name, count)| ConstellationSummary {
            name: name.to_string(),
            count,
            description: catalog::description_for(name),
            facts: catalog::facts_for(name),
        })
        .collect()
}

pub fn build_response(
    detections: &[Detection],
    annotated: AnnotatedImage,
    model_info: ModelInfo,
) -> PredictResponse {
    let records = to_records(detections);
    let constellations = summarize(&records);

    PredictResponse {
        success: true,
        total_detections: records.len(),
        constellations_found: constellations.len(),
        constellations,
        detections: records,
        annotated,
        model_info,
    }
}
