use common::span_debug;
use std::cmp::Ordering;

pub struct TransformParams {
    pub orig_width: u32,
    pub orig_height: u32,
    pub input_width: u32,
    pub input_height: u32,
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

/// One detected object in source-image pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: u32,
}

impl Detection {
    pub fn bbox(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    fn iou(&self, other: &Detection) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

pub struct PostProcessor {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl PostProcessor {
    pub fn new(confidence_threshold: f32, iou_threshold: f32, max_detections: usize) -> Self {
        Self {
            confidence_threshold,
            iou_threshold,
            max_detections,
        }
    }

    /// Parse detections from a YOLO head output.
    ///
    /// Boxes are decoded and suppressed in model-input space, then mapped
    /// back through the letterbox and clamped to the source image. The result
    /// is ordered by descending confidence.
    #[tracing::instrument(skip(self, predictions, transform))]
    pub fn parse_detections(
        &self,
        predictions: &ndarray::ArrayViewD<f32>, // [1, 4 + num_classes, num_anchors] cxcywh
        transform: &TransformParams,
    ) -> anyhow::Result<Vec<Detection>> {
        let shape = predictions.shape();
        if shape.len() != 3 || shape[0] != 1 || shape[1] <= 4 {
            anyhow::bail!(
                "Unexpected model output shape {:?}, expected [1, 4 + num_classes, num_anchors]",
                shape
            );
        }

        let num_classes = shape[1] - 4;
        let num_anchors = shape[2];

        let mut candidates = Vec::new();

        for i in 0..num_anchors {
            // Find max class score and its index (argmax for class_id)
            let mut confidence = f32::NEG_INFINITY;
            let mut class_id = 0usize;
            for c in 0..num_classes {
                let score = predictions[[0, 4 + c, i]];
                if score > confidence {
                    confidence = score;
                    class_id = c;
                }
            }

            if confidence <= self.confidence_threshold {
                continue;
            }

            let (x1, y1, x2, y2) = cxcywh_to_xyxy(
                predictions[[0, 0, i]],
                predictions[[0, 1, i]],
                predictions[[0, 2, i]],
                predictions[[0, 3, i]],
            );

            candidates.push(Detection {
                x1,
                y1,
                x2,
                y2,
                confidence,
                class_id: class_id as u32,
            });
        }

        let kept = non_max_suppression(candidates, self.iou_threshold, self.max_detections);

        Ok(kept
            .into_iter()
            .filter_map(|det| to_source_space(det, transform))
            .collect())
    }
}

/// Greedy class-wise NMS. Input order is irrelevant; output is sorted by
/// descending confidence and truncated to `max_detections`.
pub fn non_max_suppression(
    mut detections: Vec<Detection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Detection> {
    let _s = span_debug!("non_max_suppression");

    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::new();

    for det in detections {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == det.class_id && k.iou(&det) > iou_threshold);
        if !suppressed {
            kept.push(det);
        }
    }

    kept
}

/// Undo the letterbox and clamp to the source image; degenerate boxes are dropped.
fn to_source_space(det: Detection, transform: &TransformParams) -> Option<Detection> {
    let width = transform.orig_width as f32;
    let height = transform.orig_height as f32;

    let x1 = ((det.x1 - transform.offset_x) / transform.scale).clamp(0.0, width);
    let y1 = ((det.y1 - transform.offset_y) / transform.scale).clamp(0.0, height);
    let x2 = ((det.x2 - transform.offset_x) / transform.scale).clamp(0.0, width);
    let y2 = ((det.y2 - transform.offset_y) / transform.scale).clamp(0.0, height);

    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    Some(Detection {
        x1,
        y1,
        x2,
        y2,
        ..det
    })
}

/// Convert bounding box from center-width-height format to corner format
#[inline]
fn cxcywh_to_xyxy(cx: f32, cy: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
    let x1 = cx - w / 2.0;
    let y1 = cy - h / 2.0;
    let x2 = cx + w / 2.0;
    let y2 = cy + h / 2.0;
    (x1, y1, x2, y2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};

    /// Helper to create a default PostProcessor for tests
    fn test_postprocessor() -> PostProcessor {
        PostProcessor::new(0.25, 0.45, 300)
    }

    /// Helper to create a TransformParams for a 640x640 model input
    fn test_transform(
        orig_width: u32,
        orig_height: u32,
        scale: f32,
        offset_x: f32,
        offset_y: f32,
    ) -> TransformParams {
        TransformParams {
            orig_width,
            orig_height,
            input_width: 640,
            input_height: 640,
            scale,
            offset_x,
            offset_y,
        }
    }

    /// Helper to create a YOLO head output [1, 4 + num_classes, n]
    /// from (cxcywh box, class index, score) triples.
    fn create_yolo_output(anchors: Vec<([f32; 4], usize, f32)>, num_classes: usize) -> Array<f32, IxDyn> {
        let n = anchors.len();
        let mut output = Array::zeros(IxDyn(&[1, 4 + num_classes, n]));
        for (i, (bbox, class_idx, score)) in anchors.into_iter().enumerate() {
            for (k, v) in bbox.iter().enumerate() {
                output[[0, k, i]] = *v;
            }
            output[[0, 4 + class_idx, i]] = score;
        }
        output
    }

    fn identity() -> TransformParams {
        test_transform(640, 640, 1.0, 0.0, 0.0)
    }

    #[test]
    fn test_cxcywh_to_xyxy() {
        let (x1, y1, x2, y2) = cxcywh_to_xyxy(50.0, 50.0, 40.0, 20.0);
        assert_eq!((x1, y1, x2, y2), (30.0, 40.0, 70.0, 60.0));
    }

    #[test]
    fn test_iou() {
        let a = Detection { x1: 0.0, y1: 0.0, x2: 10.0, y2: 10.0, confidence: 1.0, class_id: 0 };
        let b = Detection { x1: 5.0, y1: 0.0, x2: 15.0, y2: 10.0, confidence: 1.0, class_id: 0 };
        let c = Detection { x1: 20.0, y1: 20.0, x2: 30.0, y2: 30.0, confidence: 1.0, class_id: 0 };

        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        assert!((a.iou(&b) - 50.0 / 150.0).abs() < 1e-6);
        assert_eq!(a.iou(&c), 0.0);
    }

    /// Test that confidence threshold filters detections correctly
    #[test]
    fn test_confidence_threshold_filtering() {
        let output = create_yolo_output(
            vec![
                ([100.0, 100.0, 50.0, 50.0], 0, 0.20), // below threshold
                ([300.0, 300.0, 50.0, 50.0], 1, 0.25), // boundary, excluded like the reference model
                ([500.0, 500.0, 50.0, 50.0], 2, 0.80),
            ],
            16,
        );

        let detections = test_postprocessor()
            .parse_detections(&output.view(), &identity())
            .unwrap();

        assert_eq!(detections.len(), 1, "Should keep only confidence > 0.25");
        assert_eq!(detections[0].class_id, 2);
        assert!((detections[0].confidence - 0.8).abs() < 1e-6);
    }

    /// Test class ID extraction via argmax over all class rows
    #[test]
    fn test_class_id_argmax() {
        let mut output = create_yolo_output(vec![([320.0, 320.0, 40.0, 40.0], 10, 0.9)], 16);
        output[[0, 4 + 3, 0]] = 0.6;
        output[[0, 4 + 15, 0]] = 0.7;

        let detections = test_postprocessor()
            .parse_detections(&output.view(), &identity())
            .unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_id, 10, "Orion row has the highest score");
    }

    /// Test overlapping boxes of the same class collapse to the strongest one
    #[test]
    fn test_nms_suppresses_same_class_overlap() {
        let output = create_yolo_output(
            vec![
                ([100.0, 100.0, 100.0, 100.0], 4, 0.6),
                ([105.0, 105.0, 100.0, 100.0], 4, 0.9),
                ([400.0, 400.0, 100.0, 100.0], 4, 0.7),
            ],
            16,
        );

        let detections = test_postprocessor()
            .parse_detections(&output.view(), &identity())
            .unwrap();

        assert_eq!(detections.len(), 2);
        assert!((detections[0].confidence - 0.9).abs() < 1e-6);
        assert!((detections[1].confidence - 0.7).abs() < 1e-6);
    }

    /// Test overlapping boxes of different classes both survive
    #[test]
    fn test_nms_is_class_wise() {
        let output = create_yolo_output(
            vec![
                ([100.0, 100.0, 100.0, 100.0], 4, 0.9),
                ([102.0, 102.0, 100.0, 100.0], 5, 0.8),
            ],
            16,
        );

        let detections = test_postprocessor()
            .parse_detections(&output.view(), &identity())
            .unwrap();

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].class_id, 4);
        assert_eq!(detections[1].class_id, 5);
    }

    /// Test the detection cap applies after suppression
    #[test]
    fn test_max_detections() {
        let anchors = (0..10)
            .map(|i| ([30.0 + 60.0 * i as f32, 30.0, 20.0, 20.0], 0, 0.5 + i as f32 * 0.01))
            .collect();
        let output = create_yolo_output(anchors, 16);

        let post_processor = PostProcessor::new(0.25, 0.45, 3);
        let detections = post_processor
            .parse_detections(&output.view(), &identity())
            .unwrap();

        assert_eq!(detections.len(), 3);
        assert!(detections[0].confidence > detections[1].confidence);
        assert!(detections[1].confidence > detections[2].confidence);
    }

    /// Test coordinate inverse transformation with known values
    #[test]
    fn test_coordinate_inverse_transformation() {
        // Original image: 800x600, input 640x640
        // Scale = 0.8, resized 640x480, offset Y = 80
        // Box in input space xyxy: (256, 256, 384, 384)
        //   x1 = 256 / 0.8 = 320, y1 = (256 - 80) / 0.8 = 220
        //   x2 = 384 / 0.8 = 480, y2 = (384 - 80) / 0.8 = 380
        let output = create_yolo_output(vec![([320.0, 320.0, 128.0, 128.0], 10, 0.95)], 16);

        let transform = test_transform(800, 600, 0.8, 0.0, 80.0);
        let detections = test_postprocessor()
            .parse_detections(&output.view(), &transform)
            .unwrap();

        assert_eq!(detections.len(), 1);
        let det = &detections[0];
        assert!((det.x1 - 320.0).abs() < 0.1, "x1 transformation incorrect: {}", det.x1);
        assert!((det.y1 - 220.0).abs() < 0.1, "y1 transformation incorrect: {}", det.y1);
        assert!((det.x2 - 480.0).abs() < 0.1, "x2 transformation incorrect: {}", det.x2);
        assert!((det.y2 - 380.0).abs() < 0.1, "y2 transformation incorrect: {}", det.y2);
    }

    /// Test that coordinates are clamped to image bounds
    #[test]
    fn test_coordinates_clamped_to_image_bounds() {
        let output = create_yolo_output(
            vec![
                ([60.0, 60.0, 40.0, 40.0], 1, 0.9),   // negative after offset
                ([440.0, 440.0, 60.0, 60.0], 2, 0.9), // exceeds bounds
            ],
            16,
        );

        let transform = test_transform(400, 400, 1.0, 50.0, 50.0);
        let detections = test_postprocessor()
            .parse_detections(&output.view(), &transform)
            .unwrap();

        assert_eq!(detections.len(), 2);
        let low = detections.iter().find(|d| d.class_id == 1).unwrap();
        let high = detections.iter().find(|d| d.class_id == 2).unwrap();

        assert_eq!(low.x1, 0.0, "Negative x1 should be clamped to 0");
        assert_eq!(low.y1, 0.0, "Negative y1 should be clamped to 0");
        assert_eq!(high.x2, 400.0, "x2 exceeding width should be clamped");
        assert_eq!(high.y2, 400.0, "y2 exceeding height should be clamped");
    }

    /// Test boxes that land entirely in the letterbox padding are dropped
    #[test]
    fn test_box_in_padding_is_dropped() {
        let output = create_yolo_output(vec![([320.0, 20.0, 40.0, 20.0], 0, 0.9)], 16);

        let transform = test_transform(800, 600, 0.8, 0.0, 80.0);
        let detections = test_postprocessor()
            .parse_detections(&output.view(), &transform)
            .unwrap();

        assert!(detections.is_empty());
    }

    /// Test edge case: Empty detections (0 anchors)
    #[test]
    fn test_empty_input() {
        let output = Array::from_shape_vec(IxDyn(&[1, 20, 0]), vec![]).unwrap();

        let detections = test_postprocessor()
            .parse_detections(&output.view(), &identity())
            .unwrap();

        assert!(detections.is_empty(), "Empty input should return no detections");
    }

    /// Test unexpected tensor layouts are reported instead of panicking
    #[test]
    fn test_rejects_unexpected_shape() {
        let output = Array::from_shape_vec(IxDyn(&[300, 4]), vec![0.0; 1200]).unwrap();

        let err = test_postprocessor()
            .parse_detections(&output.view(), &identity())
            .unwrap_err();

        assert!(err.to_string().contains("Unexpected model output shape"));
    }
}
