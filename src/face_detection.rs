use crate::{
    keypoints::FaceBox,
    utils::image_conversion::{mat_to_tensor, resize_to, Normalization, TensorLayout},
    Error, Result,
};
use opencv::core::{Mat, Rect, Scalar, CV_8UC3};
use opencv::prelude::*;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::collections::HashMap;
use std::path::Path;

/// Default SCRFD input size when the model leaves it dynamic
const DEFAULT_INPUT_SIZE: (i32, i32) = (640, 640);

/// Face detection result
#[derive(Debug, Clone, PartialEq)]
pub struct FaceDetection {
    /// Bounding box of the detected face in frame pixels
    pub bbox: FaceBox,
    /// Confidence score of the detection
    pub score: f32,
}

/// SCRFD face detector using ONNX Runtime.
///
/// Only the score and box heads are decoded; the optional 5-point keypoint
/// head is ignored since the kiosk takes its landmarks from the mesh model.
pub struct FaceDetector {
    session: Session,
    output_names: Vec<String>,
    input_size: (i32, i32),
    conf_threshold: f32,
    nms_threshold: f32,
    num_anchors: usize,
    strides: Vec<i32>,
    offset: usize,
    center_cache: HashMap<(i32, i32, i32), Vec<(f32, f32)>>,
}

impl FaceDetector {
    /// Create a new face detector from an ONNX model file
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded or has no inputs
    pub fn new<P: AsRef<Path>>(model_path: P, conf_threshold: f32, nms_threshold: f32) -> Result<Self> {
        log::info!("Loading face detector: {}", model_path.as_ref().display());
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path)?;

        let input_meta = session
            .inputs
            .first()
            .ok_or_else(|| Error::ModelInputError("Face model has no inputs".to_string()))?;

        // Input shape is [batch, channels, height, width]; dynamic dims (-1) fall back to defaults
        let dims: Vec<i64> = input_meta
            .input_type
            .tensor_shape()
            .map(|shape| shape.to_vec())
            .unwrap_or_default();
        let fixed = |dim: i64, fallback: i32| i32::try_from(dim).ok().filter(|&d| d > 0).unwrap_or(fallback);
        let input_size = if dims.len() >= 4 {
            (fixed(dims[3], DEFAULT_INPUT_SIZE.0), fixed(dims[2], DEFAULT_INPUT_SIZE.1))
        } else {
            DEFAULT_INPUT_SIZE
        };
        let output_names: Vec<String> = session.outputs.iter().map(|output| output.name.clone()).collect();

        // SCRFD variants are recognised by their head count
        let (offset, strides, num_anchors) = match session.outputs.len() {
            6 | 9 => (3, vec![8, 16, 32], 2),
            10 | 15 => (5, vec![8, 16, 32, 64, 128], 1),
            n => {
                log::warn!("Unknown face model layout with {} outputs, assuming 3 strides", n);
                (3, vec![8, 16, 32], 2)
            }
        };

        Ok(Self {
            session,
            output_names,
            input_size,
            conf_threshold,
            nms_threshold,
            num_anchors,
            strides,
            offset,
            center_cache: HashMap::new(),
        })
    }

    /// Detect faces in a BGR frame, highest score first
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or inference fails
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn detect(&mut self, image: &Mat) -> Result<Vec<FaceDetection>> {
        let (img_width, img_height) = (image.cols(), image.rows());
        if img_width <= 0 || img_height <= 0 {
            return Ok(Vec::new());
        }

        // Letterbox into the model input, keeping aspect ratio
        let (input_width, input_height) = self.input_size;
        let ratio_img = img_height as f32 / img_width as f32;
        let ratio_model = input_height as f32 / input_width as f32;
        let (new_width, new_height) = if ratio_img > ratio_model {
            ((input_height as f32 / ratio_img) as i32, input_height)
        } else {
            (input_width, (input_width as f32 * ratio_img) as i32)
        };
        let det_scale = new_height as f32 / img_height as f32;

        let resized = resize_to(image, new_width.max(1), new_height.max(1))?;
        let mut padded = Mat::new_rows_cols_with_default(input_height, input_width, CV_8UC3, Scalar::all(0.0))?;
        let mut roi = padded.roi_mut(Rect::new(0, 0, new_width.max(1), new_height.max(1)))?;
        resized.copy_to(&mut roi)?;

        let tensor = mat_to_tensor(&padded, Normalization::CENTERED, TensorLayout::Nchw)?;
        let candidates = self.forward(tensor)?;

        let mut scored: Vec<([f32; 4], f32)> = candidates
            .into_iter()
            .map(|(bbox, score)| (bbox.map(|v| v / det_scale), score))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let boxes: Vec<[f32; 4]> = scored.iter().map(|(bbox, _)| *bbox).collect();
        let keep = nms(&boxes, self.nms_threshold);

        Ok(keep
            .into_iter()
            .map(|i| {
                let [x1, y1, x2, y2] = scored[i].0;
                FaceDetection {
                    bbox: FaceBox::new(x1, y1, x2 - x1, y2 - y1),
                    score: scored[i].1,
                }
            })
            .collect())
    }

    /// Run the model and decode every anchor above the confidence threshold
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn forward(&mut self, tensor: ndarray::Array4<f32>) -> Result<Vec<([f32; 4], f32)>> {
        let input_height = tensor.shape()[2] as i32;
        let input_width = tensor.shape()[3] as i32;

        let outputs = self.session.run(ort::inputs![Tensor::from_array(tensor)?])?;

        let mut candidates = Vec::new();

        for (idx, &stride) in self.strides.iter().enumerate() {
            let bbox_idx = idx + self.offset;
            if bbox_idx >= self.output_names.len() {
                return Err(Error::ModelOutputError(format!(
                    "Face model is missing the box head for stride {stride}"
                )));
            }

            let scores_view = outputs[self.output_names[idx].as_str()].try_extract_array::<f32>()?;
            let scores = scores_view
                .as_slice()
                .ok_or_else(|| Error::ModelOutputError("Non-contiguous score tensor".to_string()))?;

            let bbox_view = outputs[self.output_names[bbox_idx].as_str()].try_extract_array::<f32>()?;
            let distances = bbox_view
                .as_slice()
                .ok_or_else(|| Error::ModelOutputError("Non-contiguous box tensor".to_string()))?;

            let key = (input_height / stride, input_width / stride, stride);
            let num_anchors = self.num_anchors;
            let centers = self
                .center_cache
                .entry(key)
                .or_insert_with(|| anchor_centers(key.0, key.1, stride, num_anchors));

            for (i, &score) in scores.iter().enumerate() {
                if score < self.conf_threshold {
                    continue;
                }
                let (Some(&center), Some(dist)) = (centers.get(i), distances.get(i * 4..i * 4 + 4)) else {
                    continue;
                };
                let scaled = [
                    dist[0] * stride as f32,
                    dist[1] * stride as f32,
                    dist[2] * stride as f32,
                    dist[3] * stride as f32,
                ];
                candidates.push((distance_to_bbox(center, scaled), score));
            }
        }

        Ok(candidates)
    }
}

/// Anchor centers for one stride, repeated `num_anchors` times per cell
#[allow(clippy::cast_precision_loss)]
pub(crate) fn anchor_centers(height: i32, width: i32, stride: i32, num_anchors: usize) -> Vec<(f32, f32)> {
    let mut centers = Vec::with_capacity((height.max(0) * width.max(0)) as usize * num_anchors.max(1));
    for y in 0..height {
        for x in 0..width {
            let center = ((x * stride) as f32, (y * stride) as f32);
            for _ in 0..num_anchors.max(1) {
                centers.push(center);
            }
        }
    }
    centers
}

/// Decode (left, top, right, bottom) distances from an anchor into x1, y1, x2, y2
pub(crate) fn distance_to_bbox(center: (f32, f32), distances: [f32; 4]) -> [f32; 4] {
    let (cx, cy) = center;
    [cx - distances[0], cy - distances[1], cx + distances[2], cy + distances[3]]
}

/// Intersection over union of two x1, y1, x2, y2 boxes
pub(crate) fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let area = |r: &[f32; 4]| (r[2] - r[0] + 1.0).max(0.0) * (r[3] - r[1] + 1.0).max(0.0);

    let w = (a[2].min(b[2]) - a[0].max(b[0]) + 1.0).max(0.0);
    let h = (a[3].min(b[3]) - a[1].max(b[1]) + 1.0).max(0.0);
    let inter = w * h;
    let union = area(a) + area(b) - inter;

    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

/// Greedy non-maximum suppression over boxes already sorted by score
pub(crate) fn nms(boxes: &[[f32; 4]], iou_threshold: f32) -> Vec<usize> {
    let mut keep: Vec<usize> = Vec::new();
    for (i, candidate) in boxes.iter().enumerate() {
        if keep.iter().all(|&k| iou(&boxes[k], candidate) <= iou_threshold) {
            keep.push(i);
        }
    }
    keep
}
