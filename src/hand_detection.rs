use crate::{
    constants::{MAX_HANDS, NUM_HAND_KEYPOINTS},
    keypoints::{FaceBox, HandDetection, Point2D},
    utils::{
        clamp_to_i32,
        image_conversion::{mat_to_tensor, resize_to, Normalization, TensorLayout},
    },
    Error, Result,
};
use opencv::core::{Mat, Rect};
use opencv::prelude::*;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;

/// Input size of the hand landmark model
const DEFAULT_HAND_INPUT_SIZE: i32 = 224;

/// Narrowest region worth running the model on
const MIN_REGION_WIDTH: i32 = 32;

/// Hand landmark detector.
///
/// Expects a model with a `[1, 63]` landmark head (x, y, z per keypoint, in
/// input pixels) followed by a `[1, 1]` hand presence score. One pass finds at
/// most one hand, so the frame is searched in up to [`MAX_HANDS`] regions.
pub struct HandDetector {
    session: Session,
    landmarks_output: String,
    presence_output: String,
    input_size: i32,
    presence_threshold: f32,
}

impl HandDetector {
    /// Create a new hand detector from an `ONNX` model file
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded or lacks the expected heads
    pub fn new<P: AsRef<Path>>(model_path: P, presence_threshold: f32) -> Result<Self> {
        log::info!("Loading hand landmark model: {}", model_path.as_ref().display());
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path)?;

        if session.inputs.is_empty() {
            return Err(Error::ModelInputError("Hand model has no inputs".to_string()));
        }
        let [landmarks, presence, ..] = session.outputs.as_slice() else {
            return Err(Error::ModelOutputError(format!(
                "Hand model needs landmark and presence outputs, found {}",
                session.outputs.len()
            )));
        };
        let (landmarks_output, presence_output) = (landmarks.name.clone(), presence.name.clone());

        Ok(Self {
            session,
            landmarks_output,
            presence_output,
            input_size: DEFAULT_HAND_INPUT_SIZE,
            presence_threshold,
        })
    }

    /// Detect hands in a BGR frame, searching either side of `face` when known
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or inference fails
    pub fn detect(&mut self, frame: &Mat, face: Option<&FaceBox>) -> Result<Vec<HandDetection>> {
        if frame.empty() {
            return Ok(Vec::new());
        }

        let mut hands = Vec::new();
        for region in search_regions(frame.cols(), frame.rows(), face) {
            let crop = Mat::roi(frame, region)?.try_clone()?;
            if let Some(hand) = self.detect_one(&crop)? {
                #[allow(clippy::cast_precision_loss)]
                let (dx, dy) = (region.x as f32, region.y as f32);
                let keypoints = hand.keypoints.iter().map(|p| Point2D::new(p.x + dx, p.y + dy)).collect();
                hands.push(HandDetection::new(keypoints).with_confidence(hand.confidence));
            }
        }
        Ok(hands)
    }

    /// One model pass over an image, in that image's pixels
    fn detect_one(&mut self, image: &Mat) -> Result<Option<HandDetection>> {
        let resized = resize_to(image, self.input_size, self.input_size)?;
        let tensor = mat_to_tensor(&resized, Normalization::UNIT, TensorLayout::Nhwc)?;

        let outputs = self.session.run(ort::inputs![Tensor::from_array(tensor)?])?;

        let landmarks_view = outputs[self.landmarks_output.as_str()].try_extract_array::<f32>()?;
        let landmarks = landmarks_view
            .as_slice()
            .ok_or_else(|| Error::ModelOutputError("Failed to get hand landmark data".to_string()))?;

        let presence_view = outputs[self.presence_output.as_str()].try_extract_array::<f32>()?;
        let presence = presence_view.iter().next().copied().unwrap_or(0.0);

        #[allow(clippy::cast_precision_loss)]
        let image_size = (image.cols() as f32, image.rows() as f32);
        decode_hand(landmarks, presence, self.input_size, image_size, self.presence_threshold)
    }
}

/// Regions to search for hands: the whole frame without a face, otherwise the
/// frame split at the face centre, one hand per side
#[must_use]
pub fn search_regions(width: i32, height: i32, face: Option<&FaceBox>) -> Vec<Rect> {
    if width <= 0 || height <= 0 {
        return Vec::new();
    }
    let whole = Rect::new(0, 0, width, height);
    let Some(face) = face else {
        return vec![whole];
    };

    let split = clamp_to_i32(face.center().x, 0, width);
    let regions: Vec<Rect> = [Rect::new(0, 0, split, height), Rect::new(split, 0, width - split, height)]
        .into_iter()
        .filter(|region| region.width >= MIN_REGION_WIDTH)
        .take(MAX_HANDS)
        .collect();

    if regions.is_empty() {
        vec![whole]
    } else {
        regions
    }
}

/// Decode one hand from flat (x, y, z) landmarks scaled to the frame
#[allow(clippy::cast_precision_loss)]
pub(crate) fn decode_hand(
    landmarks: &[f32],
    presence: f32,
    input_size: i32,
    frame_size: (f32, f32),
    presence_threshold: f32,
) -> Result<Option<HandDetection>> {
    if !(presence >= presence_threshold) {
        return Ok(None);
    }

    if landmarks.len() < NUM_HAND_KEYPOINTS * 3 {
        return Err(Error::ModelDataFormatError(format!(
            "Expected {} hand landmark values, got {}",
            NUM_HAND_KEYPOINTS * 3,
            landmarks.len()
        )));
    }

    let scale_x = frame_size.0 / input_size as f32;
    let scale_y = frame_size.1 / input_size as f32;
    let keypoints = landmarks
        .chunks_exact(3)
        .take(NUM_HAND_KEYPOINTS)
        .map(|xyz| Point2D::new(xyz[0] * scale_x, xyz[1] * scale_y))
        .collect();

    Ok(Some(HandDetection::new(keypoints).with_confidence(presence)))
}
