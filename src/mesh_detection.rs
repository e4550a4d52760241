use crate::{
    constants::NUM_FACIAL_LANDMARKS,
    keypoints::Point2D,
    utils::image_conversion::{mat_to_tensor, resize_to, Normalization, TensorLayout},
    Error, Result,
};
use opencv::core::Mat;
use opencv::prelude::*;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;

/// Default landmark model input size
const DEFAULT_LANDMARK_INPUT_SIZE: i32 = 128;

/// Face mesh detector producing 68 iBUG landmarks from a face crop
pub struct MeshDetector {
    session: Session,
    marks_output: String,
    input_size: i32,
}

impl MeshDetector {
    /// Create a new mesh detector from an `ONNX` model file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The ONNX model file cannot be loaded
    /// - The model declares no inputs or outputs
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        log::info!("Loading face mesh model: {}", model_path.as_ref().display());
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path)?;

        if session.inputs.is_empty() {
            return Err(Error::ModelInputError("Mesh model has no inputs".to_string()));
        }
        let marks_output = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| Error::ModelOutputError("Mesh model has no outputs".to_string()))?;

        Ok(Self {
            session,
            marks_output,
            input_size: DEFAULT_LANDMARK_INPUT_SIZE,
        })
    }

    /// Detect landmarks in a face crop, in crop pixel coordinates
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or inference fails
    pub fn detect(&mut self, face_image: &Mat) -> Result<Vec<Point2D>> {
        if face_image.empty() {
            return Ok(Vec::new());
        }

        let resized = resize_to(face_image, self.input_size, self.input_size)?;
        let tensor = mat_to_tensor(&resized, Normalization::UNIT, TensorLayout::Nhwc)?;

        let outputs = self.session.run(ort::inputs![Tensor::from_array(tensor)?])?;
        let marks_view = outputs[self.marks_output.as_str()].try_extract_array::<f32>()?;
        let marks = marks_view
            .as_slice()
            .ok_or_else(|| Error::ModelOutputError("Failed to get mesh output data".to_string()))?;

        #[allow(clippy::cast_precision_loss)]
        let (width, height) = (face_image.cols() as f32, face_image.rows() as f32);
        scale_marks(marks, self.input_size, width, height)
    }
}

/// Convert flat model output (x0, y0, x1, y1, ...) in input pixels to crop pixels
#[allow(clippy::cast_precision_loss)]
pub(crate) fn scale_marks(marks: &[f32], input_size: i32, width: f32, height: f32) -> Result<Vec<Point2D>> {
    if marks.len() < NUM_FACIAL_LANDMARKS * 2 {
        return Err(Error::ModelDataFormatError(format!(
            "Expected {} mesh values, got {}",
            NUM_FACIAL_LANDMARKS * 2,
            marks.len()
        )));
    }

    let scale_x = width / input_size as f32;
    let scale_y = height / input_size as f32;

    Ok(marks
        .chunks_exact(2)
        .take(NUM_FACIAL_LANDMARKS)
        .map(|xy| Point2D::new(xy[0] * scale_x, xy[1] * scale_y))
        .collect())
}
