//! Per-frame detection types and the keypoint source boundary.
//!
//! A [`KeypointSource`] turns one camera frame into a [`DetectionFrame`]: at
//! most one face box, zero or more hands with 21 keypoints each, and an
//! optional face mesh. Everything downstream of this module only sees these
//! plain geometric types.

use crate::{
    constants::NUM_HAND_KEYPOINTS,
    face_detection::FaceDetector,
    hand_detection::HandDetector,
    mesh_detection::MeshDetector,
    utils::face_roi,
    Result,
};
use opencv::core::{Mat, Rect};
use opencv::prelude::*;

/// A point in image coordinates (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    #[must_use]
    pub fn distance(&self, other: &Point2D) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned face bounding box in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl FaceBox {
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    #[must_use]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    #[must_use]
    pub fn center(&self) -> Point2D {
        Point2D::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Height over width; zero for a degenerate box
    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        if self.width > 0.0 {
            self.height / self.width
        } else {
            0.0
        }
    }
}

impl From<Rect> for FaceBox {
    #[allow(clippy::cast_precision_loss)]
    fn from(rect: Rect) -> Self {
        Self::new(rect.x as f32, rect.y as f32, rect.width as f32, rect.height as f32)
    }
}

/// One detected hand
#[derive(Debug, Clone, PartialEq)]
pub struct HandDetection {
    /// Keypoints in the canonical 21-point hand layout
    pub keypoints: Vec<Point2D>,
    /// Detection confidence in [0, 1]
    pub confidence: f32,
}

impl HandDetection {
    /// Hand without a reported score; treated as fully confident
    #[must_use]
    pub fn new(keypoints: Vec<Point2D>) -> Self {
        Self {
            keypoints,
            confidence: 1.0,
        }
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Keypoint by canonical index, if present
    #[must_use]
    pub fn keypoint(&self, index: usize) -> Option<&Point2D> {
        self.keypoints.get(index)
    }

    /// True when every canonical keypoint is present
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.keypoints.len() >= NUM_HAND_KEYPOINTS
    }
}

/// Everything detected in one frame. Not retained between frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionFrame {
    pub face: Option<FaceBox>,
    pub hands: Vec<HandDetection>,
    pub mesh: Option<Vec<Point2D>>,
}

impl DetectionFrame {
    /// A frame where nothing was detected
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Source of per-frame face, hand and mesh detections
pub trait KeypointSource {
    /// Frame type the source consumes
    type Frame: ?Sized;

    /// Most prominent face in the frame
    fn estimate_face(&mut self, frame: &Self::Frame) -> Result<Option<FaceBox>>;

    /// All hands in the frame; `face` is the box found this frame
    fn estimate_hands(&mut self, frame: &Self::Frame, face: Option<&FaceBox>) -> Result<Vec<HandDetection>>;

    /// Face mesh landmarks in frame coordinates; `face` is the box found this frame
    fn estimate_mesh(&mut self, frame: &Self::Frame, face: Option<&FaceBox>) -> Result<Option<Vec<Point2D>>>;

    /// Run all estimators and assemble a [`DetectionFrame`]
    fn detect(&mut self, frame: &Self::Frame) -> Result<DetectionFrame> {
        let face = self.estimate_face(frame)?;
        let hands = self.estimate_hands(frame, face.as_ref())?;
        let mesh = self.estimate_mesh(frame, face.as_ref())?;
        Ok(DetectionFrame { face, hands, mesh })
    }
}

/// Keypoint source backed by ONNX Runtime models on `OpenCV` frames
pub struct OnnxKeypointSource {
    face_detector: FaceDetector,
    hand_detector: HandDetector,
    mesh_detector: Option<MeshDetector>,
    roi_expansion: f32,
}

impl OnnxKeypointSource {
    /// Assemble a source from loaded detectors. The mesh detector is optional;
    /// without it emotion falls back to box geometry.
    #[must_use]
    pub fn new(
        face_detector: FaceDetector,
        hand_detector: HandDetector,
        mesh_detector: Option<MeshDetector>,
        roi_expansion: f32,
    ) -> Self {
        Self {
            face_detector,
            hand_detector,
            mesh_detector,
            roi_expansion,
        }
    }
}

impl KeypointSource for OnnxKeypointSource {
    type Frame = Mat;

    fn estimate_face(&mut self, frame: &Mat) -> Result<Option<FaceBox>> {
        let faces = self.face_detector.detect(frame)?;
        Ok(faces.first().map(|face| face.bbox))
    }

    fn estimate_hands(&mut self, frame: &Mat, face: Option<&FaceBox>) -> Result<Vec<HandDetection>> {
        self.hand_detector.detect(frame, face)
    }

    fn estimate_mesh(&mut self, frame: &Mat, face: Option<&FaceBox>) -> Result<Option<Vec<Point2D>>> {
        let (Some(detector), Some(face)) = (&mut self.mesh_detector, face) else {
            return Ok(None);
        };

        let Some(roi) = face_roi(face, frame.cols(), frame.rows(), self.roi_expansion) else {
            return Ok(None);
        };

        let face_image = Mat::roi(frame, roi)?.try_clone()?;
        let marks = detector.detect(&face_image)?;
        if marks.is_empty() {
            return Ok(None);
        }

        #[allow(clippy::cast_precision_loss)]
        let (offset_x, offset_y) = (roi.x as f32, roi.y as f32);
        Ok(Some(
            marks
                .into_iter()
                .map(|p| Point2D::new(p.x + offset_x, p.y + offset_y))
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_box_geometry() {
        let face = FaceBox::new(10.0, 20.0, 100.0, 120.0);
        assert_eq!(face.area(), 12000.0);
        assert!((face.aspect_ratio() - 1.2).abs() < 1e-6);
        assert_eq!(FaceBox::new(0.0, 0.0, 0.0, 50.0).aspect_ratio(), 0.0);
    }

    #[test]
    fn test_face_box_from_rect() {
        let face = FaceBox::from(Rect::new(5, 6, 70, 80));
        assert_eq!(face, FaceBox::new(5.0, 6.0, 70.0, 80.0));
    }

    #[test]
    fn test_hand_defaults_to_full_confidence() {
        let hand = HandDetection::new(vec![Point2D::default(); NUM_HAND_KEYPOINTS]);
        assert_eq!(hand.confidence, 1.0);
        assert!(hand.is_complete());
        assert_eq!(hand.with_confidence(1.7).confidence, 1.0);
    }

    #[test]
    fn test_incomplete_hand() {
        let hand = HandDetection::new(vec![Point2D::new(1.0, 1.0); 5]);
        assert!(!hand.is_complete());
        assert!(hand.keypoint(4).is_some());
        assert!(hand.keypoint(8).is_none());
    }

    #[test]
    fn test_face_center() {
        let face = FaceBox::new(10.0, 20.0, 100.0, 120.0);
        assert_eq!(face.center(), Point2D::new(60.0, 80.0));
    }

    #[test]
    fn test_point_distance() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(3.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
    }

    struct ScriptedSource {
        frames: Vec<DetectionFrame>,
        cursor: usize,
        hand_hint: Option<FaceBox>,
    }

    impl KeypointSource for ScriptedSource {
        type Frame = usize;

        fn estimate_face(&mut self, frame: &usize) -> Result<Option<FaceBox>> {
            self.cursor = *frame;
            Ok(self.frames[*frame].face)
        }

        fn estimate_hands(&mut self, frame: &usize, face: Option<&FaceBox>) -> Result<Vec<HandDetection>> {
            self.hand_hint = face.copied();
            Ok(self.frames[*frame].hands.clone())
        }

        fn estimate_mesh(&mut self, frame: &usize, face: Option<&FaceBox>) -> Result<Option<Vec<Point2D>>> {
            Ok(face.and(self.frames[*frame].mesh.clone()))
        }
    }

    #[test]
    fn test_detect_assembles_frame() {
        let mut source = ScriptedSource {
            frames: vec![
                DetectionFrame {
                    face: None,
                    hands: vec![],
                    mesh: Some(vec![Point2D::default()]),
                },
                DetectionFrame {
                    face: Some(FaceBox::new(0.0, 0.0, 100.0, 100.0)),
                    hands: vec![HandDetection::new(vec![])],
                    mesh: Some(vec![Point2D::new(1.0, 2.0)]),
                },
            ],
            cursor: 0,
            hand_hint: None,
        };

        let first = source.detect(&0).unwrap();
        assert!(first.face.is_none());
        assert!(first.mesh.is_none(), "mesh requires a face");

        let second = source.detect(&1).unwrap();
        assert_eq!(source.cursor, 1);
        assert_eq!(second.hands.len(), 1);
        assert_eq!(source.hand_hint, second.face);
        assert_eq!(second.mesh.as_deref(), Some(&[Point2D::new(1.0, 2.0)][..]));
    }
}
