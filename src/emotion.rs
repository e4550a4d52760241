//! Emotion inference from facial geometry.
//!
//! Two paths feed the label:
//! - a mesh path that scores smiles from mouth width relative to a slowly
//!   adapting neutral baseline, normalized by inter-eye distance
//! - a box path that reads `angry` from a squat face box and `surprised` from
//!   a sudden change in box area
//!
//! A `happy` reading from the mesh path always wins. There is no hysteresis
//! here; stabilization happens downstream in the trigger gate and the vote.

use crate::{
    constants::EPSILON,
    filters::{exponential::ExponentialFilter, SignalFilter},
    keypoints::{FaceBox, Point2D},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Emotion labels in tie-break order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Surprised,
    Angry,
    #[default]
    Neutral,
}

impl Emotion {
    /// Every label, in declaration order
    pub const ALL: [Emotion; 4] = [Emotion::Happy, Emotion::Surprised, Emotion::Angry, Emotion::Neutral];

    /// Position in [`Emotion::ALL`]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Emotion::Happy => 0,
            Emotion::Surprised => 1,
            Emotion::Angry => 2,
            Emotion::Neutral => 3,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Surprised => "surprised",
            Emotion::Angry => "angry",
            Emotion::Neutral => "neutral",
        }
    }

    /// Theme text printed on the generated document
    #[must_use]
    pub const fn theme(self) -> &'static str {
        match self {
            Emotion::Happy => "Experience & Growth (viral UX, community loops)",
            Emotion::Surprised => "Frontier & Novelty (new interfaces, emerging tech)",
            Emotion::Angry => "Ops & Efficiency (speed, reliability, automation)",
            Emotion::Neutral => "Clarity & Trust (data, compliance, governance)",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Landmark indices the smile path reads from a face mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshLayout {
    pub mouth_left: usize,
    pub mouth_right: usize,
    pub upper_lip: usize,
    pub lower_lip: usize,
    pub left_eye_outer: usize,
    pub right_eye_outer: usize,
}

impl MeshLayout {
    /// 468-point MediaPipe face mesh
    pub const MEDIAPIPE_FACE_MESH: Self = Self {
        mouth_left: 61,
        mouth_right: 291,
        upper_lip: 13,
        lower_lip: 14,
        left_eye_outer: 33,
        right_eye_outer: 263,
    };

    /// 68-point iBUG layout
    pub const IBUG_68: Self = Self {
        mouth_left: 48,
        mouth_right: 54,
        upper_lip: 62,
        lower_lip: 66,
        left_eye_outer: 36,
        right_eye_outer: 45,
    };

    fn points<'a>(&self, mesh: &'a [Point2D]) -> Option<[&'a Point2D; 6]> {
        Some([
            mesh.get(self.mouth_left)?,
            mesh.get(self.mouth_right)?,
            mesh.get(self.upper_lip)?,
            mesh.get(self.lower_lip)?,
            mesh.get(self.left_eye_outer)?,
            mesh.get(self.right_eye_outer)?,
        ])
    }
}

impl Default for MeshLayout {
    fn default() -> Self {
        Self::IBUG_68
    }
}

/// Emotion estimator tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionConfig {
    /// Score at or above which the mesh path reads `happy`
    pub smile_margin: f32,
    /// Smoothed mouth height ratio above which the mouth counts as open
    pub open_mouth_ratio: f32,
    /// Score multiplier applied to an open mouth
    pub open_mouth_attenuation: f32,
    pub eye_alpha: f32,
    pub mouth_alpha: f32,
    /// Learning rate of the neutral mouth width baseline
    pub baseline_alpha: f32,
    /// Upper bound on a width sample before it is blended into the baseline
    pub baseline_clamp: f32,
    /// Box height/width ratio below which the face reads `angry`
    pub angry_ratio: f32,
    /// Relative area change above which the face reads `surprised`
    pub surprise_area_change: f32,
    /// Box ratio above which the face reads `happy` without a mesh; off when unset
    pub box_happy_ratio: Option<f32>,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            smile_margin: 0.055,
            open_mouth_ratio: 0.65,
            open_mouth_attenuation: 0.5,
            eye_alpha: 0.25,
            mouth_alpha: 0.35,
            baseline_alpha: 0.02,
            baseline_clamp: 1.25,
            angry_ratio: 0.88,
            surprise_area_change: 0.22,
            box_happy_ratio: None,
        }
    }
}

/// Smile score from smoothed mouth ratios.
///
/// Non-decreasing in `width` for fixed `baseline` and `height`.
#[must_use]
pub fn smile_score(width: f32, baseline: f32, height: f32, config: &EmotionConfig) -> f32 {
    let score = width - baseline;
    if height > config.open_mouth_ratio {
        score * config.open_mouth_attenuation
    } else {
        score
    }
}

/// Smoothing state for the mesh smile path
#[derive(Debug, Clone)]
pub struct SmileTracker {
    eye: ExponentialFilter,
    width: ExponentialFilter,
    height: ExponentialFilter,
    baseline: ExponentialFilter,
}

impl SmileTracker {
    #[must_use]
    pub fn new(config: &EmotionConfig) -> Self {
        Self {
            eye: ExponentialFilter::new(config.eye_alpha),
            width: ExponentialFilter::new(config.mouth_alpha),
            height: ExponentialFilter::new(config.mouth_alpha),
            baseline: ExponentialFilter::new(config.baseline_alpha),
        }
    }

    /// Score one mesh. Degenerate meshes score 0 and leave the state alone.
    pub fn update(&mut self, mesh: &[Point2D], layout: &MeshLayout, config: &EmotionConfig) -> f32 {
        let Some([mouth_left, mouth_right, upper_lip, lower_lip, left_eye, right_eye]) = layout.points(mesh) else {
            return 0.0;
        };

        let eye_raw = left_eye.distance(right_eye);
        if !(eye_raw > EPSILON) {
            return 0.0;
        }

        let eye = self.eye.apply(eye_raw);
        let width = self.width.apply(mouth_left.distance(mouth_right) / eye);
        let height = self.height.apply(upper_lip.distance(lower_lip) / eye);

        let clamped = width.min(config.baseline_clamp);
        let baseline = self.baseline.value().unwrap_or(clamped);
        let score = smile_score(width, baseline, height, config);

        self.baseline.apply(clamped);
        score
    }

    /// Current neutral mouth width baseline
    #[must_use]
    pub fn baseline(&self) -> Option<f32> {
        self.baseline.value()
    }

    pub fn reset(&mut self) {
        self.eye.reset();
        self.width.reset();
        self.height.reset();
        self.baseline.reset();
    }
}

/// Result of one emotion estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmotionReading {
    pub label: Emotion,
    /// Face area to remember for the next frame
    pub area: f32,
    /// Smile score, when the mesh path ran
    pub smile_score: Option<f32>,
}

/// Box-geometry classification
#[must_use]
pub fn classify_box(face: &FaceBox, previous_area: f32, config: &EmotionConfig) -> Emotion {
    let ratio = face.aspect_ratio();

    let mut label = Emotion::Neutral;
    if config.box_happy_ratio.is_some_and(|happy| ratio > happy) {
        label = Emotion::Happy;
    } else if ratio < config.angry_ratio {
        label = Emotion::Angry;
    }
    // A sudden size change overrides the shape-based label
    if previous_area > 0.0 {
        let change = (face.area() - previous_area).abs() / previous_area;
        if change > config.surprise_area_change {
            label = Emotion::Surprised;
        }
    }
    label
}

/// Per-frame emotion estimator
#[derive(Debug, Clone)]
pub struct EmotionEstimator {
    config: EmotionConfig,
    layout: MeshLayout,
    smile: SmileTracker,
}

impl EmotionEstimator {
    #[must_use]
    pub fn new(config: EmotionConfig, layout: MeshLayout) -> Self {
        Self {
            smile: SmileTracker::new(&config),
            config,
            layout,
        }
    }

    /// Label the current frame
    pub fn estimate(&mut self, face: Option<&FaceBox>, mesh: Option<&[Point2D]>, previous_area: f32) -> EmotionReading {
        let Some(face) = face else {
            return EmotionReading {
                label: Emotion::Neutral,
                area: previous_area,
                smile_score: None,
            };
        };

        let smile_score = mesh.map(|mesh| self.smile.update(mesh, &self.layout, &self.config));
        let label = if smile_score.is_some_and(|score| score >= self.config.smile_margin) {
            Emotion::Happy
        } else {
            classify_box(face, previous_area, &self.config)
        };

        log::trace!("emotion {label} ratio {:.3} smile {smile_score:?}", face.aspect_ratio());

        EmotionReading {
            label,
            area: face.area(),
            smile_score,
        }
    }

    #[must_use]
    pub fn config(&self) -> &EmotionConfig {
        &self.config
    }

    #[must_use]
    pub fn smile_tracker(&self) -> &SmileTracker {
        &self.smile
    }

    pub fn reset(&mut self) {
        self.smile.reset();
    }
}

impl Default for EmotionEstimator {
    fn default() -> Self {
        Self::new(EmotionConfig::default(), MeshLayout::default())
    }
}
