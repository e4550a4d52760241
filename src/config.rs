//! Configuration management for the selfie kiosk

use crate::{publish::PublishConfig, session::SessionConfig, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model configuration
    pub models: ModelConfig,

    /// Camera configuration
    pub camera: CameraConfig,

    /// Face detection configuration
    pub face_detection: FaceDetectionConfig,

    /// Hand detection configuration
    pub hand_detection: HandDetectionConfig,

    /// Trigger, emotion and timing configuration
    pub session: SessionConfig,

    /// Document publishing configuration
    pub publish: PublishConfig,

    /// Display configuration
    pub display: DisplayConfig,
}

/// Model file paths configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to face detection ONNX model
    pub face_detector: PathBuf,

    /// Path to 68-point facial landmarks ONNX model; emotion uses box geometry only when unset
    pub face_landmarks: Option<PathBuf>,

    /// Path to 21-point hand landmarks ONNX model
    pub hand_landmarks: PathBuf,
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera index
    pub index: i32,

    /// Video file to read instead of the camera
    pub video_file: Option<PathBuf>,

    /// Flip frames horizontally so the subject sees a mirror image
    pub mirror: bool,

    /// Requested capture width
    pub width: i32,

    /// Requested capture height
    pub height: i32,
}

/// Face detection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceDetectionConfig {
    /// Confidence threshold for face detection (0.0-1.0)
    pub confidence_threshold: f32,

    /// IOU threshold for non-maximum suppression (0.0-1.0)
    pub iou_threshold: f32,

    /// Face region expansion factor for the landmark crop
    pub roi_expansion: f32,
}

/// Hand detection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandDetectionConfig {
    /// Hand presence threshold (0.0-1.0)
    pub presence_threshold: f32,
}

/// Display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Show the preview window
    pub gui: bool,

    /// Preview window title
    pub window_title: String,

    /// Draw the HUD over the preview
    pub show_hud: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            face_detector: PathBuf::from("assets/face_detector.onnx"),
            face_landmarks: Some(PathBuf::from("assets/face_landmarks.onnx")),
            hand_landmarks: PathBuf::from("assets/hand_landmarks.onnx"),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            video_file: None,
            mirror: true,
            width: 1280,
            height: 720,
        }
    }
}

impl Default for FaceDetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            iou_threshold: 0.4,
            roi_expansion: 0.2,
        }
    }
}

impl Default for HandDetectionConfig {
    fn default() -> Self {
        Self { presence_threshold: 0.5 }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            gui: true,
            window_title: "Selfie Kiosk".to_string(),
            show_hud: true,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::IoError(e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| Error::IoError(e.to_string()))?;

        Ok(())
    }

    /// Session settings
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        self.session.clone()
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first invalid value
    pub fn validate(&self) -> Result<()> {
        // Validate thresholds
        let unit_ranges = [
            ("Face confidence threshold", self.face_detection.confidence_threshold),
            ("IOU threshold", self.face_detection.iou_threshold),
            ("Hand presence threshold", self.hand_detection.presence_threshold),
        ];
        for (name, value) in unit_ranges {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::ConfigError(format!("{name} must be between 0.0 and 1.0")));
            }
        }
        if self.face_detection.roi_expansion < 0.0 {
            return Err(Error::ConfigError("ROI expansion must not be negative".to_string()));
        }

        // Validate session parameters
        let session = &self.session;
        if session.effective_hold().threshold == 0 {
            return Err(Error::ConfigError("Hold threshold must be greater than 0".to_string()));
        }
        let emotion = &session.emotion;
        let alphas = [
            ("Eye alpha", emotion.eye_alpha),
            ("Mouth alpha", emotion.mouth_alpha),
            ("Baseline alpha", emotion.baseline_alpha),
        ];
        for (name, alpha) in alphas {
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(Error::ConfigError(format!("{name} must be in (0.0, 1.0]")));
            }
        }
        if session.min_face_area < 0.0 {
            return Err(Error::ConfigError("Minimum face area must not be negative".to_string()));
        }
        if session.timing.tick_interval_ms == 0 || session.timing.check_interval_ms == 0 {
            return Err(Error::ConfigError("Countdown intervals must be greater than 0".to_string()));
        }

        // Validate camera settings
        if self.camera.width <= 0 || self.camera.height <= 0 {
            return Err(Error::ConfigError("Camera resolution must be positive".to_string()));
        }

        Ok(())
    }

    /// Check that every configured model file exists
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first missing model
    pub fn validate_models(&self) -> Result<()> {
        let mut required = vec![
            ("Face detector", &self.models.face_detector),
            ("Hand landmarks", &self.models.hand_landmarks),
        ];
        if let Some(landmarks) = &self.models.face_landmarks {
            required.push(("Face landmarks", landmarks));
        }

        for (name, path) in required {
            if !path.exists() {
                return Err(Error::ConfigError(format!("{name} model not found: {}", path.display())));
            }
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Selfie Kiosk Configuration

# Model paths
models:
  face_detector: "assets/face_detector.onnx"
  face_landmarks: "assets/face_landmarks.onnx"
  hand_landmarks: "assets/hand_landmarks.onnx"

# Camera
camera:
  index: 0
  mirror: true
  width: 1280
  height: 720

# Face detection parameters
face_detection:
  confidence_threshold: 0.5
  iou_threshold: 0.4
  roi_expansion: 0.2

# Hand detection parameters
hand_detection:
  presence_threshold: 0.5

# Session: trigger policy, hold tuning, emotion and timing
session:
  trigger:
    mode: strict_gesture
    min_confidence: 0.7
    max_thumb_angle_deg: 30.0
    curl_margin: 12.0
    palm_margin: 8.0
  # Hold tuning defaults to the trigger policy's own (36/3/60 for the
  # gestures, 1/3/60 for smile_score). Uncomment to override it for
  # every policy.
  # hold:
  #   threshold: 36
  #   decay_step: 3
  #   cooldown_frames: 60
  emotion:
    smile_margin: 0.055
    open_mouth_ratio: 0.65
    angry_ratio: 0.88
    surprise_area_change: 0.22
  mesh_layout:
    mouth_left: 48
    mouth_right: 54
    upper_lip: 62
    lower_lip: 66
    left_eye_outer: 36
    right_eye_outer: 45
  timing:
    countdown_secs: 10
    tick_interval_ms: 1000
    check_interval_ms: 150
    flourish_ms: 800
    done_hold_ms: 2500
  wave:
    min_swing: 35.0
    swings_for_beam: 5
  min_face_area: 8000.0

# Publishing
publish:
  output_dir: "captures"
  link_ttl_secs: 86400

# Display settings
display:
  gui: true
  window_title: "Selfie Kiosk"
  show_hud: true
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses() {
        let config: Config = serde_yaml::from_str(EXAMPLE_CONFIG).unwrap();
        config.validate().unwrap();
        assert_eq!(config.session.effective_hold().threshold, 36);
        assert_eq!(config.session.timing.countdown_secs, 10);
    }

    #[test]
    fn test_defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_bad_threshold() {
        let mut config = Config::default();
        config.face_detection.confidence_threshold = 1.5;
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
    }
}
