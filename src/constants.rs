//! Constants used throughout the application

/// Number of keypoints in the canonical hand landmark layout
pub const NUM_HAND_KEYPOINTS: usize = 21;

/// Hands searched for per frame
pub const MAX_HANDS: usize = 2;

/// Number of facial landmarks produced by the 68-point mesh model
pub const NUM_FACIAL_LANDMARKS: usize = 68;

/// Target frame rate the hold thresholds are tuned against
pub const TARGET_FPS: f64 = 60.0;

/// Image normalization constants for face detection
pub const IMAGE_NORMALIZATION_OFFSET: f32 = 127.5;
pub const IMAGE_NORMALIZATION_SCALE: f32 = 128.0;

/// Frames a strict thumbs-up must be held (~0.6s at 60Hz)
pub const DEFAULT_HOLD_THRESHOLD: u32 = 36;

/// Counter decrement on a negative frame
pub const DEFAULT_DECAY_STEP: u32 = 3;

/// Frames ignored after a trigger fires (~1s at 60Hz)
pub const DEFAULT_COOLDOWN_FRAMES: u32 = 60;

/// Minimum face box area in pixels before a face may arm the kiosk
pub const DEFAULT_MIN_FACE_AREA: f32 = 8000.0;

/// Countdown length once armed
pub const DEFAULT_COUNTDOWN_SECS: u32 = 10;

/// Visible countdown tick interval
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

/// Zero-crossing check interval
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 150;

/// Completion flourish shown before the done hold
pub const DEFAULT_FLOURISH_MS: u64 = 800;

/// How long the done screen is held before returning to idle
pub const DEFAULT_DONE_HOLD_MS: u64 = 2500;

/// Lifetime of an issued share link (24h)
pub const DEFAULT_LINK_TTL_SECS: u64 = 60 * 60 * 24;

/// Numeric precision epsilon for geometric denominators
pub const EPSILON: f32 = 1e-6;
