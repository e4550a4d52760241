//! Selfie kiosk library: turns a live camera feed into a gesture/emotion
//! driven capture sequence.
//!
//! The pipeline per frame:
//! 1. A [`keypoints::KeypointSource`] finds a face box, hands and a face mesh
//! 2. [`emotion::EmotionEstimator`] labels the face, [`gesture::GestureEstimator`]
//!    checks for a thumbs-up
//! 3. [`filters::TriggerGate`] turns the flickering signal into a single arming event
//! 4. [`session::CaptureStateMachine`] runs the countdown, votes the dominant
//!    emotion and requests a capture
//! 5. A [`publish::Publisher`] turns the capture into a document and a share link
//!
//! # Examples
//!
//! ## Driving the state machine with synthetic frames
//!
//! ```
//! use selfie_kiosk::{
//!     keypoints::{DetectionFrame, FaceBox},
//!     session::{CaptureStateMachine, Phase, SessionConfig},
//! };
//! use std::time::Instant;
//!
//! let mut machine = CaptureStateMachine::new(SessionConfig::strict_gesture());
//! let frame = DetectionFrame {
//!     face: Some(FaceBox::new(200.0, 120.0, 120.0, 150.0)),
//!     ..DetectionFrame::default()
//! };
//!
//! let output = machine.process_frame(&frame, Instant::now());
//! assert_eq!(output.phase, Phase::Idle);
//! assert_eq!(machine.state().hold_counter(), 0);
//! ```
//!
//! ## Running on a camera
//!
//! ```no_run
//! use selfie_kiosk::{app::{AppConfig, KioskApp}, config::Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let mut app = KioskApp::new(&config, AppConfig::from_config(&config))?;
//! app.run()?;
//! # Ok(())
//! # }
//! ```

/// Per-frame detection types and the keypoint source trait
pub mod keypoints;

/// Face detection module for finding faces in images
pub mod face_detection;

/// Facial landmark detection module for the 68-point face mesh
pub mod mesh_detection;

/// Hand landmark detection module for 21-point hands
pub mod hand_detection;

/// Emotion inference from face geometry
pub mod emotion;

/// Thumbs-up recognition from hand keypoints
pub mod gesture;

/// Signal filtering: smoothing and hold/cooldown triggers
pub mod filters;

/// Emotion vote during the countdown
pub mod votes;

/// Armed countdown schedule
pub mod countdown;

/// Idle-time wave detection
pub mod wave_detector;

/// Capture lifecycle state machine
pub mod session;

/// Document production and share links
pub mod publish;

/// Utility functions for image processing and coordinate transformations
pub mod utils;

/// Error types and result handling
pub mod error;

/// Main application module
pub mod app;

/// Command-line arguments
pub mod cli;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
