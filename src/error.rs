//! Error types for the selfie kiosk library.
//!
//! Startup failures (camera, models, configuration) end the process. Errors
//! raised while a frame is being processed are logged and the frame is
//! treated as empty; publish errors end the capture cycle with a notice.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` capture, conversion or drawing failed
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// `ONNX` Runtime session setup or inference failed
    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(#[from] ort::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Captured document could not be encoded
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Frame or geometry unusable for the requested operation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model declares no usable input
    #[error("Model input error: {0}")]
    ModelInputError(String),

    /// Model output missing or of the wrong length
    #[error("Model output error: {0}")]
    ModelOutputError(String),

    /// Model tensor has an unexpected shape
    #[error("Model data format error: {0}")]
    ModelDataFormatError(String),

    /// Video source could not be opened
    #[error("Camera error: {0}")]
    CameraError(String),

    /// Document production or link issuance failed
    #[error("Publish error: {0}")]
    PublishError(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Filesystem failure reported as text
    #[error("I/O error: {0}")]
    IoError(String),
}

/// Alias kept for call sites that read better with an application-level name
pub type AppError = Error;

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
