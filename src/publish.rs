//! Document production and link issuance for captured selfies.
//!
//! The frame loop never blocks on publishing: [`PublishWorker`] runs one
//! [`Publisher`] call on a background thread and hands the outcome back
//! through a channel that the loop polls once per frame.

use crate::{
    constants::DEFAULT_LINK_TTL_SECS,
    emotion::Emotion,
    utils::image_conversion::{mat_to_rgb_image, rgb_image_to_mat},
    Error, Result,
};
use chrono::{DateTime, Utc};
use image::RgbImage;
use opencv::{
    core::{Mat, Point, Rect, Scalar, CV_8UC3},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_AA},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Retrieval link for a published document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub url: String,
    pub expires_at: SystemTime,
}

/// A frame captured at countdown zero
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub image: RgbImage,
    pub captured_at: SystemTime,
}

impl CapturedFrame {
    #[must_use]
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            captured_at: SystemTime::now(),
        }
    }

    /// Copy a BGR camera frame
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not an 8-bit BGR image
    pub fn from_mat(frame: &Mat) -> Result<Self> {
        Ok(Self::new(mat_to_rgb_image(frame)?))
    }
}

/// Produces a document from a captured frame and issues a link to it
pub trait Publisher: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the document cannot be produced or stored
    fn produce_and_publish(&self, frame: &CapturedFrame, emotion: Emotion, theme: &str) -> Result<ShareLink>;
}

/// Local publisher settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Directory receiving documents and manifests
    pub output_dir: PathBuf,
    /// Public prefix for links; file paths are returned when unset
    pub base_url: Option<String>,
    /// Link lifetime in seconds
    pub link_ttl_secs: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("captures"),
            base_url: None,
            link_ttl_secs: DEFAULT_LINK_TTL_SECS,
        }
    }
}

/// Height of the caption band under the photo
pub const CAPTION_BAND_HEIGHT: u32 = 96;

/// Caption lines printed on the document
#[must_use]
pub fn caption_lines(captured_at: SystemTime, emotion: Emotion, theme: &str) -> [String; 3] {
    let captured: DateTime<Utc> = captured_at.into();
    [
        theme.to_string(),
        format!("Emotion: {emotion}"),
        format!("Captured: {}", captured.format("%Y-%m-%d %H:%M:%S UTC")),
    ]
}

/// Lay out the document: the photo on top, a white caption band below it
///
/// # Errors
///
/// Returns an error if the photo is empty or drawing fails
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn render_document(frame: &CapturedFrame, emotion: Emotion, theme: &str) -> Result<RgbImage> {
    let photo = rgb_image_to_mat(&frame.image)?;
    let (width, height) = (photo.cols(), photo.rows());
    let band = CAPTION_BAND_HEIGHT as i32;

    let mut page = Mat::new_rows_cols_with_default(height + band, width, CV_8UC3, Scalar::all(255.0))?;
    {
        let mut top = page.roi_mut(Rect::new(0, 0, width, height))?;
        photo.copy_to(&mut top)?;
    }

    for (i, line) in caption_lines(frame.captured_at, emotion, theme).iter().enumerate() {
        let (scale, thickness) = if i == 0 { (0.7, 2) } else { (0.5, 1) };
        imgproc::put_text(
            &mut page,
            line,
            Point::new(12, height + 28 + 26 * i as i32),
            FONT_HERSHEY_SIMPLEX,
            scale,
            Scalar::all(0.0),
            thickness,
            LINE_AA,
            false,
        )?;
    }

    mat_to_rgb_image(&page)
}

/// Manifest stored next to every document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureManifest {
    pub name: String,
    /// Seconds since the Unix epoch
    pub captured_at: u64,
    pub emotion: Emotion,
    pub theme: String,
    pub document: String,
    /// Seconds since the Unix epoch
    pub expires_at: u64,
}

/// Writes a captioned PNG document plus a YAML manifest into a directory
#[derive(Debug)]
pub struct LocalPublisher {
    config: PublishConfig,
    sequence: AtomicU64,
}

impl LocalPublisher {
    #[must_use]
    pub fn new(config: PublishConfig) -> Self {
        Self {
            config,
            sequence: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    fn link_for(&self, document: &std::path::Path, file_name: &str) -> String {
        match &self.config.base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), file_name),
            None => document.display().to_string(),
        }
    }
}

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs())
}

impl Publisher for LocalPublisher {
    fn produce_and_publish(&self, frame: &CapturedFrame, emotion: Emotion, theme: &str) -> Result<ShareLink> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let captured_at = unix_secs(frame.captured_at);
        let name = format!("selfie-{captured_at}-{sequence:04}");
        let file_name = format!("{name}.png");

        let document = self.config.output_dir.join(&file_name);
        render_document(frame, emotion, theme)?.save(&document)?;

        let expires_at = SystemTime::now() + Duration::from_secs(self.config.link_ttl_secs);
        let manifest = CaptureManifest {
            name: name.clone(),
            captured_at,
            emotion,
            theme: theme.to_string(),
            document: file_name.clone(),
            expires_at: unix_secs(expires_at),
        };
        let yaml = serde_yaml::to_string(&manifest)
            .map_err(|e| Error::PublishError(format!("Failed to serialize manifest: {e}")))?;
        std::fs::write(self.config.output_dir.join(format!("{name}.yaml")), yaml)?;

        log::info!("Published {} ({emotion})", document.display());

        Ok(ShareLink {
            url: self.link_for(&document, &file_name),
            expires_at,
        })
    }
}

/// One publish call running on a background thread
pub struct PublishWorker {
    receiver: Receiver<Result<ShareLink>>,
    handle: Option<JoinHandle<()>>,
}

impl PublishWorker {
    /// Start publishing `frame` in the background
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned
    pub fn spawn(publisher: Arc<dyn Publisher>, frame: CapturedFrame, emotion: Emotion, theme: String) -> Result<Self> {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("publish".to_string())
            .spawn(move || {
                let result = publisher.produce_and_publish(&frame, emotion, &theme);
                // The loop may have shut down; nothing left to report to
                let _ = sender.send(result);
            })?;

        Ok(Self {
            receiver,
            handle: Some(handle),
        })
    }

    /// Non-blocking check for the outcome
    pub fn try_finish(&mut self) -> Option<Result<ShareLink>> {
        let outcome = match self.receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(Error::PublishError(
                "Publish worker exited without a result".to_string(),
            )),
        };
        self.join();
        Some(outcome)
    }

    /// Block until the outcome is available
    ///
    /// # Errors
    ///
    /// Returns the publisher's error, or a publish error if the worker died
    pub fn wait(mut self) -> Result<ShareLink> {
        let outcome = self
            .receiver
            .recv()
            .map_err(|_| Error::PublishError("Publish worker exited without a result".to_string()))?;
        self.join();
        outcome
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Publish worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl Publisher for Failing {
        fn produce_and_publish(&self, _: &CapturedFrame, _: Emotion, _: &str) -> Result<ShareLink> {
            Err(Error::PublishError("storage unavailable".to_string()))
        }
    }

    #[test]
    fn test_default_config() {
        let config = PublishConfig::default();
        assert_eq!(config.output_dir, PathBuf::from("captures"));
        assert_eq!(config.link_ttl_secs, 24 * 60 * 60);
        assert!(config.base_url.is_none());
    }

    #[test]
    fn test_worker_reports_failure() {
        let frame = CapturedFrame::new(RgbImage::new(2, 2));
        let worker = PublishWorker::spawn(Arc::new(Failing), frame, Emotion::Happy, "t".to_string()).unwrap();
        assert!(matches!(worker.wait(), Err(Error::PublishError(_))));
    }

    #[test]
    fn test_caption_lines() {
        let captured_at = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let lines = caption_lines(captured_at, Emotion::Angry, Emotion::Angry.theme());
        assert_eq!(lines[0], Emotion::Angry.theme());
        assert_eq!(lines[1], "Emotion: angry");
        assert_eq!(lines[2], "Captured: 2023-11-14 22:13:20 UTC");
    }

    #[test]
    fn test_document_keeps_photo_and_adds_band() {
        let frame = CapturedFrame::new(RgbImage::from_pixel(320, 240, image::Rgb([200, 40, 90])));
        let page = render_document(&frame, Emotion::Happy, Emotion::Happy.theme()).unwrap();
        assert_eq!(page.dimensions(), (320, 240 + CAPTION_BAND_HEIGHT));
        assert_eq!(page.get_pixel(160, 120).0, [200, 40, 90]);
        assert_eq!(page.get_pixel(319, 240 + CAPTION_BAND_HEIGHT - 1).0, [255, 255, 255]);
    }

    #[test]
    fn test_link_uses_base_url() {
        let publisher = LocalPublisher::new(PublishConfig {
            base_url: Some("https://kiosk.example/p/".to_string()),
            ..PublishConfig::default()
        });
        let link = publisher.link_for(std::path::Path::new("captures/a.png"), "a.png");
        assert_eq!(link, "https://kiosk.example/p/a.png");
    }
}
