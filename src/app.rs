//! Main application module: camera, keypoints, state machine, publisher and overlay.

use crate::{
    config::Config,
    error::{Error, Result},
    face_detection::FaceDetector,
    hand_detection::HandDetector,
    keypoints::{DetectionFrame, KeypointSource, OnnxKeypointSource},
    mesh_detection::MeshDetector,
    publish::{CapturedFrame, LocalPublisher, PublishWorker, Publisher},
    session::{CaptureStateMachine, Effect, FrameOutput, Hud, SessionEvent},
    utils::clamp_to_i32,
};
use log::{debug, error, info, warn};
use qrcode::{Color, QrCode};
use opencv::{
    core::{Mat, Point, Rect, Scalar, CV_8UC3},
    highgui::{self, WINDOW_NORMAL},
    imgproc::{self, FILLED, FONT_HERSHEY_SIMPLEX, LINE_8},
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Camera index or video file path
    pub video_source: VideoSource,
    /// GUI display mode
    pub gui_mode: GuiMode,
    /// Mirror frames horizontally
    pub mirror: bool,
    /// Draw the FPS counter on the preview
    pub debug: bool,
}

/// Video source type
#[derive(Debug, Clone, PartialEq)]
pub enum VideoSource {
    /// Webcam index
    Camera(i32),
    /// Video file path
    File(String),
}

/// GUI display mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GuiMode {
    /// Preview window with HUD
    Preview,
    /// Preview window without HUD
    Plain,
    /// No GUI (headless)
    None,
}

impl AppConfig {
    /// Derive the run settings from a loaded configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let video_source = match &config.camera.video_file {
            Some(path) => VideoSource::File(path.display().to_string()),
            None => VideoSource::Camera(config.camera.index),
        };
        let gui_mode = match (config.display.gui, config.display.show_hud) {
            (false, _) => GuiMode::None,
            (true, true) => GuiMode::Preview,
            (true, false) => GuiMode::Plain,
        };
        Self {
            video_source,
            gui_mode,
            mirror: config.camera.mirror,
            debug: false,
        }
    }
}

/// Overlay colour (BGR) for an effect
#[must_use]
pub fn effect_color(effect: Effect) -> Scalar {
    match effect {
        Effect::Standby => Scalar::new(200.0, 200.0, 200.0, 0.0),
        Effect::Aura => Scalar::new(0.0, 215.0, 255.0, 0.0),
        Effect::Flames => Scalar::new(0.0, 69.0, 255.0, 0.0),
        Effect::Shockwave => Scalar::new(255.0, 221.0, 136.0, 0.0),
        Effect::Beam => Scalar::new(255.0, 255.0, 0.0, 0.0),
        Effect::Heart => Scalar::new(180.0, 105.0, 255.0, 0.0),
    }
}

/// Status lines drawn under the headline
#[must_use]
pub fn hud_lines(hud: &Hud) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Face: {}  Hands: {}",
            if hud.face_present { "yes" } else { "-" },
            hud.hand_count
        ),
        format!("Emotion: {}  Phase: {}", hud.emotion, hud.phase),
    ];

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let hold_percent = (hud.hold_progress.clamp(0.0, 1.0) * 100.0).round() as u32;
    lines.push(format!("Hold: {hold_percent}%"));

    if let Some(score) = hud.smile_score {
        lines.push(format!("Smile: {score:+.3}"));
    }
    if let Some(link) = &hud.share_link {
        lines.push(format!("Link: {}", link.url));
    }
    lines
}

/// Pixels per QR module on the overlay
const QR_MODULE_PIXELS: i32 = 4;

/// Light border around the QR code, in modules
const QR_QUIET_ZONE: i32 = 2;

/// Render a share link as a black-on-white QR code (BGR)
///
/// # Errors
///
/// Returns an error if the link does not fit in a QR code or drawing fails
pub fn qr_code_image(url: &str) -> Result<Mat> {
    let code = QrCode::new(url.as_bytes())
        .map_err(|e| Error::InvalidInput(format!("Share link cannot be encoded as a QR code: {e}")))?;
    let modules = code.width();
    let modules_i32 =
        i32::try_from(modules).map_err(|_| Error::InvalidInput(format!("QR code too wide: {modules}")))?;

    let side = (modules_i32 + 2 * QR_QUIET_ZONE) * QR_MODULE_PIXELS;
    let mut image = Mat::new_rows_cols_with_default(side, side, CV_8UC3, Scalar::all(255.0))?;

    for (i, color) in code.to_colors().into_iter().enumerate() {
        if color != Color::Dark {
            continue;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let (col, row) = ((i % modules) as i32, (i / modules) as i32);
        imgproc::rectangle(
            &mut image,
            Rect::new(
                (col + QR_QUIET_ZONE) * QR_MODULE_PIXELS,
                (row + QR_QUIET_ZONE) * QR_MODULE_PIXELS,
                QR_MODULE_PIXELS,
                QR_MODULE_PIXELS,
            ),
            Scalar::all(0.0),
            FILLED,
            LINE_8,
            0,
        )?;
    }
    Ok(image)
}

/// Main application struct
pub struct KioskApp {
    config: AppConfig,
    keypoints: OnnxKeypointSource,
    machine: CaptureStateMachine,
    publisher: Arc<dyn Publisher>,
    video_capture: VideoCapture,
    worker: Option<PublishWorker>,
    /// QR code of the current share link
    share_qr: Option<(String, Mat)>,
    window_title: String,
}

impl KioskApp {
    /// Open the video source and load every model.
    ///
    /// # Errors
    ///
    /// Returns an error if the video source cannot be opened or any model fails to load
    pub fn new(settings: &Config, config: AppConfig) -> Result<Self> {
        info!("Initializing Selfie Kiosk application");

        // Initialize video capture
        let video_capture = match &config.video_source {
            VideoSource::Camera(index) => {
                info!("Opening camera {}", index);
                let mut cap = VideoCapture::new(*index, videoio::CAP_ANY)?;

                // Reduce buffer size for lower latency (webcam only)
                cap.set(CAP_PROP_BUFFERSIZE, 1.0)?;
                cap.set(CAP_PROP_FRAME_WIDTH, f64::from(settings.camera.width))?;
                cap.set(CAP_PROP_FRAME_HEIGHT, f64::from(settings.camera.height))?;
                cap
            }
            VideoSource::File(path) => {
                info!("Opening video file: {}", path);
                VideoCapture::from_file(path, videoio::CAP_ANY)?
            }
        };
        if !video_capture.is_opened()? {
            return Err(Error::CameraError(format!(
                "Could not open video source {:?}",
                config.video_source
            )));
        }

        // Initialize components
        settings.validate_models()?;
        let face_detector = FaceDetector::new(
            &settings.models.face_detector,
            settings.face_detection.confidence_threshold,
            settings.face_detection.iou_threshold,
        )?;
        let hand_detector = HandDetector::new(
            &settings.models.hand_landmarks,
            settings.hand_detection.presence_threshold,
        )?;
        let mesh_detector = match &settings.models.face_landmarks {
            Some(path) => Some(MeshDetector::new(path)?),
            None => {
                warn!("No face landmark model configured, emotion uses box geometry only");
                None
            }
        };
        let keypoints = OnnxKeypointSource::new(
            face_detector,
            hand_detector,
            mesh_detector,
            settings.face_detection.roi_expansion,
        );

        let session = settings.session_config();
        info!(
            "Trigger policy {:?}, hold threshold {}",
            session.trigger,
            session.effective_hold().threshold
        );
        let machine = CaptureStateMachine::new(session);
        let publisher: Arc<dyn Publisher> = Arc::new(LocalPublisher::new(settings.publish.clone()));

        // Create GUI window if needed
        let window_title = settings.display.window_title.clone();
        if config.gui_mode != GuiMode::None {
            highgui::named_window(&window_title, WINDOW_NORMAL)?;
        }

        Ok(Self {
            config,
            keypoints,
            machine,
            publisher,
            video_capture,
            worker: None,
            share_qr: None,
            window_title,
        })
    }

    /// Run the main application loop
    ///
    /// # Errors
    ///
    /// Returns an error on camera or display failures
    pub fn run(&mut self) -> Result<()> {
        info!("Starting main application loop");

        let mut frame_count: u64 = 0;
        let mut fps_frames: u64 = 0;
        let mut last_fps_update = Instant::now();
        let mut fps = 0.0;

        loop {
            // Read frame from video source
            let mut frame = Mat::default();
            if !self.video_capture.read(&mut frame)? || frame.empty() {
                if matches!(self.config.video_source, VideoSource::File(_)) {
                    info!("End of video file reached");
                    break;
                }
                warn!("Failed to read frame, retrying...");
                continue;
            }

            if self.config.mirror {
                let temp = frame.clone();
                opencv::core::flip(&temp, &mut frame, 1)?;
            }

            let output = self.step(&frame)?;
            self.poll_publisher();

            // Update FPS counter
            frame_count += 1;
            fps_frames += 1;
            let elapsed = last_fps_update.elapsed();
            if elapsed >= Duration::from_secs(1) {
                #[allow(clippy::cast_precision_loss)]
                {
                    fps = fps_frames as f64 / elapsed.as_secs_f64();
                }
                fps_frames = 0;
                last_fps_update = Instant::now();
                debug!("Frame {}: {:.1} fps, phase {}", frame_count, fps, output.phase);
            }

            // Display results
            if self.config.gui_mode != GuiMode::None {
                self.refresh_share_qr(&output.hud);
                self.display_results(&frame, &output, fps)?;

                // Check for exit
                let key = highgui::wait_key(1)?;
                if key == 27 || key == i32::from(b'q') {
                    info!("Exit requested by user");
                    break;
                }
            }
        }

        // Let an in-flight publish land before exiting
        if let Some(worker) = self.worker.take() {
            info!("Waiting for pending publish");
            match worker.wait() {
                Ok(link) => info!("Share link ready: {}", link.url),
                Err(e) => error!("Publishing failed: {}", e),
            }
        }

        info!("Application shutting down");
        Ok(())
    }

    /// Detect, step the state machine and act on its events
    fn step(&mut self, frame: &Mat) -> Result<FrameOutput> {
        let detections = match self.keypoints.detect(frame) {
            Ok(detections) => detections,
            Err(e) => {
                warn!("Detection failed, treating frame as empty: {}", e);
                DetectionFrame::empty()
            }
        };

        let output = self.machine.process_frame(&detections, Instant::now());
        for event in &output.events {
            match event {
                SessionEvent::CaptureRequested { emotion, theme } => {
                    info!("Capturing selfie ({emotion}: {theme})");
                    if let Err(e) = self.start_publish(frame, *emotion, theme) {
                        error!("Could not start publishing: {}", e);
                        self.machine.publish_finished(Err(e), Instant::now());
                    }
                }
                SessionEvent::Armed => info!("Countdown started"),
                SessionEvent::Reset => info!("Ready for the next guest"),
                SessionEvent::Published(_) | SessionEvent::PublishFailed(_) => {}
            }
        }
        Ok(output)
    }

    fn start_publish(&mut self, frame: &Mat, emotion: crate::emotion::Emotion, theme: &str) -> Result<()> {
        let captured = CapturedFrame::from_mat(frame)?;
        let worker = PublishWorker::spawn(Arc::clone(&self.publisher), captured, emotion, theme.to_string())?;
        self.worker = Some(worker);
        Ok(())
    }

    fn poll_publisher(&mut self) {
        let Some(worker) = self.worker.as_mut() else {
            return;
        };
        if let Some(result) = worker.try_finish() {
            self.worker = None;
            for event in self.machine.publish_finished(result, Instant::now()) {
                debug!("Publish event: {:?}", event);
            }
        }
    }

    /// Keep the cached QR code in step with the link on the HUD
    fn refresh_share_qr(&mut self, hud: &Hud) {
        let Some(link) = &hud.share_link else {
            self.share_qr = None;
            return;
        };
        if self.share_qr.as_ref().is_some_and(|(url, _)| *url == link.url) {
            return;
        }
        self.share_qr = match qr_code_image(&link.url) {
            Ok(image) => Some((link.url.clone(), image)),
            Err(e) => {
                warn!("Could not render share link QR code: {}", e);
                None
            }
        };
    }

    /// Display preview with overlay
    #[allow(clippy::cast_possible_truncation)]
    fn display_results(&self, frame: &Mat, output: &FrameOutput, fps: f64) -> Result<()> {
        let mut display_frame = frame.clone();

        if self.config.gui_mode == GuiMode::Preview {
            let color = effect_color(output.effect);
            let (width, height) = (display_frame.cols(), display_frame.rows());

            // Effect frame around the preview
            imgproc::rectangle(
                &mut display_frame,
                Rect::new(0, 0, width, height),
                color,
                12,
                LINE_8,
                0,
            )?;

            imgproc::put_text(
                &mut display_frame,
                &output.hud.headline(),
                Point::new(20, 50),
                FONT_HERSHEY_SIMPLEX,
                1.2,
                color,
                3,
                LINE_8,
                false,
            )?;

            let mut y = 90;
            for line in hud_lines(&output.hud) {
                imgproc::put_text(
                    &mut display_frame,
                    &line,
                    Point::new(20, y),
                    FONT_HERSHEY_SIMPLEX,
                    0.6,
                    Scalar::new(255.0, 255.0, 255.0, 0.0),
                    1,
                    LINE_8,
                    false,
                )?;
                y += 25;
            }

            // Big countdown digit in the middle of the frame
            if let Some(count) = output.hud.countdown {
                imgproc::put_text(
                    &mut display_frame,
                    &count.to_string(),
                    Point::new(width / 2 - 40, height / 2 + 40),
                    FONT_HERSHEY_SIMPLEX,
                    4.0,
                    color,
                    8,
                    LINE_8,
                    false,
                )?;
            }

            // Scannable share link in the top-right corner
            if let Some((_, qr)) = &self.share_qr {
                let (side, margin) = (qr.cols(), 20);
                if side + 2 * margin <= width && side + 2 * margin <= height {
                    let mut corner = display_frame.roi_mut(Rect::new(width - side - margin, margin, side, side))?;
                    qr.copy_to(&mut corner)?;
                }
            }
        }

        if self.config.debug {
            let height = display_frame.rows();
            imgproc::put_text(
                &mut display_frame,
                &format!("FPS: {:.1}", fps),
                Point::new(20, clamp_to_i32(height as f32 - 20.0, 0, height)),
                FONT_HERSHEY_SIMPLEX,
                0.6,
                Scalar::new(0.0, 255.0, 0.0, 0.0),
                1,
                LINE_8,
                false,
            )?;
        }

        highgui::imshow(&self.window_title, &display_frame)?;
        Ok(())
    }
}
