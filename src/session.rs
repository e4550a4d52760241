//! Capture lifecycle: `idle -> armed -> generating -> done -> idle`.
//!
//! [`CaptureStateMachine::process_frame`] is the whole per-frame step. It is
//! driven by an external loop with explicit instants, so a test can replay a
//! synthetic frame sequence without a camera, models or wall-clock waits.
//! Publishing is requested through [`SessionEvent::CaptureRequested`] and its
//! outcome is reported back with [`CaptureStateMachine::publish_finished`].

use crate::{
    constants::{
        DEFAULT_CHECK_INTERVAL_MS, DEFAULT_COUNTDOWN_SECS, DEFAULT_DONE_HOLD_MS, DEFAULT_FLOURISH_MS,
        DEFAULT_MIN_FACE_AREA, DEFAULT_TICK_INTERVAL_MS,
    },
    countdown::{Countdown, CountdownStatus},
    emotion::{Emotion, EmotionConfig, EmotionEstimator, MeshLayout},
    filters::{hold::HoldConfig, TriggerFilter, TriggerGate},
    gesture::{GestureEstimator, GesturePolicy, LooseThumbsUp, StrictThumbsUp},
    keypoints::DetectionFrame,
    publish::ShareLink,
    votes::VoteAggregator,
    wave_detector::{WaveConfig, WaveDetector},
    Result,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Capture phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Armed,
    Generating,
    Done,
}

impl Phase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Armed => "armed",
            Phase::Generating => "generating",
            Phase::Done => "done",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation hint for the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    #[default]
    Standby,
    Aura,
    Flames,
    Shockwave,
    Beam,
    Heart,
}

impl Effect {
    #[must_use]
    pub const fn for_emotion(emotion: Emotion) -> Self {
        match emotion {
            Emotion::Happy => Effect::Aura,
            Emotion::Angry => Effect::Flames,
            Emotion::Surprised => Effect::Shockwave,
            Emotion::Neutral => Effect::Standby,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Effect::Standby => "standby",
            Effect::Aura => "aura",
            Effect::Flames => "flames",
            Effect::Shockwave => "shockwave",
            Effect::Beam => "beam",
            Effect::Heart => "heart",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What arms the kiosk from `idle`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TriggerPolicy {
    /// Held strict thumbs-up
    StrictGesture(StrictThumbsUp),
    /// Held loose thumbs-up
    LooseGesture(LooseThumbsUp),
    /// A `happy` emotion reading
    SmileScore,
}

impl TriggerPolicy {
    /// Gesture rule, if this policy is gesture driven
    #[must_use]
    pub fn gesture(&self) -> Option<GesturePolicy> {
        match self {
            TriggerPolicy::StrictGesture(rule) => Some(GesturePolicy::Strict(*rule)),
            TriggerPolicy::LooseGesture(rule) => Some(GesturePolicy::Loose(*rule)),
            TriggerPolicy::SmileScore => None,
        }
    }

    /// Hold tuning that goes with this policy
    #[must_use]
    pub fn default_hold(&self) -> HoldConfig {
        match self {
            TriggerPolicy::SmileScore => HoldConfig::smile(),
            _ => HoldConfig::strict_gesture(),
        }
    }

    /// Invitation shown while idle
    #[must_use]
    pub const fn invite(&self) -> &'static str {
        match self {
            TriggerPolicy::SmileScore => "Smile to take a selfie",
            _ => "Hold a thumbs-up to take a selfie",
        }
    }
}

impl Default for TriggerPolicy {
    fn default() -> Self {
        TriggerPolicy::StrictGesture(StrictThumbsUp::default())
    }
}

/// Countdown and done-phase timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub countdown_secs: u32,
    pub tick_interval_ms: u64,
    pub check_interval_ms: u64,
    pub flourish_ms: u64,
    pub done_hold_ms: u64,
}

impl TimingConfig {
    #[must_use]
    pub fn done_duration(&self) -> Duration {
        Duration::from_millis(self.flourish_ms + self.done_hold_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            check_interval_ms: DEFAULT_CHECK_INTERVAL_MS,
            flourish_ms: DEFAULT_FLOURISH_MS,
            done_hold_ms: DEFAULT_DONE_HOLD_MS,
        }
    }
}

/// Session tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub trigger: TriggerPolicy,
    /// Hold tuning; the trigger policy's default when unset
    pub hold: Option<HoldConfig>,
    pub emotion: EmotionConfig,
    pub mesh_layout: MeshLayout,
    pub timing: TimingConfig,
    pub wave: WaveConfig,
    /// Face box area (px²) a face must exceed before it can arm the kiosk
    pub min_face_area: f32,
}

impl SessionConfig {
    /// Strict thumbs-up deployment
    #[must_use]
    pub fn strict_gesture() -> Self {
        Self::default()
    }

    /// Loose thumbs-up deployment
    #[must_use]
    pub fn loose_gesture() -> Self {
        Self {
            trigger: TriggerPolicy::LooseGesture(LooseThumbsUp::default()),
            ..Self::default()
        }
    }

    /// Smile-to-arm deployment
    #[must_use]
    pub fn smile_score() -> Self {
        Self {
            trigger: TriggerPolicy::SmileScore,
            ..Self::default()
        }
    }

    /// Hold tuning actually in effect
    #[must_use]
    pub fn effective_hold(&self) -> HoldConfig {
        self.hold.unwrap_or_else(|| self.trigger.default_hold())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            trigger: TriggerPolicy::default(),
            hold: None,
            emotion: EmotionConfig::default(),
            mesh_layout: MeshLayout::default(),
            timing: TimingConfig::default(),
            wave: WaveConfig::default(),
            min_face_area: DEFAULT_MIN_FACE_AREA,
        }
    }
}

/// Something that happened during a step
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// `idle -> armed`
    Armed,
    /// Countdown reached zero: capture the current frame and publish it
    CaptureRequested { emotion: Emotion, theme: &'static str },
    Published(ShareLink),
    PublishFailed(String),
    /// `done -> idle`
    Reset,
}

/// Read-outs for the overlay
#[derive(Debug, Clone, PartialEq)]
pub struct Hud {
    pub face_present: bool,
    pub hand_count: usize,
    pub emotion: Emotion,
    pub phase: Phase,
    pub effect: Effect,
    /// Visible seconds left while armed
    pub countdown: Option<u32>,
    /// Hold counter as a fraction of the threshold
    pub hold_progress: f32,
    pub smile_score: Option<f32>,
    pub notice: Option<String>,
    pub share_link: Option<ShareLink>,
    pub invite: &'static str,
}

impl Hud {
    /// Title line for the current phase and effect
    #[must_use]
    pub fn headline(&self) -> String {
        match self.phase {
            Phase::Armed => format!("Capturing... {}s", self.countdown.unwrap_or(0)),
            Phase::Generating => "Generating...".to_string(),
            Phase::Done => match &self.notice {
                Some(notice) => notice.clone(),
                None => "Your photo is ready".to_string(),
            },
            Phase::Idle => match self.effect {
                Effect::Aura => "HAPPY HERO".to_string(),
                Effect::Flames => "RAGE MODE".to_string(),
                Effect::Shockwave => "SHOCKWAVE".to_string(),
                Effect::Beam => "Ready for your photo".to_string(),
                Effect::Standby | Effect::Heart => self.invite.to_string(),
            },
        }
    }
}

/// Result of one step
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutput {
    pub phase: Phase,
    pub emotion: Emotion,
    pub effect: Effect,
    pub hud: Hud,
    pub events: Vec<SessionEvent>,
}

#[derive(Debug, Clone)]
enum PhaseState {
    Idle,
    /// The countdown lives and dies with the armed phase
    Armed { countdown: Countdown },
    Generating { emotion: Emotion },
    Done { entered_at: Instant },
}

impl PhaseState {
    fn phase(&self) -> Phase {
        match self {
            PhaseState::Idle => Phase::Idle,
            PhaseState::Armed { .. } => Phase::Armed,
            PhaseState::Generating { .. } => Phase::Generating,
            PhaseState::Done { .. } => Phase::Done,
        }
    }
}

/// All mutable session state
#[derive(Debug, Clone)]
pub struct SessionState {
    phase: PhaseState,
    gate: TriggerGate,
    emotion: EmotionEstimator,
    votes: VoteAggregator,
    wave: WaveDetector,
    previous_area: f32,
    current_emotion: Emotion,
    smile_score: Option<f32>,
    effect: Effect,
    captured_emotion: Option<Emotion>,
    notice: Option<String>,
    share_link: Option<ShareLink>,
}

impl SessionState {
    fn new(config: &SessionConfig) -> Self {
        Self {
            phase: PhaseState::Idle,
            gate: TriggerGate::from_config(&config.effective_hold()),
            emotion: EmotionEstimator::new(config.emotion, config.mesh_layout),
            votes: VoteAggregator::new(),
            wave: WaveDetector::new(config.wave),
            previous_area: 0.0,
            current_emotion: Emotion::Neutral,
            smile_score: None,
            effect: Effect::Standby,
            captured_emotion: None,
            notice: None,
            share_link: None,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase.phase()
    }

    #[must_use]
    pub fn hold_counter(&self) -> u32 {
        self.gate.counter()
    }

    #[must_use]
    pub fn cooldown_remaining(&self) -> u32 {
        self.gate.cooldown_remaining()
    }

    #[must_use]
    pub fn votes(&self) -> &VoteAggregator {
        &self.votes
    }

    #[must_use]
    pub fn previous_area(&self) -> f32 {
        self.previous_area
    }

    #[must_use]
    pub fn emotion(&self) -> Emotion {
        self.current_emotion
    }

    #[must_use]
    pub fn effect(&self) -> Effect {
        self.effect
    }

    /// Visible countdown, only while armed
    #[must_use]
    pub fn countdown_remaining(&self) -> Option<u32> {
        match &self.phase {
            PhaseState::Armed { countdown } => Some(countdown.remaining()),
            _ => None,
        }
    }

    /// Dominant emotion resolved at the last countdown zero
    #[must_use]
    pub fn captured_emotion(&self) -> Option<Emotion> {
        self.captured_emotion
    }

    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    #[must_use]
    pub fn share_link(&self) -> Option<&ShareLink> {
        self.share_link.as_ref()
    }
}

/// Drives the capture lifecycle from per-frame detections
#[derive(Debug, Clone)]
pub struct CaptureStateMachine {
    config: SessionConfig,
    gesture: Option<GestureEstimator>,
    state: SessionState,
}

impl CaptureStateMachine {
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        let gesture = config.trigger.gesture().map(GestureEstimator::new);
        let state = SessionState::new(&config);
        Self { config, gesture, state }
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Advance one frame
    pub fn process_frame(&mut self, frame: &DetectionFrame, now: Instant) -> FrameOutput {
        let reading = self.state.emotion.estimate(
            frame.face.as_ref(),
            frame.mesh.as_deref(),
            self.state.previous_area,
        );
        self.state.previous_area = reading.area;
        self.state.current_emotion = reading.label;
        self.state.smile_score = reading.smile_score;
        self.state.effect = Effect::for_emotion(reading.label);

        let mut events = Vec::new();
        match self.state.phase {
            PhaseState::Idle => self.step_idle(frame, now, &mut events),
            PhaseState::Armed { .. } => self.step_armed(now, &mut events),
            PhaseState::Generating { .. } => self.state.gate.tick(),
            PhaseState::Done { entered_at } => self.step_done(entered_at, now, &mut events),
        }

        self.output(frame, events)
    }

    /// Report the outcome of the publish requested at countdown zero.
    ///
    /// Ignored outside `generating`.
    pub fn publish_finished(&mut self, result: Result<ShareLink>, now: Instant) -> Vec<SessionEvent> {
        if !matches!(self.state.phase, PhaseState::Generating { .. }) {
            log::warn!("Publish result arrived in phase {}, ignoring", self.state.phase());
            return Vec::new();
        }

        let event = match result {
            Ok(link) => {
                log::info!("Share link ready: {}", link.url);
                self.state.share_link = Some(link.clone());
                self.state.notice = None;
                SessionEvent::Published(link)
            }
            Err(e) => {
                log::error!("Publishing failed: {}", e);
                let notice = format!("Upload failed: {e}");
                self.state.notice = Some(notice.clone());
                SessionEvent::PublishFailed(notice)
            }
        };

        self.state.phase = PhaseState::Done { entered_at: now };
        self.state.effect = Effect::Heart;
        log::info!("Phase generating -> done");
        vec![event]
    }

    fn step_idle(&mut self, frame: &DetectionFrame, now: Instant, events: &mut Vec<SessionEvent>) {
        let large_face = frame
            .face
            .as_ref()
            .is_some_and(|face| face.area() > self.config.min_face_area);

        if large_face {
            let raw = match &self.gesture {
                Some(gesture) => gesture.estimate(&frame.hands),
                None => self.state.current_emotion == Emotion::Happy,
            };
            if self.state.gate.update(raw) {
                self.arm(now, events);
                return;
            }
        } else {
            self.state.gate.reset_hold();
            self.state.gate.tick();
        }

        if self.state.wave.update(&frame.hands) {
            log::debug!("Wave detected");
            self.state.effect = Effect::Beam;
        }
    }

    fn arm(&mut self, now: Instant, events: &mut Vec<SessionEvent>) {
        let timing = &self.config.timing;
        let countdown = Countdown::start(
            timing.countdown_secs,
            Duration::from_millis(timing.tick_interval_ms),
            Duration::from_millis(timing.check_interval_ms),
            now,
        );

        self.state.phase = PhaseState::Armed { countdown };
        self.state.votes.reset();
        self.state.wave.reset();
        self.state.effect = Effect::Beam;
        log::info!("Phase idle -> armed ({}s countdown)", timing.countdown_secs);
        events.push(SessionEvent::Armed);
    }

    fn step_armed(&mut self, now: Instant, events: &mut Vec<SessionEvent>) {
        self.state.gate.tick();
        self.state.votes.record(self.state.current_emotion);

        let PhaseState::Armed { countdown } = &mut self.state.phase else {
            return;
        };
        if countdown.poll(now) != CountdownStatus::Expired {
            return;
        }

        let emotion = self.state.votes.dominant();
        log::info!(
            "Countdown finished, dominant emotion {} from {} frames",
            emotion,
            self.state.votes.total()
        );

        // Dropping the armed state drops its countdown
        self.state.phase = PhaseState::Generating { emotion };
        self.state.captured_emotion = Some(emotion);
        log::info!("Phase armed -> generating");
        events.push(SessionEvent::CaptureRequested {
            emotion,
            theme: emotion.theme(),
        });
    }

    fn step_done(&mut self, entered_at: Instant, now: Instant, events: &mut Vec<SessionEvent>) {
        self.state.gate.tick();

        if now.saturating_duration_since(entered_at) >= self.config.timing.done_duration() {
            self.state.phase = PhaseState::Idle;
            self.state.effect = Effect::Standby;
            self.state.notice = None;
            self.state.share_link = None;
            self.state.gate.reset_hold();
            log::info!("Phase done -> idle");
            events.push(SessionEvent::Reset);
        } else {
            self.state.effect = Effect::Heart;
        }
    }

    fn output(&self, frame: &DetectionFrame, events: Vec<SessionEvent>) -> FrameOutput {
        let state = &self.state;
        let threshold = state.gate.threshold().max(1);
        #[allow(clippy::cast_precision_loss)]
        let hold_progress = state.gate.counter() as f32 / threshold as f32;

        let hud = Hud {
            face_present: frame.face.is_some(),
            hand_count: frame.hands.len(),
            emotion: state.current_emotion,
            phase: state.phase(),
            effect: state.effect,
            countdown: state.countdown_remaining(),
            hold_progress,
            smile_score: state.smile_score,
            notice: state.notice.clone(),
            share_link: state.share_link.clone(),
            invite: self.config.trigger.invite(),
        };

        FrameOutput {
            phase: state.phase(),
            emotion: state.current_emotion,
            effect: state.effect,
            hud,
            events,
        }
    }
}
