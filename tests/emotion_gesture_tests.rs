//! Tests for emotion labelling, thumbs-up rules and wave detection


use selfie_kiosk::{
    emotion::{classify_box, Emotion, EmotionConfig, EmotionEstimator, MeshLayout},
    gesture::{hand, GestureEstimator, GesturePolicy, LooseThumbsUp, StrictThumbsUp},
    keypoints::{FaceBox, HandDetection, Point2D},
    wave_detector::{WaveConfig, WaveDetector},
};
use test_helpers::*;

fn strict() -> GestureEstimator {
    GestureEstimator::new(GesturePolicy::Strict(StrictThumbsUp::default()))
}

fn loose() -> GestureEstimator {
    GestureEstimator::new(GesturePolicy::Loose(LooseThumbsUp::default()))
}

#[test]
fn test_no_face_reads_neutral() {
    let mut estimator = EmotionEstimator::default();
    let reading = estimator.estimate(None, Some(&mesh(90.0, 10.0)), 12_000.0);
    assert_eq!(reading.label, Emotion::Neutral);
    assert_eq!(reading.area, 12_000.0);
    assert!(reading.smile_score.is_none());
}

#[test]
fn test_box_fallback_without_mesh() {
    let config = EmotionConfig::default();
    let face = large_face();

    assert_eq!(classify_box(&face, 0.0, &config), Emotion::Neutral);
    assert_eq!(classify_box(&wide_face(), face.area(), &config), Emotion::Angry);

    // 30% growth beats the 22% threshold, and surprise wins over angry
    let grown = FaceBox::new(250.0, 130.0, 150.0 * 1.14, 120.0 * 1.14);
    assert_eq!(classify_box(&grown, wide_face().area(), &config), Emotion::Surprised);
}

#[test]
fn test_box_happy_ratio_override() {
    let config = EmotionConfig {
        box_happy_ratio: Some(1.12),
        ..EmotionConfig::default()
    };
    assert_eq!(classify_box(&large_face(), large_face().area(), &config), Emotion::Happy);

    // A jump in size still reads surprised
    let tall = FaceBox::new(0.0, 0.0, 100.0, 130.0);
    assert_eq!(classify_box(&tall, 6500.0, &config), Emotion::Surprised);

    let mut estimator = EmotionEstimator::new(config, MeshLayout::default());
    let reading = estimator.estimate(Some(&large_face()), None, 0.0);
    assert_eq!(reading.label, Emotion::Happy);
    assert!(reading.smile_score.is_none());
}

#[test]
fn test_smile_over_baseline_reads_happy() {
    let mut estimator = EmotionEstimator::default();
    let face = large_face();
    let mut area = 0.0;

    for _ in 0..15 {
        let reading = estimator.estimate(Some(&face), Some(&mesh(60.0, 10.0)), area);
        area = reading.area;
        assert_eq!(reading.label, Emotion::Neutral);
    }

    let reading = estimator.estimate(Some(&face), Some(&mesh(95.0, 10.0)), area);
    assert_eq!(reading.label, Emotion::Happy);
    assert!(reading.smile_score.is_some_and(|score| score >= estimator.config().smile_margin));
}

#[test]
fn test_open_mouth_needs_wider_smile() {
    let face = large_face();

    // Same widening, closed vs wide open mouth
    let mut closed = EmotionEstimator::default();
    let mut open = EmotionEstimator::default();
    closed.estimate(Some(&face), Some(&mesh(60.0, 80.0)), 0.0);
    open.estimate(Some(&face), Some(&mesh(60.0, 80.0)), 0.0);

    let closed_score = closed
        .estimate(Some(&face), Some(&mesh(80.0, 10.0)), face.area())
        .smile_score
        .unwrap_or_default();
    let open_score = open
        .estimate(Some(&face), Some(&mesh(80.0, 80.0)), face.area())
        .smile_score
        .unwrap_or_default();

    assert!(open_score < closed_score);
}

#[test]
fn test_mediapipe_layout_reads_its_own_indices() {
    let layout = MeshLayout::MEDIAPIPE_FACE_MESH;
    let mut points = vec![Point2D::new(0.0, 0.0); 468];
    points[layout.left_eye_outer] = Point2D::new(100.0, 100.0);
    points[layout.right_eye_outer] = Point2D::new(200.0, 100.0);
    points[layout.mouth_left] = Point2D::new(120.0, 200.0);
    points[layout.mouth_right] = Point2D::new(180.0, 200.0);
    points[layout.upper_lip] = Point2D::new(150.0, 195.0);
    points[layout.lower_lip] = Point2D::new(150.0, 205.0);

    let mut estimator = EmotionEstimator::new(EmotionConfig::default(), layout);
    let reading = estimator.estimate(Some(&large_face()), Some(&points), 0.0);
    assert_eq!(reading.smile_score, Some(0.0));
    assert_eq!(estimator.smile_tracker().baseline(), Some(0.6));
}

#[test]
fn test_short_mesh_falls_back_to_box() {
    let mut estimator = EmotionEstimator::default();
    let short = vec![Point2D::new(1.0, 1.0); 20];
    let reading = estimator.estimate(Some(&wide_face()), Some(&short), wide_face().area());
    assert_eq!(reading.smile_score, Some(0.0));
    assert_eq!(reading.label, Emotion::Angry);
}

#[test]
fn test_gesture_rules_on_fixture_hands() {
    assert!(strict().estimate(&[strict_thumbs_up(0.9)]));
    assert!(!strict().estimate(&[strict_thumbs_up(0.69)]));
    assert!(!strict().estimate(&[loose_thumbs_up()]));
    assert!(!strict().estimate(&[open_palm()]));

    assert!(loose().estimate(&[strict_thumbs_up(0.1)]));
    assert!(loose().estimate(&[loose_thumbs_up()]));
    assert!(!loose().estimate(&[open_palm()]));
}

#[test]
fn test_any_hand_can_signal() {
    assert!(strict().estimate(&[open_palm(), strict_thumbs_up(0.8)]));
    assert!(!strict().estimate(&[]));
}

#[test]
fn test_incomplete_hand_never_matches() {
    let partial = HandDetection::new(vec![Point2D::new(0.0, 0.0); 5]).with_confidence(1.0);
    assert!(!strict().estimate(&[partial.clone()]));
    assert!(!loose().estimate(&[partial]));
}

#[test]
fn test_upside_down_thumb_rejected() {
    let mut detection = strict_thumbs_up(0.9);
    detection.keypoints[hand::THUMB_TIP] = Point2D::new(392.0, 410.0);
    assert!(!strict().estimate(&[detection.clone()]));
    assert!(!loose().estimate(&[detection]));
}

#[test]
fn test_wave_with_custom_threshold() {
    let mut detector = WaveDetector::new(WaveConfig {
        min_swing: 10.0,
        swings_for_beam: 2,
    });

    let fired: Vec<bool> = [100.0, 115.0, 100.0, 115.0]
        .into_iter()
        .map(|x| detector.update(&[hand_with_index_at(x)]))
        .collect();
    assert_eq!(fired, vec![false, false, false, true]);
}

#[test]
fn test_wave_only_follows_first_hand() {
    let mut detector = WaveDetector::default();
    for i in 0..20 {
        let x = if i % 2 == 0 { 100.0 } else { 300.0 };
        let still = hand_with_index_at(200.0);
        assert!(!detector.update(&[still, hand_with_index_at(x)]));
    }
}
