//! Benchmarks for the per-frame pipeline

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use selfie_kiosk::{
    emotion::{Emotion, EmotionEstimator},
    filters::{hold::HoldConfig, TriggerFilter, TriggerGate},
    gesture::{hand, GestureEstimator, GesturePolicy, LooseThumbsUp, StrictThumbsUp},
    keypoints::{DetectionFrame, FaceBox, HandDetection, Point2D},
    session::{CaptureStateMachine, SessionConfig},
    votes::VoteAggregator,
};
use std::time::{Duration, Instant};

fn jitter(amount: f32) -> f32 {
    (rand::random::<f32>() - 0.5) * amount
}

fn thumbs_up() -> HandDetection {
    let mut kp = vec![Point2D::new(400.0, 350.0); 21];
    kp[hand::WRIST] = Point2D::new(400.0, 400.0);
    kp[hand::THUMB_MCP] = Point2D::new(390.0, 350.0);
    kp[hand::THUMB_TIP] = Point2D::new(392.0, 290.0);
    kp[hand::INDEX_MCP] = Point2D::new(410.0, 350.0);
    for (pip, tip) in [
        (hand::INDEX_PIP, hand::INDEX_TIP),
        (hand::MIDDLE_PIP, hand::MIDDLE_TIP),
        (hand::RING_PIP, hand::RING_TIP),
        (hand::PINKY_PIP, hand::PINKY_TIP),
    ] {
        kp[pip] = Point2D::new(420.0, 350.0);
        kp[tip] = Point2D::new(420.0, 375.0);
    }
    HandDetection::new(kp).with_confidence(0.9)
}

/// Noisy 68-point mesh around a resting mouth
fn noisy_meshes(count: usize) -> Vec<Vec<Point2D>> {
    (0..count)
        .map(|_| {
            let mut points = vec![Point2D::new(320.0, 220.0); 68];
            points[36] = Point2D::new(270.0 + jitter(2.0), 200.0 + jitter(2.0));
            points[45] = Point2D::new(370.0 + jitter(2.0), 200.0 + jitter(2.0));
            points[48] = Point2D::new(290.0 + jitter(3.0), 260.0);
            points[54] = Point2D::new(350.0 + jitter(3.0), 260.0);
            points[62] = Point2D::new(320.0, 255.0 + jitter(1.0));
            points[66] = Point2D::new(320.0, 265.0 + jitter(1.0));
            points
        })
        .collect()
}

fn benchmark_trigger_gate(c: &mut Criterion) {
    let mut group = c.benchmark_group("trigger_gate");

    // ~90% positive frames, like a held but flickering pose
    let signal: Vec<bool> = (0..600).map(|_| rand::random::<f32>() < 0.9).collect();

    group.bench_function("sequence_600", |b| {
        b.iter(|| {
            let mut gate = TriggerGate::from_config(&HoldConfig::strict_gesture());
            let mut fired = 0;
            for &raw in &signal {
                if gate.update(black_box(raw)) {
                    fired += 1;
                }
            }
            black_box(fired)
        });
    });

    group.bench_function("vote_600", |b| {
        let labels: Vec<usize> = (0..600).map(|_| rand::random::<usize>() % 4).collect();
        b.iter(|| {
            let mut votes = VoteAggregator::new();
            for &i in &labels {
                votes.record(Emotion::ALL[i]);
            }
            black_box(votes.dominant())
        });
    });

    group.finish();
}

fn benchmark_estimators(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimators");

    let face = FaceBox::new(260.0, 140.0, 120.0, 150.0);
    let meshes = noisy_meshes(100);

    group.bench_function("emotion_mesh_100", |b| {
        b.iter(|| {
            let mut estimator = EmotionEstimator::default();
            let mut area = 0.0;
            for mesh in &meshes {
                let reading = estimator.estimate(Some(&face), Some(mesh), area);
                area = reading.area;
                black_box(reading.label);
            }
        });
    });

    group.bench_function("emotion_box_only", |b| {
        let mut estimator = EmotionEstimator::default();
        b.iter(|| black_box(estimator.estimate(Some(black_box(&face)), None, 18_000.0)));
    });

    let hands = vec![thumbs_up(), thumbs_up()];
    let policies = [
        ("strict", GesturePolicy::Strict(StrictThumbsUp::default())),
        ("loose", GesturePolicy::Loose(LooseThumbsUp::default())),
    ];
    for (name, policy) in policies {
        let estimator = GestureEstimator::new(policy);
        group.bench_with_input(BenchmarkId::new("gesture", name), &hands, |b, hands| {
            b.iter(|| black_box(estimator.estimate(black_box(hands))));
        });
    }

    group.finish();
}

fn benchmark_process_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_frame");

    let meshes = noisy_meshes(60);
    let frames: Vec<DetectionFrame> = meshes
        .into_iter()
        .map(|mesh| DetectionFrame {
            face: Some(FaceBox::new(260.0 + jitter(4.0), 140.0, 120.0, 150.0)),
            hands: vec![thumbs_up()],
            mesh: Some(mesh),
        })
        .collect();

    for (name, config) in [
        ("strict", SessionConfig::strict_gesture()),
        ("smile", SessionConfig::smile_score()),
    ] {
        group.bench_with_input(BenchmarkId::new("one_second", name), &frames, |b, frames| {
            b.iter(|| {
                let mut machine = CaptureStateMachine::new(config.clone());
                let start = Instant::now();
                for (i, frame) in frames.iter().enumerate() {
                    let now = start + Duration::from_millis(16 * i as u64);
                    black_box(machine.process_frame(frame, now));
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_trigger_gate,
    benchmark_estimators,
    benchmark_process_frame
);
criterion_main!(benches);
