//! Thumbs-up recognition from 21-point hand keypoints.

use crate::keypoints::{HandDetection, Point2D};
use serde::{Deserialize, Serialize};

/// Canonical hand keypoint indices
pub mod hand {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_DIP: usize = 7;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_DIP: usize = 11;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_MCP: usize = 13;
    pub const RING_PIP: usize = 14;
    pub const RING_DIP: usize = 15;
    pub const RING_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;
}

/// (tip, pip) pairs of the four curled fingers
const CURLED_FINGERS: [(usize, usize); 4] = [
    (hand::INDEX_TIP, hand::INDEX_PIP),
    (hand::MIDDLE_TIP, hand::MIDDLE_PIP),
    (hand::RING_TIP, hand::RING_PIP),
    (hand::PINKY_TIP, hand::PINKY_PIP),
];

/// Angle in degrees between `from -> to` and straight up; `None` for a zero-length vector
#[must_use]
pub fn angle_to_up(from: &Point2D, to: &Point2D) -> Option<f32> {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let length = dx.hypot(dy);
    if !(length > 0.0) {
        return None;
    }
    // dot((dx, dy), (0, -1)) / |v|
    let cos = (-dy / length).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

/// True when `tip` sits more than `margin` pixels below `pip`
#[must_use]
pub fn tip_below_pip(tip: &Point2D, pip: &Point2D, margin: f32) -> bool {
    tip.y - pip.y > margin
}

/// Strict thumbs-up: confident hand, upright thumb, fingers curled, palm level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrictThumbsUp {
    pub min_confidence: f32,
    pub max_thumb_angle_deg: f32,
    pub curl_margin: f32,
    pub palm_margin: f32,
}

impl Default for StrictThumbsUp {
    fn default() -> Self {
        Self {
            min_confidence: 0.7,
            max_thumb_angle_deg: 30.0,
            curl_margin: 12.0,
            palm_margin: 8.0,
        }
    }
}

impl StrictThumbsUp {
    #[must_use]
    pub fn matches(&self, detection: &HandDetection) -> bool {
        if !detection.is_complete() || detection.confidence < self.min_confidence {
            return false;
        }
        let kp = &detection.keypoints;

        let thumb_up = angle_to_up(&kp[hand::THUMB_MCP], &kp[hand::THUMB_TIP])
            .is_some_and(|angle| angle < self.max_thumb_angle_deg);
        if !thumb_up {
            return false;
        }

        let curled = CURLED_FINGERS
            .iter()
            .all(|&(tip, pip)| tip_below_pip(&kp[tip], &kp[pip], self.curl_margin));

        curled && kp[hand::WRIST].y > kp[hand::INDEX_MCP].y - self.palm_margin
    }
}

/// Loose thumbs-up: thumb tip clearly above index and middle tips
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LooseThumbsUp {
    pub margin: f32,
}

impl Default for LooseThumbsUp {
    fn default() -> Self {
        Self { margin: 10.0 }
    }
}

impl LooseThumbsUp {
    #[must_use]
    pub fn matches(&self, detection: &HandDetection) -> bool {
        if !detection.is_complete() {
            return false;
        }
        let kp = &detection.keypoints;
        let thumb = kp[hand::THUMB_TIP].y;
        thumb < kp[hand::INDEX_TIP].y - self.margin && thumb < kp[hand::MIDDLE_TIP].y - self.margin
    }
}

/// Which thumbs-up rule qualifies a hand
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GesturePolicy {
    Strict(StrictThumbsUp),
    Loose(LooseThumbsUp),
}

impl GesturePolicy {
    #[must_use]
    pub fn matches(&self, detection: &HandDetection) -> bool {
        match self {
            GesturePolicy::Strict(rule) => rule.matches(detection),
            GesturePolicy::Loose(rule) => rule.matches(detection),
        }
    }
}

impl Default for GesturePolicy {
    fn default() -> Self {
        GesturePolicy::Strict(StrictThumbsUp::default())
    }
}

/// Per-frame gesture estimator
#[derive(Debug, Clone, Default)]
pub struct GestureEstimator {
    policy: GesturePolicy,
}

impl GestureEstimator {
    #[must_use]
    pub fn new(policy: GesturePolicy) -> Self {
        Self { policy }
    }

    /// True iff any hand qualifies this frame
    #[must_use]
    pub fn estimate(&self, hands: &[HandDetection]) -> bool {
        hands.iter().any(|detection| self.policy.matches(detection))
    }

    #[must_use]
    pub fn policy(&self) -> &GesturePolicy {
        &self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fist with the thumb pointing straight up, wrist at (100, 200)
    fn thumbs_up() -> Vec<Point2D> {
        let mut kp = vec![Point2D::new(100.0, 150.0); 21];
        kp[hand::WRIST] = Point2D::new(100.0, 200.0);
        kp[hand::THUMB_MCP] = Point2D::new(90.0, 150.0);
        kp[hand::THUMB_IP] = Point2D::new(90.0, 120.0);
        kp[hand::THUMB_TIP] = Point2D::new(92.0, 90.0);
        kp[hand::INDEX_MCP] = Point2D::new(110.0, 150.0);
        for (tip, pip) in CURLED_FINGERS {
            kp[pip] = Point2D::new(115.0, 150.0);
            kp[tip] = Point2D::new(115.0, 170.0);
        }
        kp
    }

    #[test]
    fn test_angle_to_up() {
        let origin = Point2D::new(0.0, 0.0);
        assert!(angle_to_up(&origin, &Point2D::new(0.0, -10.0)).unwrap().abs() < 1e-4);
        assert!((angle_to_up(&origin, &Point2D::new(10.0, 0.0)).unwrap() - 90.0).abs() < 1e-4);
        assert!((angle_to_up(&origin, &Point2D::new(0.0, 10.0)).unwrap() - 180.0).abs() < 1e-3);
        assert!(angle_to_up(&origin, &origin).is_none());
    }

    #[test]
    fn test_strict_accepts_thumbs_up() {
        let rule = StrictThumbsUp::default();
        assert!(rule.matches(&HandDetection::new(thumbs_up()).with_confidence(0.9)));
    }

    #[test]
    fn test_strict_rejects_low_confidence() {
        let rule = StrictThumbsUp::default();
        assert!(!rule.matches(&HandDetection::new(thumbs_up()).with_confidence(0.6)));
    }

    #[test]
    fn test_strict_rejects_tilted_thumb() {
        let mut kp = thumbs_up();
        kp[hand::THUMB_TIP] = Point2D::new(140.0, 120.0);
        assert!(!StrictThumbsUp::default().matches(&HandDetection::new(kp)));
    }

    #[test]
    fn test_strict_rejects_open_finger() {
        let mut kp = thumbs_up();
        kp[hand::RING_TIP] = Point2D::new(115.0, 160.0); // only 10px below pip
        assert!(!StrictThumbsUp::default().matches(&HandDetection::new(kp)));
    }

    #[test]
    fn test_strict_rejects_raised_wrist() {
        let mut kp = thumbs_up();
        kp[hand::WRIST] = Point2D::new(100.0, 140.0);
        assert!(!StrictThumbsUp::default().matches(&HandDetection::new(kp)));
    }

    #[test]
    fn test_loose_rule() {
        let rule = LooseThumbsUp::default();
        assert!(rule.matches(&HandDetection::new(thumbs_up())));

        let mut kp = thumbs_up();
        kp[hand::THUMB_TIP].y = kp[hand::INDEX_TIP].y - 5.0;
        assert!(!rule.matches(&HandDetection::new(kp)));
    }

    #[test]
    fn test_incomplete_hands_never_qualify() {
        let partial = HandDetection::new(thumbs_up()[..20].to_vec());
        assert!(!StrictThumbsUp::default().matches(&partial));
        assert!(!LooseThumbsUp::default().matches(&partial));
    }

    #[test]
    fn test_estimator_any_hand() {
        let estimator = GestureEstimator::default();
        let bad = HandDetection::new(vec![Point2D::default(); 21]);
        let good = HandDetection::new(thumbs_up()).with_confidence(0.9);

        assert!(!estimator.estimate(&[]));
        assert!(!estimator.estimate(&[bad.clone()]));
        assert!(estimator.estimate(&[bad, good]));
    }
}
