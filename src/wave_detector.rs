//! Idle-time wave detection from the index fingertip's horizontal motion.

use crate::{gesture::hand, keypoints::HandDetection};
use serde::{Deserialize, Serialize};

/// Wave detector tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    /// Frame-to-frame horizontal travel (pixels) that counts as a swing
    pub min_swing: f32,
    /// Swings needed beyond this count to report a wave
    pub swings_for_beam: u32,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            min_swing: 35.0,
            swings_for_beam: 5,
        }
    }
}

/// Counts fast horizontal swings of the first hand's index fingertip
#[derive(Debug, Clone, Default)]
pub struct WaveDetector {
    config: WaveConfig,
    last_x: Option<f32>,
    swings: u32,
}

impl WaveDetector {
    #[must_use]
    pub fn new(config: WaveConfig) -> Self {
        Self {
            config,
            last_x: None,
            swings: 0,
        }
    }

    /// Feed one frame of hands; true on the frame a wave completes
    pub fn update(&mut self, hands: &[HandDetection]) -> bool {
        let Some(tip) = hands.first().and_then(|h| h.keypoint(hand::INDEX_TIP)) else {
            self.reset();
            return false;
        };

        let mut waved = false;
        if let Some(last_x) = self.last_x {
            if (tip.x - last_x).abs() > self.config.min_swing {
                self.swings += 1;
            }
            if self.swings > self.config.swings_for_beam {
                waved = true;
                self.swings = 0;
            }
        }
        self.last_x = Some(tip.x);
        waved
    }

    /// Swings counted so far
    #[must_use]
    pub fn swings(&self) -> u32 {
        self.swings
    }

    pub fn reset(&mut self) {
        self.last_x = None;
        self.swings = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypoints::Point2D;

    fn hand_at(x: f32) -> HandDetection {
        let mut keypoints = vec![Point2D::new(0.0, 0.0); 21];
        keypoints[hand::INDEX_TIP] = Point2D::new(x, 100.0);
        HandDetection::new(keypoints)
    }

    #[test]
    fn test_six_swings_make_a_wave() {
        let mut detector = WaveDetector::default();
        assert!(!detector.update(&[hand_at(100.0)]));

        let mut fired = Vec::new();
        for i in 1..=6 {
            let x = if i % 2 == 0 { 100.0 } else { 160.0 };
            fired.push(detector.update(&[hand_at(x)]));
        }
        assert_eq!(fired, vec![false, false, false, false, false, true]);
        assert_eq!(detector.swings(), 0);
    }

    #[test]
    fn test_small_motion_is_ignored() {
        let mut detector = WaveDetector::default();
        for i in 0..20 {
            assert!(!detector.update(&[hand_at(100.0 + (i % 2) as f32 * 20.0)]));
        }
        assert_eq!(detector.swings(), 0);
    }

    #[test]
    fn test_losing_the_hand_resets() {
        let mut detector = WaveDetector::default();
        detector.update(&[hand_at(100.0)]);
        detector.update(&[hand_at(200.0)]);
        assert_eq!(detector.swings(), 1);

        assert!(!detector.update(&[]));
        assert_eq!(detector.swings(), 0);
        // No previous x after the gap, so the jump back is not a swing
        detector.update(&[hand_at(100.0)]);
        assert_eq!(detector.swings(), 0);
    }
}
