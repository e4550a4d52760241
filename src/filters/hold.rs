use super::TriggerFilter;
use crate::constants::{DEFAULT_COOLDOWN_FRAMES, DEFAULT_DECAY_STEP, DEFAULT_HOLD_THRESHOLD};
use serde::{Deserialize, Serialize};

/// Hold/cooldown tuning for the arming trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoldConfig {
    /// Counter value at which the trigger fires
    pub threshold: u32,

    /// Counter decrement applied on a negative frame
    pub decay_step: u32,

    /// Frames suppressed after each trigger
    pub cooldown_frames: u32,
}

impl HoldConfig {
    /// Tuning for the strict thumbs-up path (~0.6s hold at 60Hz)
    #[must_use]
    pub const fn strict_gesture() -> Self {
        Self {
            threshold: DEFAULT_HOLD_THRESHOLD,
            decay_step: DEFAULT_DECAY_STEP,
            cooldown_frames: DEFAULT_COOLDOWN_FRAMES,
        }
    }

    /// Tuning for the low-friction smile path: a single happy frame arms
    #[must_use]
    pub const fn smile() -> Self {
        Self {
            threshold: 1,
            decay_step: DEFAULT_DECAY_STEP,
            cooldown_frames: DEFAULT_COOLDOWN_FRAMES,
        }
    }
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self::strict_gesture()
    }
}

/// Accumulate/decay counter.
///
/// Rising is cheap (+1 per positive frame) and falling is fast (`-decay_step`
/// per negative frame, floored at zero), so single-frame misses barely dent a
/// held pose while a dropped pose drains quickly.
#[derive(Debug, Clone)]
pub struct HoldFilter {
    threshold: u32,
    decay_step: u32,
    counter: u32,
}

impl HoldFilter {
    pub fn new(threshold: u32, decay_step: u32) -> Self {
        assert!(threshold > 0, "Threshold must be greater than 0");
        Self {
            threshold,
            decay_step,
            counter: 0,
        }
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

impl TriggerFilter for HoldFilter {
    fn update(&mut self, signal: bool) -> bool {
        self.counter = if signal {
            self.counter.saturating_add(1)
        } else {
            self.counter.saturating_sub(self.decay_step)
        };

        if self.counter >= self.threshold {
            self.counter = 0;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.counter = 0;
    }

    fn name(&self) -> &str {
        "HoldFilter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flicker_does_not_fire() {
        let mut filter = HoldFilter::new(36, 3);
        for _ in 0..35 {
            assert!(!filter.update(true));
        }
        assert!(!filter.update(false));
        assert_eq!(filter.counter(), 32);
        for _ in 0..3 {
            assert!(!filter.update(true));
        }
        assert!(filter.update(true));
        assert_eq!(filter.counter(), 0);
    }

    #[test]
    fn test_decay_floors_at_zero() {
        let mut filter = HoldFilter::new(10, 3);
        filter.update(true);
        filter.update(false);
        filter.update(false);
        assert_eq!(filter.counter(), 0);
    }

    #[test]
    fn test_threshold_of_one_fires_immediately() {
        let mut filter = HoldFilter::new(1, 3);
        assert!(!filter.update(false));
        assert!(filter.update(true));
        assert!(filter.update(true));
    }

    #[test]
    #[should_panic(expected = "Threshold must be greater than 0")]
    fn test_zero_threshold_rejected() {
        let _ = HoldFilter::new(0, 3);
    }
}
