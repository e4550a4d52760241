//! Signal filtering for the per-frame pipeline.
//!
//! Two kinds of filters live here:
//! - scalar smoothers ([`SignalFilter`]) used by the emotion estimator to
//!   calm down noisy geometric ratios
//! - boolean trigger filters ([`TriggerFilter`]) that turn a flickering
//!   per-frame signal into a single edge-triggered event

/// Exponential moving average for scalar smoothing
pub mod exponential;

/// Accumulate/decay hold counter
pub mod hold;

/// Refractory frame counter used after a trigger fires
pub mod cooldown;

use cooldown::CooldownGate;
use hold::{HoldConfig, HoldFilter};

/// Trait for scalar smoothing filters
pub trait SignalFilter: Send + Sync {
    /// Feed one sample and return the smoothed value
    fn apply(&mut self, sample: f32) -> f32;

    /// Reset filter state
    fn reset(&mut self);

    /// Get filter name
    fn name(&self) -> &str;
}

/// Trait for filters that turn a raw boolean signal into trigger events
pub trait TriggerFilter: Send + Sync {
    /// Feed one frame of raw signal; returns true only on the frame the trigger fires
    fn update(&mut self, signal: bool) -> bool;

    /// Reset filter state
    fn reset(&mut self);

    /// Get filter name
    fn name(&self) -> &str;
}

/// Hold filter guarded by a cooldown.
///
/// While the cooldown is active the hold counter is frozen, so a pose that is
/// still held after a trigger cannot pre-charge the next one.
#[derive(Debug, Clone)]
pub struct TriggerGate {
    hold: HoldFilter,
    cooldown: CooldownGate,
}

impl TriggerGate {
    /// Create a gate from explicit parts
    #[must_use]
    pub fn new(hold: HoldFilter, cooldown: CooldownGate) -> Self {
        Self { hold, cooldown }
    }

    /// Create a gate from hold configuration
    #[must_use]
    pub fn from_config(config: &HoldConfig) -> Self {
        Self::new(
            HoldFilter::new(config.threshold, config.decay_step),
            CooldownGate::new(config.cooldown_frames),
        )
    }

    /// Let one frame of cooldown elapse without feeding the hold counter.
    ///
    /// Callers that skip [`TriggerFilter::update`] on a frame call this instead,
    /// so the cooldown always runs at one step per frame.
    pub fn tick(&mut self) {
        self.cooldown.tick();
    }

    /// Drop accumulated hold progress, leaving the cooldown untouched
    pub fn reset_hold(&mut self) {
        self.hold.reset();
    }

    /// Current hold counter value
    #[must_use]
    pub fn counter(&self) -> u32 {
        self.hold.counter()
    }

    /// Frames of cooldown still to elapse
    #[must_use]
    pub fn cooldown_remaining(&self) -> u32 {
        self.cooldown.remaining()
    }

    /// Hold threshold in frames
    #[must_use]
    pub fn threshold(&self) -> u32 {
        self.hold.threshold()
    }
}

impl TriggerFilter for TriggerGate {
    fn update(&mut self, signal: bool) -> bool {
        if self.cooldown.tick() {
            return false;
        }

        if self.hold.update(signal) {
            self.cooldown.arm();
            return true;
        }

        false
    }

    fn reset(&mut self) {
        self.hold.reset();
        self.cooldown.reset();
    }

    fn name(&self) -> &str {
        "TriggerGate"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(threshold: u32, decay: u32, cooldown: u32) -> TriggerGate {
        TriggerGate::from_config(&HoldConfig {
            threshold,
            decay_step: decay,
            cooldown_frames: cooldown,
        })
    }

    #[test]
    fn test_gate_fires_at_threshold() {
        let mut gate = gate(3, 3, 5);
        assert!(!gate.update(true));
        assert!(!gate.update(true));
        assert!(gate.update(true));
        assert_eq!(gate.counter(), 0);
        assert_eq!(gate.cooldown_remaining(), 5);
    }

    #[test]
    fn test_counter_frozen_during_cooldown() {
        let mut gate = gate(2, 3, 3);
        gate.update(true);
        assert!(gate.update(true));

        for _ in 0..3 {
            assert!(!gate.update(true));
            assert_eq!(gate.counter(), 0);
        }
        assert_eq!(gate.cooldown_remaining(), 0);

        assert!(!gate.update(true));
        assert!(gate.update(true));
    }

    #[test]
    fn test_tick_only_drains_cooldown() {
        let mut gate = gate(2, 3, 2);
        gate.update(true);
        gate.update(true);
        gate.tick();
        gate.tick();
        gate.tick();
        assert_eq!(gate.cooldown_remaining(), 0);
        assert_eq!(gate.counter(), 0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut gate = gate(2, 3, 10);
        gate.update(true);
        gate.update(true);
        gate.reset();
        assert_eq!(gate.cooldown_remaining(), 0);
        assert_eq!(gate.counter(), 0);
        assert_eq!(gate.name(), "TriggerGate");
    }
}
