/// Refractory frame counter.
///
/// Armed to a fixed frame count after each trigger and drained one frame at a
/// time toward zero.
#[derive(Debug, Clone)]
pub struct CooldownGate {
    frames: u32,
    remaining: u32,
}

impl CooldownGate {
    pub fn new(frames: u32) -> Self {
        Self { frames, remaining: 0 }
    }

    /// Start a full cooldown period
    pub fn arm(&mut self) {
        self.remaining = self.frames;
    }

    /// Elapse one frame. Returns true if the gate was active for this frame.
    pub fn tick(&mut self) -> bool {
        if self.remaining > 0 {
            self.remaining -= 1;
            true
        } else {
            false
        }
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn reset(&mut self) {
        self.remaining = 0;
    }
}
