//! Majority vote over emotion labels seen while armed.

use crate::emotion::Emotion;

/// Per-label frame counts for one armed window
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteAggregator {
    counts: [u32; 4],
}

impl VoteAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.counts = [0; 4];
    }

    pub fn record(&mut self, emotion: Emotion) {
        let bucket = &mut self.counts[emotion.index()];
        *bucket = bucket.saturating_add(1);
    }

    #[must_use]
    pub fn count(&self, emotion: Emotion) -> u32 {
        self.counts[emotion.index()]
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Label with the highest count; ties go to the earlier label in
    /// [`Emotion::ALL`], so an empty window resolves to `Happy`.
    #[must_use]
    pub fn dominant(&self) -> Emotion {
        let mut best = Emotion::ALL[0];
        for emotion in Emotion::ALL {
            if self.count(emotion) > self.count(best) {
                best = emotion;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_majority() {
        let mut votes = VoteAggregator::new();
        for emotion in [Emotion::Angry, Emotion::Neutral, Emotion::Angry] {
            votes.record(emotion);
        }
        assert_eq!(votes.dominant(), Emotion::Angry);
        assert_eq!(votes.total(), 3);
    }

    #[test]
    fn test_ties_follow_declaration_order() {
        let mut votes = VoteAggregator::new();
        votes.record(Emotion::Neutral);
        votes.record(Emotion::Surprised);
        assert_eq!(votes.dominant(), Emotion::Surprised);

        votes.record(Emotion::Happy);
        assert_eq!(votes.dominant(), Emotion::Happy);
    }

    #[test]
    fn test_reset_and_empty() {
        let mut votes = VoteAggregator::new();
        assert!(votes.is_empty());
        assert_eq!(votes.dominant(), Emotion::Happy);

        votes.record(Emotion::Angry);
        votes.reset();
        assert!(votes.is_empty());
        assert_eq!(votes.count(Emotion::Angry), 0);
    }
}
