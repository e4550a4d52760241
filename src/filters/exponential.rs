use super::SignalFilter;

/// Exponential smoothing filter: `new = old + alpha * (sample - old)`
#[derive(Debug, Clone)]
pub struct ExponentialFilter {
    alpha: f32,
    value: Option<f32>,
}

impl ExponentialFilter {
    pub fn new(alpha: f32) -> Self {
        assert!(alpha > 0.0 && alpha <= 1.0, "Alpha must be in (0, 1]");
        Self { alpha, value: None }
    }

    /// Last smoothed value, if any sample has been seen
    pub fn value(&self) -> Option<f32> {
        self.value
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }
}

impl SignalFilter for ExponentialFilter {
    fn apply(&mut self, sample: f32) -> f32 {
        let smoothed = match self.value {
            Some(last) => last + self.alpha * (sample - last),
            None => sample,
        };
        self.value = Some(smoothed);
        smoothed
    }

    fn reset(&mut self) {
        self.value = None;
    }

    fn name(&self) -> &str {
        "ExponentialFilter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_filter() {
        let mut filter = ExponentialFilter::new(0.5);

        // First value passes through
        assert_eq!(filter.apply(10.0), 10.0);

        // Second value is smoothed
        assert_eq!(filter.apply(20.0), 15.0);
        assert_eq!(filter.value(), Some(15.0));
    }

    #[test]
    fn test_alpha_bounds() {
        // High alpha = less smoothing
        let mut fast = ExponentialFilter::new(0.9);
        fast.apply(10.0);
        assert!((fast.apply(20.0) - 19.0).abs() < 1e-4);

        // Low alpha = more smoothing
        let mut slow = ExponentialFilter::new(0.02);
        slow.apply(1.0);
        assert!((slow.apply(2.0) - 1.02).abs() < 1e-4);
    }

    #[test]
    fn test_reset() {
        let mut filter = ExponentialFilter::new(0.25);
        filter.apply(4.0);
        filter.reset();
        assert_eq!(filter.value(), None);
        assert_eq!(filter.apply(8.0), 8.0);
    }

    #[test]
    #[should_panic(expected = "Alpha must be in (0, 1]")]
    fn test_zero_alpha_rejected() {
        let _ = ExponentialFilter::new(0.0);
    }
}
