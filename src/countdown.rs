//! Armed countdown as two periodic schedules polled with explicit instants.
//!
//! A slow ticker decrements the visible count, a fast checker notices when it
//! reaches zero. Nothing runs in the background: the owner calls
//! [`Countdown::poll`] once per frame and drops the value to cancel it.

use std::time::{Duration, Instant};

/// Result of polling a countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStatus {
    /// Still counting; `remaining` is the visible number of seconds
    Running { remaining: u32 },
    /// Zero was observed on a check boundary
    Expired,
}

#[derive(Debug, Clone)]
pub struct Countdown {
    remaining: u32,
    tick_interval: Duration,
    check_interval: Duration,
    next_tick: Instant,
    next_check: Instant,
}

impl Countdown {
    /// Start counting down from `seconds` at `now`.
    ///
    /// Zero intervals are raised to one millisecond.
    #[must_use]
    pub fn start(seconds: u32, tick_interval: Duration, check_interval: Duration, now: Instant) -> Self {
        let tick_interval = tick_interval.max(Duration::from_millis(1));
        let check_interval = check_interval.max(Duration::from_millis(1));
        Self {
            remaining: seconds,
            tick_interval,
            check_interval,
            next_tick: now + tick_interval,
            next_check: now + check_interval,
        }
    }

    /// Apply every tick and check due at `now`.
    ///
    /// Ticks missed during a slow frame are caught up in one call. Expiry is
    /// only reported once a check boundary has passed with the count at zero.
    pub fn poll(&mut self, now: Instant) -> CountdownStatus {
        while self.remaining > 0 && now >= self.next_tick {
            self.remaining -= 1;
            self.next_tick += self.tick_interval;
        }

        let mut expired = false;
        while now >= self.next_check {
            // A check only sees ticks that happened at or before its own boundary
            if self.remaining == 0 && self.next_tick - self.tick_interval <= self.next_check {
                expired = true;
            }
            self.next_check += self.check_interval;
            if expired {
                break;
            }
        }

        if expired {
            CountdownStatus::Expired
        } else {
            CountdownStatus::Running {
                remaining: self.remaining,
            }
        }
    }

    /// Visible seconds left
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn countdown(seconds: u32, start: Instant) -> Countdown {
        Countdown::start(seconds, Duration::from_secs(1), Duration::from_millis(150), start)
    }

    #[test]
    fn test_visible_count_ticks_per_second() {
        let start = Instant::now();
        let mut cd = countdown(10, start);

        assert_eq!(cd.poll(start), CountdownStatus::Running { remaining: 10 });
        assert_eq!(
            cd.poll(start + Duration::from_millis(999)),
            CountdownStatus::Running { remaining: 10 }
        );
        assert_eq!(
            cd.poll(start + Duration::from_millis(1000)),
            CountdownStatus::Running { remaining: 9 }
        );
        assert_eq!(
            cd.poll(start + Duration::from_millis(3500)),
            CountdownStatus::Running { remaining: 7 }
        );
    }

    #[test]
    fn test_expiry_waits_for_check_boundary() {
        let start = Instant::now();
        let mut cd = countdown(10, start);

        // Count hits zero at 10.0s; the next check boundary is 10.05s
        assert_eq!(
            cd.poll(start + Duration::from_millis(10_000)),
            CountdownStatus::Running { remaining: 0 }
        );
        assert_eq!(cd.poll(start + Duration::from_millis(10_050)), CountdownStatus::Expired);
    }

    #[test]
    fn test_slow_frame_catches_up() {
        let start = Instant::now();
        let mut cd = countdown(3, start);
        assert_eq!(cd.poll(start + Duration::from_secs(30)), CountdownStatus::Expired);
        assert_eq!(cd.remaining(), 0);
    }

    #[test]
    fn test_zero_seconds_expires_on_first_check() {
        let start = Instant::now();
        let mut cd = countdown(0, start);
        assert_eq!(cd.poll(start), CountdownStatus::Running { remaining: 0 });
        assert_eq!(cd.poll(start + Duration::from_millis(150)), CountdownStatus::Expired);
    }

    #[test]
    fn test_zero_intervals_are_guarded() {
        let start = Instant::now();
        let mut cd = Countdown::start(2, Duration::ZERO, Duration::ZERO, start);
        assert_eq!(cd.poll(start + Duration::from_millis(5)), CountdownStatus::Expired);
    }
}
