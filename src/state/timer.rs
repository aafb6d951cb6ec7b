//! Recognition deadline tracking
//!
//! A single deadline is armed when the exchange starts listening. Each tick the
//! timer is checked against the tick's timestamp; once the window has elapsed
//! it fires exactly once and disarms itself.

use std::time::{Duration, Instant};

/// Default recognition window
pub const RECOGNITION_TIMEOUT: Duration = Duration::from_secs(15);

/// One-shot deadline for the listening state
#[derive(Debug, Clone)]
pub struct RecognitionTimer {
    window: Duration,
    armed_at: Option<Instant>,
}

impl RecognitionTimer {
    /// Create a disarmed timer with the given window
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            armed_at: None,
        }
    }

    /// Length of the recognition window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Start the window at `now`, replacing any previous deadline
    pub fn arm(&mut self, now: Instant) {
        self.armed_at = Some(now);
    }

    pub fn disarm(&mut self) {
        self.armed_at = None;
    }

    pub fn is_armed(&self) -> bool {
        self.armed_at.is_some()
    }

    /// Returns true (and disarms) if the deadline has passed at `now`
    pub fn expired(&mut self, now: Instant) -> bool {
        match self.armed_at {
            Some(armed_at) if now.saturating_duration_since(armed_at) >= self.window => {
                self.armed_at = None;
                true
            }
            _ => false,
        }
    }

    /// Fraction of the window still remaining at `now`, in `[0.0, 1.0]`
    ///
    /// A disarmed timer has nothing remaining.
    pub fn remaining(&self, now: Instant) -> f64 {
        let Some(armed_at) = self.armed_at else {
            return 0.0;
        };
        if self.window.is_zero() {
            return 0.0;
        }
        let elapsed = now.saturating_duration_since(armed_at);
        let left = self.window.saturating_sub(elapsed);
        left.as_secs_f64() / self.window.as_secs_f64()
    }
}

impl Default for RecognitionTimer {
    fn default() -> Self {
        Self::new(RECOGNITION_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disarmed_timer_never_fires() {
        let mut timer = RecognitionTimer::new(Duration::from_secs(1));
        let now = Instant::now();
        assert!(!timer.expired(now + Duration::from_secs(60)));
        assert_eq!(timer.remaining(now), 0.0);
    }

    #[test]
    fn test_fires_once_after_window() {
        let mut timer = RecognitionTimer::new(Duration::from_secs(10));
        let t0 = Instant::now();
        timer.arm(t0);

        assert!(!timer.expired(t0 + Duration::from_secs(9)));
        assert!(timer.expired(t0 + Duration::from_secs(10)));
        assert!(!timer.is_armed());
        assert!(!timer.expired(t0 + Duration::from_secs(11)));
    }

    #[test]
    fn test_remaining_counts_down() {
        let mut timer = RecognitionTimer::new(Duration::from_secs(10));
        let t0 = Instant::now();
        timer.arm(t0);

        assert_eq!(timer.remaining(t0), 1.0);
        let half = timer.remaining(t0 + Duration::from_secs(5));
        assert!((half - 0.5).abs() < 1e-9);
        assert_eq!(timer.remaining(t0 + Duration::from_secs(20)), 0.0);
    }

    #[test]
    fn test_rearm_restarts_window() {
        let mut timer = RecognitionTimer::new(Duration::from_secs(10));
        let t0 = Instant::now();
        timer.arm(t0);
        timer.arm(t0 + Duration::from_secs(8));
        assert!(!timer.expired(t0 + Duration::from_secs(12)));
    }
}
