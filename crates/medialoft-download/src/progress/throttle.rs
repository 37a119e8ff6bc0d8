//! Progress throttling.

use std::time::{Duration, Instant};

/// Rate-limiter for progress relays of a single transfer.
///
/// A zero interval lets every sample through.
#[derive(Debug)]
pub struct ProgressThrottle {
    last_emit: Option<Instant>,
    min_interval: Duration,
}

impl ProgressThrottle {
    /// Create a new throttle with the specified minimum interval.
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            last_emit: None,
            min_interval,
        }
    }

    /// Build a throttle from the configured relay interval.
    pub fn from_config(interval: Option<Duration>) -> Self {
        Self::new(interval.unwrap_or(Duration::ZERO))
    }

    /// Check whether a sample with this fraction should be relayed now.
    ///
    /// Completion (`1.0`) is always relayed.
    pub fn should_emit(&mut self, fraction: f64) -> bool {
        let now = Instant::now();
        let due = match self.last_emit {
            Some(last) => now.duration_since(last) >= self.min_interval,
            None => true,
        };
        if due || fraction >= 1.0 {
            self.last_emit = Some(now);
            true
        } else {
            false
        }
    }
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_first_emit() {
        let mut throttle = ProgressThrottle::new(Duration::from_millis(100));
        assert!(throttle.should_emit(0.1));
    }

    #[test]
    fn test_throttle_respects_interval() {
        let mut throttle = ProgressThrottle::new(Duration::from_millis(50));
        assert!(throttle.should_emit(0.1));
        assert!(!throttle.should_emit(0.2)); // Too soon

        std::thread::sleep(Duration::from_millis(60));
        assert!(throttle.should_emit(0.3));
    }

    #[test]
    fn test_completion_bypasses_interval() {
        let mut throttle = ProgressThrottle::new(Duration::from_secs(60));
        assert!(throttle.should_emit(0.5));
        assert!(throttle.should_emit(1.0));
    }

    #[test]
    fn test_unthrottled_config() {
        let mut throttle = ProgressThrottle::from_config(None);
        assert!((0..5).all(|i| throttle.should_emit(f64::from(i) / 10.0)));
    }
}
