//! Latest-value-wins debouncing for autosave.
//!
//! Time is passed in by the caller rather than read here, so the session can be
//! driven by a real clock in an app and by hand in tests.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Replaces any pending value and restarts the quiet period at `now`.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// The pending value, once `delay` has passed since the last push.
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, pushed)) if now.saturating_duration_since(*pushed) >= self.delay => {
                self.pending.take().map(|(value, _)| value)
            }
            _ => None,
        }
    }

    /// The pending value regardless of timing (flush).
    pub fn take(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(1000);

    #[test]
    fn test_not_due_before_delay() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.push("a", start);
        assert!(debouncer.take_due(start + Duration::from_millis(999)).is_none());
        assert!(debouncer.is_pending());
        assert_eq!(debouncer.take_due(start + DELAY), Some("a"));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_latest_value_wins_and_restarts_timer() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.push(1, start);
        debouncer.push(2, start + Duration::from_millis(600));
        assert!(debouncer.take_due(start + Duration::from_millis(1200)).is_none());
        assert_eq!(debouncer.take_due(start + Duration::from_millis(1600)), Some(2));
    }

    #[test]
    fn test_flush_ignores_timing() {
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.push("x", Instant::now());
        assert_eq!(debouncer.take(), Some("x"));
        assert_eq!(debouncer.take(), None);
    }
}
