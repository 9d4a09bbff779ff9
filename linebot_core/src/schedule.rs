//! Declarative cadences for periodic work.
//!
//! Each periodic task owns an [`Every`] and asks it whether it is due; the
//! cadence remembers when it last fired.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Every {
    period: Duration,
    last: Option<Instant>,
}

impl Every {
    pub fn new(period: Duration) -> Self {
        Self { period, last: None }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// True when at least one period has passed since the last firing (or
    /// it never fired). Firing is recorded immediately.
    pub fn due(&mut self, now: Instant) -> bool {
        let ready = self
            .last
            .is_none_or(|t| now.saturating_duration_since(t) >= self.period);
        if ready {
            self.last = Some(now);
        }
        ready
    }

    /// Record an out-of-band firing so the next `due` waits a full period.
    pub fn mark(&mut self, now: Instant) {
        self.last = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_period() {
        let t0 = Instant::now();
        let mut e = Every::from_millis(60);
        assert!(e.due(t0));
        assert!(!e.due(t0 + Duration::from_millis(59)));
        assert!(e.due(t0 + Duration::from_millis(60)));
    }

    #[test]
    fn mark_defers_next_firing() {
        let t0 = Instant::now();
        let mut e = Every::from_millis(100);
        e.mark(t0);
        assert!(!e.due(t0 + Duration::from_millis(50)));
        assert!(e.due(t0 + Duration::from_millis(100)));
    }
}
