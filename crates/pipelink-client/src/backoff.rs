//! Linear reconnect backoff.
//!
//! `current = minimum + floor((maximum - minimum) * failures / 100)`, clamped to
//! `[minimum, maximum]`. The ramp is linear and saturates after 100 failures.

use std::time::Duration;

use crate::config::BackoffSection;

#[derive(Debug, Clone)]
pub struct Backoff {
    minimum: Duration,
    maximum: Duration,
    current: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(minimum: Duration, maximum: Duration) -> Self {
        let maximum = maximum.max(minimum);
        Self {
            minimum,
            maximum,
            current: minimum,
            failures: 0,
        }
    }

    pub fn from_config(cfg: &BackoffSection) -> Self {
        Self::new(
            Duration::from_millis(cfg.min_ms),
            Duration::from_millis(cfg.max_ms),
        )
    }

    /// Record one failed attempt and return the delay to wait before the next.
    pub fn next_delay(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);

        let min = self.minimum.as_millis();
        let max = self.maximum.as_millis();
        let ramp = (max - min) * u128::from(self.failures) / 100;
        let ms = (min + ramp).clamp(min, max);

        self.current = Duration::from_millis(u64::try_from(ms).unwrap_or(u64::MAX));
        self.current
    }

    /// Called once the handshake has fully completed.
    pub fn reset(&mut self) {
        self.failures = 0;
        self.current = self.minimum;
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn failure_count(&self) -> u32 {
        self.failures
    }

    pub fn minimum(&self) -> Duration {
        self.minimum
    }

    pub fn maximum(&self) -> Duration {
        self.maximum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn three_failures_follow_linear_formula() {
        let mut b = Backoff::new(ms(500), ms(60000));
        b.next_delay();
        b.next_delay();
        let d = b.next_delay();
        // 500 + floor(59500 * 3 / 100)
        assert_eq!(d, ms(500 + 1785));
        assert_eq!(b.failure_count(), 3);
        assert_eq!(b.current(), d);
    }

    #[test]
    fn monotonic_until_saturated() {
        let mut b = Backoff::new(ms(500), ms(60000));
        let mut last = Duration::ZERO;
        for _ in 0..150 {
            let d = b.next_delay();
            assert!(d >= last);
            assert!(d >= b.minimum() && d <= b.maximum());
            last = d;
        }
        assert_eq!(last, ms(60000));
    }

    #[test]
    fn reset_returns_to_minimum() {
        let mut b = Backoff::new(ms(100), ms(1000));
        for _ in 0..20 {
            b.next_delay();
        }
        assert!(b.current() > ms(100));
        b.reset();
        assert_eq!(b.current(), ms(100));
        assert_eq!(b.failure_count(), 0);
        assert_eq!(b.next_delay(), ms(109));
    }

    #[test]
    fn equal_bounds_stay_flat() {
        let mut b = Backoff::new(ms(250), ms(250));
        assert_eq!(b.next_delay(), ms(250));
        assert_eq!(b.next_delay(), ms(250));
    }
}
