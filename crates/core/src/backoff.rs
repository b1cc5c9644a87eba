use std::time::Duration;

/// Pure poll-interval policy used by the scheduler.
///
/// Defaults:
/// 0 failures: 60s (base)
/// 1 failure: 120s
/// 2 failures: 240s
/// ...capped at 15m. The caller never stops polling; the ceiling bounds the gap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Interval after a success.
    pub base: Duration,
    /// Multiplier per consecutive failure. Values below 1 are treated as 1.
    pub factor: f64,
    /// Longest gap the scheduler will ever wait.
    pub ceiling: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(60),
            factor: 2.0,
            ceiling: Duration::from_secs(15 * 60),
        }
    }
}

impl Backoff {
    /// Delay before the next cycle start after `consecutive_failures` failures in a row.
    pub fn delay(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return self.base;
        }
        let ceiling = self.ceiling.max(self.base);
        let factor = if self.factor.is_finite() { self.factor.max(1.0) } else { 1.0 };

        let mut secs = self.base.as_secs_f64();
        for _ in 0..consecutive_failures {
            secs *= factor;
            if secs >= ceiling.as_secs_f64() {
                return ceiling;
            }
        }
        Duration::from_secs_f64(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backoff_doubles_to_ceiling() {
        let b = Backoff::default();
        assert_eq!(b.delay(0), Duration::from_secs(60));
        assert_eq!(b.delay(1), Duration::from_secs(120));
        assert_eq!(b.delay(2), Duration::from_secs(240));
        assert_eq!(b.delay(3), Duration::from_secs(480));
        assert_eq!(b.delay(4), Duration::from_secs(900));
        assert_eq!(b.delay(u32::MAX), Duration::from_secs(900));
    }

    #[test]
    fn non_decreasing_and_bounded() {
        let b = Backoff {
            base: Duration::from_millis(750),
            factor: 1.5,
            ceiling: Duration::from_secs(10),
        };
        let mut prev = b.delay(0);
        for n in 1..50 {
            let d = b.delay(n);
            assert!(d >= prev, "failure {n}: {d:?} < {prev:?}");
            assert!(d <= b.ceiling);
            prev = d;
        }
        assert_eq!(prev, b.ceiling);
    }

    #[test]
    fn degenerate_factor_holds_base() {
        let b = Backoff {
            base: Duration::from_secs(5),
            factor: 0.5,
            ceiling: Duration::from_secs(60),
        };
        assert_eq!(b.delay(3), Duration::from_secs(5));
    }

    #[test]
    fn ceiling_below_base_uses_base() {
        let b = Backoff {
            base: Duration::from_secs(30),
            factor: 2.0,
            ceiling: Duration::from_secs(10),
        };
        assert_eq!(b.delay(2), Duration::from_secs(30));
    }
}
