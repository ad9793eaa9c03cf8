//! Re-running a node that returned `Err`.
//!
//! The graph consults the policy after every failed attempt. This is separate
//! from the assessor's objective retry counter kept in `WorkflowState`.

use std::time::Duration;

/// How often, and after what pause, a failed node is run again.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum RetryPolicy {
    /// The first error is final.
    #[default]
    None,
    /// Up to `retries` extra runs, each after the same `delay`.
    Fixed { retries: usize, delay: Duration },
    /// Up to `retries` extra runs; the pause starts at `base`, doubles, and never exceeds `cap`.
    Exponential {
        retries: usize,
        base: Duration,
        cap: Duration,
    },
}

impl RetryPolicy {
    pub fn fixed(retries: usize, delay: Duration) -> Self {
        RetryPolicy::Fixed { retries, delay }
    }

    pub fn exponential(retries: usize, base: Duration, cap: Duration) -> Self {
        RetryPolicy::Exponential { retries, base, cap }
    }

    /// Extra runs allowed after the first failure.
    pub fn retries(&self) -> usize {
        match *self {
            RetryPolicy::None => 0,
            RetryPolicy::Fixed { retries, .. } | RetryPolicy::Exponential { retries, .. } => {
                retries
            }
        }
    }

    /// Pause before the run following failed run `failed` (0 = the first run).
    ///
    /// `None` once the budget is spent.
    pub fn backoff(&self, failed: usize) -> Option<Duration> {
        if failed >= self.retries() {
            return None;
        }
        match *self {
            RetryPolicy::None => None,
            RetryPolicy::Fixed { delay, .. } => Some(delay),
            RetryPolicy::Exponential { base, cap, .. } => {
                let factor = 1u32.checked_shl(failed as u32).unwrap_or(u32::MAX);
                Some(base.saturating_mul(factor).min(cap))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_gives_no_backoff() {
        assert_eq!(RetryPolicy::default(), RetryPolicy::None);
        assert_eq!(RetryPolicy::None.retries(), 0);
        assert_eq!(RetryPolicy::None.backoff(0), None);
    }

    /// **Scenario**: A fixed policy pauses the same amount until its retries are used up.
    #[test]
    fn fixed_backoff_until_budget_spent() {
        let policy = RetryPolicy::fixed(2, Duration::from_millis(250));
        assert_eq!(policy.backoff(0), Some(Duration::from_millis(250)));
        assert_eq!(policy.backoff(1), Some(Duration::from_millis(250)));
        assert_eq!(policy.backoff(2), None);
    }

    /// **Scenario**: Exponential pauses double from the base and stop at the cap.
    #[test]
    fn exponential_backoff_doubles_to_cap() {
        let policy = RetryPolicy::exponential(6, Duration::from_millis(100), Duration::from_millis(500));
        assert_eq!(policy.backoff(0), Some(Duration::from_millis(100)));
        assert_eq!(policy.backoff(1), Some(Duration::from_millis(200)));
        assert_eq!(policy.backoff(2), Some(Duration::from_millis(400)));
        assert_eq!(policy.backoff(3), Some(Duration::from_millis(500)));
        assert_eq!(policy.backoff(5), Some(Duration::from_millis(500)));
        assert_eq!(policy.backoff(6), None);
    }

    #[test]
    fn exponential_backoff_does_not_overflow() {
        let policy = RetryPolicy::exponential(usize::MAX, Duration::from_secs(1), Duration::from_secs(30));
        assert_eq!(policy.backoff(200), Some(Duration::from_secs(30)));
    }
}
