//! Retry policy: decides how long an errored job waits before it can be
//! claimed again.

use std::time::Duration;

/// Polynomial backoff: `error_count ^ exponent` seconds plus a constant.
///
/// With the default (exponent 4, constant 3s):
/// - 1st error: 4s
/// - 2nd error: 19s
/// - 3rd error: 84s
/// - 4th error: 259s
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub exponent: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            exponent: 4,
            base_delay: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    pub fn new(exponent: u32, base_delay: Duration) -> Self {
        Self {
            exponent,
            base_delay,
        }
    }

    /// Delay before the next run, given the error count after the failure
    /// was recorded (so the first failure passes 1).
    pub fn delay(&self, error_count: i32) -> Duration {
        let count = u64::try_from(error_count).unwrap_or(0);
        let secs = count.saturating_pow(self.exponent);
        self.base_delay.saturating_add(Duration::from_secs(secs))
    }
}
