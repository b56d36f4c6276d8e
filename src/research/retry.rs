use std::time::Duration;

/// Retry schedule for an external call: `max_retries` additional attempts
/// after the first, sleeping `delay(i)` before retry `i`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_ms: u64,
    pub exponent_base: u32,
}

impl RetryPolicy {
    /// Linear schedule: `base_ms · (i + 1)`.
    pub const fn linear(max_retries: u32, base_ms: u64) -> Self {
        Self {
            max_retries,
            base_ms,
            exponent_base: 1,
        }
    }

    /// Exponential schedule: `base_ms · 2^i`.
    pub const fn exponential(max_retries: u32, base_ms: u64) -> Self {
        Self {
            max_retries,
            base_ms,
            exponent_base: 2,
        }
    }

    pub fn delay(&self, retry: u32) -> Duration {
        let ms = if self.exponent_base <= 1 {
            self.base_ms.saturating_mul(retry as u64 + 1)
        } else {
            self.base_ms
                .saturating_mul((self.exponent_base as u64).saturating_pow(retry))
        };
        Duration::from_millis(ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_delays() {
        let policy = RetryPolicy::linear(3, 2000);
        assert_eq!(policy.delay(0), Duration::from_millis(2000));
        assert_eq!(policy.delay(1), Duration::from_millis(4000));
        assert_eq!(policy.delay(2), Duration::from_millis(6000));
    }

    #[test]
    fn test_exponential_delays() {
        let policy = RetryPolicy::exponential(2, 1000);
        assert_eq!(policy.delay(0), Duration::from_millis(1000));
        assert_eq!(policy.delay(1), Duration::from_millis(2000));
        assert_eq!(policy.delay(2), Duration::from_millis(4000));
    }
}
