use rand::Rng;
use std::time::Duration;

use crate::config::RetryConfig;

/// Exponential backoff with jitter, shared by the LLM transport and the travel API clients
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    backoff_base: f64,
    jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            backoff_base: 2.0,
            jitter_factor: 0.2,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            initial_delay: Duration::from_millis(cfg.initial_delay_ms),
            max_delay: Duration::from_millis(cfg.max_delay_ms),
            backoff_base: cfg.backoff_base.max(1.0),
            jitter_factor: cfg.jitter_factor.clamp(0.0, 1.0),
        }
    }

    /// Policy that never waits and never retries, for tests and one-shot calls
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_base: 1.0,
            jitter_factor: 0.0,
        }
    }

    /// Base delay before retry number `attempt` (1-based), capped at `max_delay`
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exp = self.backoff_base.powi(attempt.saturating_sub(1) as i32);
        let millis = self.initial_delay.as_millis() as f64 * exp;
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Base delay with +/- jitter applied
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if self.jitter_factor == 0.0 || base.is_zero() {
            return base;
        }
        let jitter =
            rand::thread_rng().gen_range((1.0 - self.jitter_factor)..=(1.0 + self.jitter_factor));
        let delay = Duration::from_millis((base.as_millis() as f64 * jitter) as u64);
        std::cmp::min(delay, self.max_delay)
    }

    /// Delays between attempts, in the shape `tokio_retry` expects
    pub fn strategy(&self) -> impl Iterator<Item = Duration> + use<> {
        let policy = self.clone();
        (1..policy.max_attempts).map(move |attempt| policy.delay_for(attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_delay_grows_and_caps() {
        let policy = RetryPolicy::from_config(&RetryConfig {
            max_attempts: 6,
            initial_delay_ms: 100,
            max_delay_ms: 500,
            backoff_base: 2.0,
            jitter_factor: 0.0,
        });
        assert_eq!(policy.base_delay(1), Duration::from_millis(100));
        assert_eq!(policy.base_delay(2), Duration::from_millis(200));
        assert_eq!(policy.base_delay(3), Duration::from_millis(400));
        assert_eq!(policy.base_delay(4), Duration::from_millis(500));
    }

    #[test]
    fn test_strategy_yields_one_delay_per_retry() {
        let policy = RetryPolicy::from_config(&RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 10,
            max_delay_ms: 100,
            backoff_base: 2.0,
            jitter_factor: 0.5,
        });
        let delays: Vec<Duration> = policy.strategy().collect();
        assert_eq!(delays.len(), 2);
        assert!(delays.iter().all(|d| *d <= Duration::from_millis(100)));
    }

    #[test]
    fn test_none_policy_has_no_retries() {
        assert_eq!(RetryPolicy::none().strategy().count(), 0);
    }
}
