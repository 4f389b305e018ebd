//! Retry policy for listing fetches (exponential backoff with jitter)

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::infrastructure::config::ExtractionConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// 2.0 doubles the delay after every failed attempt
    pub backoff_multiplier: f64,
    pub enable_jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            enable_jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            base_delay_ms: config.retry_delay_ms,
            max_delay_ms: config.max_retry_delay_ms,
            ..Self::default()
        }
    }

    /// No waiting between attempts
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
            backoff_multiplier: 1.0,
            enable_jitter: false,
        }
    }

    /// True when another attempt is allowed after `attempt` (1-based) failed
    pub const fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay before the attempt following `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let exponential = self.base_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = exponential.min(self.max_delay_ms as f64);

        let millis = if self.enable_jitter {
            // 50%-150%
            capped * (0.5 + fastrand::f64())
        } else {
            capped
        };
        Duration::from_millis(millis.max(0.0) as u64)
    }
}
