//! Retry policy for provider calls
//!
//! Backoff is linear: retry `n` sleeps `delay_base * n`. Every failure is
//! retried the same way by default, including 401/403; the
//! `retry_auth_failures` switch is the hook for turning that off.

use std::time::Duration;

use super::config::ProviderConfig;
use super::error::AiError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first
    pub max_retries: u32,
    pub delay_base: Duration,
    /// Retry 401/403 like any other failure (default: true)
    pub retry_auth_failures: bool,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay_base: Duration) -> Self {
        Self {
            max_retries,
            delay_base,
            retry_auth_failures: true,
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(config.max_retries, config.retry_delay())
    }

    pub fn without_auth_retries(mut self) -> Self {
        self.retry_auth_failures = false;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Sleep before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.delay_base.saturating_mul(retry)
    }

    pub fn should_retry(&self, err: &AiError) -> bool {
        match err {
            AiError::ClientShutdown | AiError::Cancelled(_) => false,
            AiError::AuthenticationFailed { .. } => self.retry_auth_failures,
            _ => true,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            super::config::DEFAULT_MAX_RETRIES,
            Duration::from_millis(super::config::DEFAULT_RETRY_DELAY_MS),
        )
    }
}
