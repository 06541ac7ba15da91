//! Store Call Policy
//!
//! Deadline and bounded-retry wrapper applied to every storage call.
//!
//! Idempotent operations (queries, replay, metadata reads) are retried on any
//! transient failure. Non-idempotent operations (appends, sequence increments,
//! inserts) are retried only when the backend reports it was never reached;
//! anything else is surfaced so a write is never applied twice.

use std::future::Future;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::config::StoreSettings;
use crate::infrastructure::metrics;
use crate::shared::error::StoreError;

/// Configuration for retry behavior with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (e.g., 2.0 for doubling)
    pub backoff_multiplier: f64,
    /// Whether to add up to 25% random jitter to each delay
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Calculate the delay after a failed attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.jitter {
            capped_delay * (1.0 + rand::random::<f64>() * 0.25)
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }
}

/// Which retry rule applies to an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Idempotence {
    Idempotent,
    NonIdempotent,
}

/// Deadline plus retry rules shared by every component that touches storage.
#[derive(Debug, Clone)]
pub struct StorePolicy {
    timeout: Duration,
    retry: RetryConfig,
}

impl Default for StorePolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), RetryConfig::default())
    }
}

impl StorePolicy {
    pub fn new(timeout: Duration, retry: RetryConfig) -> Self {
        Self { timeout, retry }
    }

    pub fn from_settings(settings: &StoreSettings) -> Self {
        Self::new(
            Duration::from_millis(settings.timeout_ms),
            RetryConfig {
                max_attempts: settings.max_attempts,
                initial_delay: Duration::from_millis(settings.initial_backoff_ms),
                max_delay: Duration::from_millis(settings.max_backoff_ms),
                ..RetryConfig::default()
            },
        )
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Run an idempotent operation: any transient failure is retried.
    pub async fn read<T, F, Fut>(&self, operation: &'static str, f: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        self.run(operation, Idempotence::Idempotent, f).await
    }

    /// Run a non-idempotent operation: only failures with no effect are retried.
    pub async fn write<T, F, Fut>(&self, operation: &'static str, f: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        self.run(operation, Idempotence::NonIdempotent, f).await
    }

    async fn run<T, F, Fut>(
        &self,
        operation: &'static str,
        idempotence: Idempotence,
        mut f: F,
    ) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let started = Instant::now();
            let result = match tokio::time::timeout(self.timeout, f()).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout(self.timeout)),
            };
            metrics::record_store_operation(operation, started.elapsed().as_secs_f64());

            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let retryable = match idempotence {
                Idempotence::Idempotent => err.is_transient(),
                Idempotence::NonIdempotent => err.had_no_effect(),
            };

            attempt += 1;
            if !retryable || attempt >= max_attempts {
                return Err(err);
            }

            let delay = self.retry.delay_for_attempt(attempt - 1);
            warn!(
                operation,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying store operation"
            );
            metrics::record_store_retry(operation);
            tokio::time::sleep(delay).await;
        }
    }
}
