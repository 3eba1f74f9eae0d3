//! Scheduler tuning.

use serde::Deserialize;
use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_MAX_CONCURRENT_GENERATIONS: NonZeroUsize = NonZeroUsize::MIN.saturating_add(2);
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(120);
const IMMEDIATE_DISPATCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Exponential delay between automatic retries.
///
/// The delay before retry `k` is `base * 2^(k-1)`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    /// Delay after the first failed attempt.
    pub base: Duration,
    /// Upper bound for any delay.
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(2),
            max: Duration::from_secs(60),
        }
    }
}

impl BackoffPolicy {
    /// Retries become eligible immediately.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            base: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Returns the delay after `attempts` failed attempts.
    #[must_use]
    pub fn delay_for(&self, attempts: u32) -> Duration {
        if attempts == 0 {
            return Duration::ZERO;
        }
        let exponent = attempts.saturating_sub(1).min(31);
        let factor = 1_u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .map_or(self.max, |delay| delay.min(self.max))
    }
}

/// Limits and policies for an [`super::IllustrationScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum number of tasks in `generating` at once.
    pub max_concurrent_generations: NonZeroUsize,
    /// Dispatch attempts before a task fails permanently.
    pub max_attempts: u32,
    /// Time budget for one backend dispatch.
    pub dispatch_timeout: Duration,
    /// Delay policy between automatic retries.
    pub backoff: BackoffPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_generations: DEFAULT_MAX_CONCURRENT_GENERATIONS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl SchedulerConfig {
    /// Configuration without retry delays and with a short timeout.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            dispatch_timeout: IMMEDIATE_DISPATCH_TIMEOUT,
            backoff: BackoffPolicy::none(),
            ..Self::default()
        }
    }

    /// Sets the concurrency bound.
    #[must_use]
    pub const fn with_max_concurrent_generations(mut self, limit: NonZeroUsize) -> Self {
        self.max_concurrent_generations = limit;
        self
    }

    /// Sets the attempt limit.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the per-dispatch timeout.
    #[must_use]
    pub const fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = timeout;
        self
    }

    /// Sets the retry backoff policy.
    #[must_use]
    pub const fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}
