//! # Backoff configuration and delay computation.
//!
//! [`BackoffConfig`] is the resolved per-node configuration; [`next_delay`]
//! advances the current delay after a failed attempt:
//!
//! ```text
//! next = min(max, current × rate) + uniform[0, jitter)
//! ```
//!
//! The computation is stateless apart from the jitter draw: the caller owns
//! the current delay (seeded from [`BackoffConfig::base`]) and feeds the
//! result back in on the next failure.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use ctxtree::{next_delay, BackoffConfig};
//!
//! let config = BackoffConfig {
//!     base: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     rate: 2.0,
//!     jitter: Duration::ZERO,
//!     ..BackoffConfig::default()
//! };
//!
//! // 100ms × 2.0 = 200ms
//! assert_eq!(next_delay(config.base, &config), Duration::from_millis(200));
//!
//! // Growth is capped at `max`
//! assert_eq!(next_delay(Duration::from_secs(60), &config), Duration::from_secs(10));
//! ```

use std::time::Duration;

use rand::Rng;

use crate::error::ConfigError;

/// Resolved backoff configuration of a context node.
///
/// Children inherit the parent's resolved config merged with any
/// [`BackoffOverrides`](crate::BackoffOverrides) supplied at derivation time.
///
/// ## Sentinel values
/// Unlimited behavior is expressed with in-band sentinels rather than
/// `Option` fields, so the struct stays `Copy` and trivially mergeable:
/// - `max_retries = 0` → unlimited (no retry-limit cancellation)
/// - `timeout = 0s` → unbounded (no timeout timer armed)
///
/// Prefer the [`retry_limit`](Self::retry_limit) /
/// [`timeout_limit`](Self::timeout_limit) accessors over sprinkling sentinel
/// checks across call sites.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffConfig {
    /// Seed delay: the pause after the first failure, and the value
    /// `reset()` restores the current delay to.
    pub base: Duration,
    /// Cap on the grown (pre-jitter) delay.
    pub max: Duration,
    /// Maximum number of consecutive `failure()` calls before the node
    /// cancels itself (`0` = unlimited).
    pub max_retries: u32,
    /// Multiplicative growth factor applied on each failure
    /// (finite, `>= 1.0`).
    pub rate: f64,
    /// Upper bound of the uniform random jitter added to each delay.
    pub jitter: Duration,
    /// Wall-clock budget before the node cancels itself
    /// (`0s` = unbounded).
    pub timeout: Duration,
}

impl Default for BackoffConfig {
    /// Returns the configuration the background node runs with:
    ///
    /// - `base = 100ms`, `max = 30s`
    /// - `rate = 1.2`, `jitter = 15ms`
    /// - `max_retries = 0` (unlimited)
    /// - `timeout = 0s` (unbounded)
    fn default() -> Self {
        Self {
            base: Duration::from_millis(100),
            max: Duration::from_secs(30),
            max_retries: 0,
            rate: 1.2,
            jitter: Duration::from_millis(15),
            timeout: Duration::ZERO,
        }
    }
}

impl BackoffConfig {
    /// Returns the retry limit as an `Option`.
    ///
    /// - `None` → unlimited
    /// - `Some(n)` → the n-th consecutive failure cancels the node
    #[inline]
    pub fn retry_limit(&self) -> Option<u32> {
        if self.max_retries == 0 {
            None
        } else {
            Some(self.max_retries)
        }
    }

    /// Returns the timeout as an `Option`.
    ///
    /// - `None` → unbounded (no timer armed)
    /// - `Some(d)` → the node cancels itself `d` after creation/`reset()`
    #[inline]
    pub fn timeout_limit(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// Rejects configurations that cannot produce meaningful delays.
    ///
    /// Called at derivation time so misuse fails fast, before any node
    /// state is allocated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.rate.is_finite() || self.rate < 1.0 {
            return Err(ConfigError::InvalidRate { rate: self.rate });
        }
        if self.base > self.max {
            return Err(ConfigError::BaseExceedsMax {
                base_ms: self.base.as_millis(),
                max_ms: self.max.as_millis(),
            });
        }
        Ok(())
    }
}

/// Computes the delay for the next retry from the current one.
///
/// The grown delay `current × rate` is clamped to [`BackoffConfig::max`],
/// then a uniform draw from `[0, jitter)` is added. The jitter rides on top
/// of the cap, so the caller-observed delay may slightly exceed `max`; the
/// clamp bounds only the growth term, keeping runaway multiplication in
/// check while jitter keeps simultaneous retries decorrelated.
///
/// Deterministic apart from the jitter draw; with `jitter = 0` the result
/// is exact.
pub fn next_delay(current: Duration, config: &BackoffConfig) -> Duration {
    let grown = (current.as_secs_f64() * config.rate).min(config.max.as_secs_f64());
    // rate is validated finite and >= 1.0, so `grown` is finite and >= 0
    Duration::from_secs_f64(grown) + jitter_draw(config.jitter)
}

/// Uniform draw over `[0, bound)`; zero bound contributes zero.
fn jitter_draw(bound: Duration) -> Duration {
    let bound_secs = bound.as_secs_f64();
    if bound_secs <= 0.0 {
        return Duration::ZERO;
    }
    let mut rng = rand::rng();
    Duration::from_secs_f64(rng.random_range(0.0..bound_secs))
}
