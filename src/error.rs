//! Error types used by the context runtime.
//!
//! This module defines two error enums:
//!
//! - [`ConfigError`] — malformed backoff configuration, rejected at
//!   construction/derivation time.
//! - [`RetryError`] — terminal outcome of a [`retry`](crate::retry) loop.
//!
//! Cancellation itself is **never** surfaced as an error by the core:
//! a cancelled node communicates purely through state (the
//! [`Cancellation`](crate::Cancellation) record). The only thrown condition
//! is caller misuse, which fails fast when a node is derived.

use thiserror::Error;

use crate::context::Cancellation;

/// # Errors produced by backoff configuration validation.
///
/// Raised when a node is created or derived with a config that cannot
/// produce meaningful delays. Validation happens before any state is
/// allocated, so a rejected derivation has no side effects.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The growth rate must be a finite value `>= 1.0`.
    #[error("backoff rate {rate} must be a finite value >= 1.0")]
    InvalidRate {
        /// The rejected rate multiplier.
        rate: f64,
    },

    /// The seed delay must not exceed the delay cap.
    #[error("base delay {base_ms}ms must not exceed max delay {max_ms}ms")]
    BaseExceedsMax {
        /// Seed delay, in milliseconds.
        base_ms: u128,
        /// Delay cap, in milliseconds.
        max_ms: u128,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use ctxtree::ConfigError;
    ///
    /// let err = ConfigError::InvalidRate { rate: 0.5 };
    /// assert_eq!(err.as_label(), "config_invalid_rate");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::InvalidRate { .. } => "config_invalid_rate",
            ConfigError::BaseExceedsMax { .. } => "config_base_exceeds_max",
        }
    }
}

/// # Terminal outcomes of a [`retry`](crate::retry) loop.
///
/// A retry loop ends in one of two ways short of success: the context was
/// cancelled before an attempt could run, or an attempt failed and the
/// failure pushed the context over its retry limit (or the context was
/// cancelled out from under the attempt).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RetryError {
    /// The context was cancelled before an attempt could run.
    #[error("{cancellation}")]
    Cancelled {
        /// The record explaining the cancellation.
        cancellation: Cancellation,
    },

    /// The last attempt failed and no further attempts are permitted.
    #[error("retries exhausted: {error} ({cancellation})")]
    Exhausted {
        /// Message of the last failed attempt.
        error: String,
        /// The record explaining why retrying stopped.
        cancellation: Cancellation,
    },
}

impl RetryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RetryError::Cancelled { .. } => "retry_cancelled",
            RetryError::Exhausted { .. } => "retry_exhausted",
        }
    }

    /// Returns the cancellation record behind this outcome.
    pub fn cancellation(&self) -> &Cancellation {
        match self {
            RetryError::Cancelled { cancellation } => cancellation,
            RetryError::Exhausted { cancellation, .. } => cancellation,
        }
    }
}
