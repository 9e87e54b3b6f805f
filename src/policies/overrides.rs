//! # Partial backoff overrides.
//!
//! [`BackoffOverrides`] is the overlay a caller supplies when deriving a
//! node: every field is optional, and unset fields fall through to the
//! parent's resolved [`BackoffConfig`]. This keeps derivation sites short —
//! override one knob, inherit the rest.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use ctxtree::{BackoffConfig, BackoffOverrides};
//!
//! let overrides = BackoffOverrides {
//!     max_retries: Some(5),
//!     timeout: Some(Duration::from_secs(30)),
//!     ..Default::default()
//! };
//!
//! let resolved = overrides.apply(&BackoffConfig::default());
//! assert_eq!(resolved.max_retries, 5);
//! assert_eq!(resolved.timeout, Duration::from_secs(30));
//! // Unset fields inherit the parent's values.
//! assert_eq!(resolved.base, Duration::from_millis(100));
//! ```

use std::time::Duration;

use crate::policies::backoff::BackoffConfig;

/// Per-field overlay merged over a resolved [`BackoffConfig`] at derivation
/// time.
///
/// `None` means "inherit from the parent". Sentinel semantics carry over:
/// `Some(0)` for `max_retries` or `Some(Duration::ZERO)` for `timeout`
/// explicitly lift an inherited limit.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BackoffOverrides {
    /// Overrides [`BackoffConfig::base`].
    pub base: Option<Duration>,
    /// Overrides [`BackoffConfig::max`].
    pub max: Option<Duration>,
    /// Overrides [`BackoffConfig::max_retries`] (`0` = unlimited).
    pub max_retries: Option<u32>,
    /// Overrides [`BackoffConfig::rate`].
    pub rate: Option<f64>,
    /// Overrides [`BackoffConfig::jitter`].
    pub jitter: Option<Duration>,
    /// Overrides [`BackoffConfig::timeout`] (`0s` = unbounded).
    pub timeout: Option<Duration>,
}

impl BackoffOverrides {
    /// Merges the overlay over `parent`, producing the child's resolved
    /// config. Pure; the result still has to pass
    /// [`BackoffConfig::validate`].
    pub fn apply(&self, parent: &BackoffConfig) -> BackoffConfig {
        BackoffConfig {
            base: self.base.unwrap_or(parent.base),
            max: self.max.unwrap_or(parent.max),
            max_retries: self.max_retries.unwrap_or(parent.max_retries),
            rate: self.rate.unwrap_or(parent.rate),
            jitter: self.jitter.unwrap_or(parent.jitter),
            timeout: self.timeout.unwrap_or(parent.timeout),
        }
    }
}
