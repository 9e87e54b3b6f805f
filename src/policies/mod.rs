//! Backoff policy: how long to pause between retries.
//!
//! This module groups the knobs that control **how** retry delays grow and
//! **when** a context gives up (retry limit, timeout).
//!
//! ## Contents
//! - [`BackoffConfig`] resolved per-node configuration (seed / cap / rate /
//!   jitter / retry limit / timeout)
//! - [`BackoffOverrides`] partial overlay merged over a parent's resolved
//!   config at derivation time
//! - [`next_delay`] the pure delay computation
//!
//! ## Quick wiring
//! ```text
//! Context::child(name, overrides)
//!      └─► overrides.apply(&parent.config) ─► config.validate()?
//!            └─► Context { config }
//!                  ├─► failure():  delay = next_delay(delay, &config)
//!                  ├─► backoff():  sleep(delay), cancellable
//!                  └─► timeout:    config.timeout_limit() arms the timer
//! ```
//!
//! ## Defaults
//! - `base = 100ms`, `max = 30s`, `rate = 1.2`, `jitter = 15ms`
//! - `max_retries = 0` (unlimited), `timeout = 0s` (unbounded)

mod backoff;
mod overrides;

pub use backoff::{next_delay, BackoffConfig};
pub use overrides::BackoffOverrides;
