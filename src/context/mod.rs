//! Context tree: cancellation, timeouts and scoped execution.
//!
//! This module contains the core of the crate. The public API is
//! [`Context`] (the node handle), [`CancelHandle`] (the cancel capability)
//! and [`Cancellation`] (the immutable record a cancelled node carries).
//!
//! Internal modules:
//! - [`node`]: the tree-aware state machine — derivation, propagation,
//!   timers, `backoff()`/`wait()`;
//! - [`cancellation`]: the immutable cancellation record;
//! - [`scope`]: run a unit of work bound to a context, cancel on exit;
//! - [`shutdown`]: cross-platform shutdown signal handling.

pub(crate) mod cancellation;
pub(crate) mod node;
mod scope;
mod shutdown;

pub use cancellation::Cancellation;
pub use node::{CancelHandle, Context};
