//! # Cancellation record.
//!
//! [`Cancellation`] is the immutable payload a node publishes when it
//! transitions to the cancelled state. Once published it is never cleared
//! or replaced; repeated `cancel()` calls, timeouts firing late, or parent
//! broadcasts arriving after the fact are all no-ops.
//!
//! ## Inheritance
//! When a parent's cancellation propagates to a child, the child's record
//! is **not** re-wrapped: `origin_path` and `reason` pass through verbatim
//! from the ancestor `cancel()` was invoked on, while `path` and
//! `last_error` are always the child's own.

use std::fmt;

/// Immutable description of why, where and with what pending error a node
/// was cancelled.
#[derive(Clone, Debug, PartialEq)]
pub struct Cancellation {
    /// Root-to-node name path of the node holding this record,
    /// slash-joined (e.g. `Background/ingest/worker-3`).
    pub path: String,
    /// Path of the node `cancel()` was directly invoked on. Equal to
    /// [`path`](Self::path) on that node; inherited unchanged by all
    /// descendants.
    pub origin_path: String,
    /// Human-readable reason: the string passed to `cancel()`, or generated
    /// text for timeout / retry-limit cancellations naming the path and the
    /// breached threshold.
    pub reason: Option<String>,
    /// The last error this node's own `failure()` recorded before
    /// cancellation. Local to each node, never inherited.
    pub last_error: Option<String>,
}

impl Cancellation {
    /// True if the record was inherited from an ancestor rather than
    /// produced by a `cancel()` call on this node itself.
    pub fn is_inherited(&self) -> bool {
        self.path != self.origin_path
    }
}

impl fmt::Display for Cancellation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cancelled at {}", self.path)?;
        if self.is_inherited() {
            write!(f, " (origin {})", self.origin_path)?;
        }
        match &self.reason {
            Some(reason) => write!(f, ": {reason}"),
            None => write!(f, ": no reason given"),
        }
    }
}
