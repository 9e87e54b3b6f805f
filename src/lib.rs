//! # ctxtree
//!
//! **ctxtree** provides hierarchical cancellation, timeout and retry-backoff
//! contexts for async Rust.
//!
//! A [`Context`] is one node in a process-wide tree of lightweight
//! coordination handles: independent operations share a single cancellation
//! signal, derive child scopes that inherit it, and compute randomized
//! exponential backoff between retries. The crate is designed as a building
//! block for services, workers and retry loops that must shut down as one.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                       ┌────────────────────┐
//!                       │    "Background"    │   process-wide singleton
//!                       │  (unbounded config)│   (Context::background)
//!                       └─────────┬──────────┘
//!                ┌────────────────┼────────────────┐
//!                ▼                ▼                ▼
//!        ┌──────────────┐  ┌──────────────┐  ┌──────────────┐
//!        │ service root │  │  worker root │  │   job root   │
//!        │(for_process: │  │(Context::new)│  │(Context::new)│
//!        │ OS signals)  │  └──────┬───────┘  └──────────────┘
//!        └──────┬───────┘         ▼
//!               ▼          ┌──────────────┐
//!        ┌──────────────┐  │    child     │  (ctx.child: inherits config,
//!        │   request    │  │  (overrides) │   subscribes to cancellation)
//!        └──────────────┘  └──────────────┘
//!
//! cancel(reason) ──► record published ──► broadcast to all descendants
//!                    (synchronously, before cancel() returns)
//! ```
//!
//! ### Lifecycle
//! ```text
//! Context::new / ctx.child ──► (Context, CancelHandle)
//!
//! per attempt:
//!   ├─► work fails        ─► ctx.failure(err)
//!   │         ├─► retries += 1, delay = next_delay(delay, config)
//!   │         └─► retries >= max_retries ─► cancel (generated reason)
//!   ├─► ctx.backoff().await   (delay elapses OR cancellation, first wins)
//!   └─► work succeeds     ─► ctx.reset()  (counters reseeded, timer re-armed)
//!
//! exit conditions (Active ─► Cancelled, terminal):
//!   - CancelHandle::cancel(reason)
//!   - configured timeout fires
//!   - retry limit breached in failure()
//!   - ancestor cancelled (record inherited verbatim, local path/last_error)
//! ```
//!
//! ## Features
//! | Area            | Description                                              | Key types / functions                     |
//! |-----------------|----------------------------------------------------------|-------------------------------------------|
//! | **Derivation**  | Build the tree; cancel capability split from the handle. | [`Context`], [`CancelHandle`]             |
//! | **Observation** | Query cancellation state, record, retries, path.         | [`Cancellation`]                          |
//! | **Backoff**     | Configure growth, jitter, limits; compute delays.        | [`BackoffConfig`], [`BackoffOverrides`], [`next_delay`] |
//! | **Coordination**| Suspend on backoff or until shutdown; scoped execution.  | [`Context::backoff`], [`Context::wait`], [`Context::with`] |
//! | **Retry loops** | Drive an operation off a context's give-up conditions.   | [`retry`], [`RetryError`]                 |
//! | **Process**     | Bind OS termination signals to a root context.           | [`Context::for_process`]                  |
//!
//! ## Guarantees
//! - Cancellation is **monotonic**: one `Active → Cancelled` transition per
//!   node, ever; the record never changes afterwards.
//! - Parent cancellation reaches **all** live descendants before `cancel()`
//!   returns; a child cancelling never affects its parent or siblings.
//! - Timeout timers never hold the process open; only an outstanding
//!   [`Context::wait`] does.
//! - `backoff()` and `wait()` always resolve — cancellation is surfaced as
//!   state, never as an error.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use ctxtree::{BackoffOverrides, Context};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // A root for this subsystem: at most 5 consecutive failures,
//!     // 30s overall budget.
//!     let (ctx, cancel) = Context::new(
//!         Some("ingest"),
//!         BackoffOverrides {
//!             max_retries: Some(5),
//!             timeout: Some(Duration::from_secs(30)),
//!             ..Default::default()
//!         },
//!     )?;
//!
//!     // Children inherit config and cancellation.
//!     let (worker, _worker_cancel) = ctx.child(Some("worker-1"), Default::default())?;
//!     assert_eq!(worker.full_name(), "Background/ingest/worker-1");
//!
//!     // Failed attempts advance the backoff state...
//!     worker.failure(Some("connection refused".into()));
//!     worker.backoff().await;
//!
//!     // ...and cancelling the parent ends every derived scope.
//!     cancel.cancel(Some("deploy rolling"));
//!     let record = worker.wait().await;
//!     assert_eq!(record.reason.as_deref(), Some("deploy rolling"));
//!     assert_eq!(record.origin_path, "Background/ingest");
//!     Ok(())
//! }
//! ```

mod context;
mod error;
mod policies;
mod retry;

// ---- Public re-exports ----

pub use context::{CancelHandle, Cancellation, Context};
pub use error::{ConfigError, RetryError};
pub use policies::{next_delay, BackoffConfig, BackoffOverrides};
pub use retry::retry;
