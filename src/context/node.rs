//! # Context node: tree-scoped cancellation and backoff handle.
//!
//! A [`Context`] is one node in a process-wide cancellation tree. Nodes are
//! derived from a parent (ultimately from the background singleton), inherit
//! its resolved [`BackoffConfig`], and observe its cancellation: cancelling a
//! node cancels every descendant, never a parent or sibling.
//!
//! ## Architecture
//! ```text
//!                    ┌────────────────┐
//!                    │  "Background"  │  process-wide singleton, unbounded
//!                    └──────┬─────────┘
//!            ┌──────────────┼──────────────┐
//!            ▼              ▼              ▼
//!       ┌─────────┐    ┌─────────┐    ┌─────────┐
//!       │ service │    │ ingest  │    │  jobs   │   roots (Context::new /
//!       └───┬─────┘    └───┬─────┘    └─────────┘    Context::for_process)
//!           ▼              ▼
//!       ┌─────────┐    ┌─────────┐
//!       │ request │    │ worker  │   children (ctx.child)
//!       └─────────┘    └─────────┘
//! ```
//!
//! Each parent holds only `Weak` forward subscriptions to its children;
//! abandoned branches stay collectable, and a child never reaches into
//! parent state.
//!
//! ## Rules
//! - Cancellation is monotonic: one `Active → Cancelled` transition, ever.
//! - `reset()` / `failure()` / timer re-arming are no-ops once cancelled.
//! - The cancelled predicate is computed on read (own record OR any
//!   ancestor's), never cached.
//! - Parent cancellation is broadcast synchronously: every live descendant
//!   holds its inherited record before `cancel()` returns.
//! - A bounded timeout is a spawned timer task holding only a `Weak`
//!   reference; it never keeps the node (or the process) alive and is
//!   aborted on cancellation, `reset()` and drop.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::context::cancellation::Cancellation;
use crate::context::shutdown::wait_for_shutdown_signal;
use crate::error::ConfigError;
use crate::policies::{next_delay, BackoffConfig, BackoffOverrides};

/// Label used for nodes derived without a name.
const ANONYMOUS: &str = "[anonymous]";

/// Name of the process-wide background singleton.
const BACKGROUND: &str = "Background";

static BACKGROUND_NODE: OnceLock<Arc<Inner>> = OnceLock::new();

/// Mutable per-node fields, owned exclusively by the node.
///
/// All mutation happens under the node's own mutex; no lock is ever held
/// across an `.await` or while taking another node's lock.
struct State {
    /// Present iff this node observed cancellation. Never cleared.
    cancellation: Option<Cancellation>,
    /// Consecutive `failure()` calls since the last `reset()`.
    retries: u32,
    /// Current backoff magnitude, seeded from `config.base`.
    delay: Duration,
    /// Last error recorded by `failure()`; cleared by `reset()`.
    last_error: Option<String>,
    /// Abort handle of the armed timeout timer task, if any.
    timer: Option<AbortHandle>,
}

struct Inner {
    name: Option<String>,
    /// Back-reference up the tree; `None` only for the background node.
    parent: Option<Arc<Inner>>,
    config: BackoffConfig,
    /// Wakeup primitive for `wait()`/`backoff()`. Cancelled strictly after
    /// the record is published, so a woken waiter always finds the record.
    token: CancellationToken,
    state: Mutex<State>,
    /// Forward subscriptions: weak handles to children awaiting our
    /// cancellation broadcast.
    children: Mutex<Vec<Weak<Inner>>>,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(ANONYMOUS)
    }

    /// Root-to-node name path, slash-joined. Recomputed per call; the
    /// parent chain is short and immutable after construction.
    fn full_name(&self) -> String {
        let mut names = vec![self.display_name()];
        let mut parent = self.parent.as_deref();
        while let Some(node) = parent {
            names.push(node.display_name());
            parent = node.parent.as_deref();
        }
        names.reverse();
        names.join("/")
    }

    /// Check-on-read cancelled predicate: own record OR any ancestor's.
    fn cancelled(&self) -> bool {
        if self.lock_state().cancellation.is_some() {
            return true;
        }
        let mut parent = self.parent.as_deref();
        while let Some(node) = parent {
            if node.lock_state().cancellation.is_some() {
                return true;
            }
            parent = node.parent.as_deref();
        }
        false
    }

    /// Nearest ancestor record, excluding this node's own.
    fn ancestor_record(&self) -> Option<Cancellation> {
        let mut parent = self.parent.as_deref();
        while let Some(node) = parent {
            if let Some(record) = node.lock_state().cancellation.clone() {
                return Some(record);
            }
            parent = node.parent.as_deref();
        }
        None
    }

    fn derive(parent: &Arc<Inner>, name: Option<&str>, config: BackoffConfig) -> Arc<Inner> {
        let inner = Arc::new(Inner {
            name: name.map(str::to_owned),
            parent: Some(Arc::clone(parent)),
            config,
            token: CancellationToken::new(),
            state: Mutex::new(State {
                cancellation: None,
                retries: 0,
                delay: config.base,
                last_error: None,
                timer: None,
            }),
            children: Mutex::new(Vec::new()),
        });

        // Subscribe to the parent's broadcast before checking its state:
        // a cancel landing between the two steps reaches us either way,
        // and the inherited path is idempotent.
        {
            let mut children = parent
                .children
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            children.retain(|child| child.strong_count() > 0);
            children.push(Arc::downgrade(&inner));
        }

        match Inner::nearest_record(parent) {
            // Deriving from an already-cancelled parent: cancelled at birth.
            Some(record) => Inner::cancel_inherited(&inner, &record),
            None => Inner::arm_timeout(&inner),
        }

        inner
    }

    /// Nearest record on `node` itself or any of its ancestors.
    fn nearest_record(node: &Inner) -> Option<Cancellation> {
        if let Some(record) = node.lock_state().cancellation.clone() {
            return Some(record);
        }
        node.ancestor_record()
    }

    /// Arms the timeout timer, if the config bounds one.
    ///
    /// The timer task holds only a `Weak` reference, so it neither keeps an
    /// abandoned node alive nor holds the process open (spawned tasks die
    /// with the runtime). It is aborted on cancellation, re-arm and drop.
    fn arm_timeout(inner: &Arc<Inner>) {
        let Some(timeout) = inner.config.timeout_limit() else {
            return;
        };
        let weak = Arc::downgrade(inner);
        let handle = tokio::spawn(async move {
            time::sleep(timeout).await;
            if let Some(node) = weak.upgrade() {
                let reason = format!(
                    "[Context({})] timeout ({}ms) exceeded",
                    node.full_name(),
                    timeout.as_millis()
                );
                Inner::cancel_direct(&node, Some(reason));
            }
        });

        let mut state = inner.lock_state();
        if state.cancellation.is_some() {
            // Lost a race with cancellation; the fresh timer must not fire.
            handle.abort();
            return;
        }
        if let Some(old) = state.timer.replace(handle.abort_handle()) {
            old.abort();
        }
    }

    /// `cancel()` invoked on this node directly (explicit, timeout or
    /// retry-limit breach). No-op if already cancelled anywhere up the
    /// chain.
    fn cancel_direct(inner: &Arc<Inner>, reason: Option<String>) {
        if inner.cancelled() {
            return;
        }
        let record = {
            let mut state = inner.lock_state();
            if state.cancellation.is_some() {
                return;
            }
            let path = inner.full_name();
            let record = Cancellation {
                path: path.clone(),
                origin_path: path,
                reason,
                last_error: state.last_error.clone(),
            };
            state.cancellation = Some(record.clone());
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            record
        };
        inner.token.cancel();
        Inner::broadcast(inner, &record);
    }

    /// Receipt of an ancestor's broadcast: the record passes through with
    /// `origin_path`/`reason` intact; `path` and `last_error` are local.
    fn cancel_inherited(inner: &Arc<Inner>, inherited: &Cancellation) {
        let record = {
            let mut state = inner.lock_state();
            if state.cancellation.is_some() {
                return;
            }
            let record = Cancellation {
                path: inner.full_name(),
                origin_path: inherited.origin_path.clone(),
                reason: inherited.reason.clone(),
                last_error: state.last_error.clone(),
            };
            state.cancellation = Some(record.clone());
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            record
        };
        inner.token.cancel();
        Inner::broadcast(inner, &record);
    }

    /// Synchronously propagates `record` to every live child, recursively.
    /// All descendants hold their records before the initiating `cancel()`
    /// returns. Cancellation is terminal, so the subscription list is
    /// drained rather than kept.
    fn broadcast(inner: &Arc<Inner>, record: &Cancellation) {
        let subscribed = {
            let mut children = inner
                .children
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *children)
        };
        for weak in subscribed {
            if let Some(child) = weak.upgrade() {
                Inner::cancel_inherited(&child, record);
            }
        }
    }

    fn background() -> &'static Arc<Inner> {
        // Unbounded config: no retry limit, no timeout, hence no timer to
        // arm, so initialization is safe outside a runtime.
        BACKGROUND_NODE.get_or_init(|| {
            Arc::new(Inner {
                name: Some(BACKGROUND.to_owned()),
                parent: None,
                config: BackoffConfig::default(),
                token: CancellationToken::new(),
                state: Mutex::new(State {
                    cancellation: None,
                    retries: 0,
                    delay: BackoffConfig::default().base,
                    last_error: None,
                    timer: None,
                }),
                children: Mutex::new(Vec::new()),
            })
        })
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }
}

/// A node in the cancellation tree.
///
/// Cheap to clone (`Arc`-backed); clones observe the same node. A `Context`
/// exposes observation and coordination operations only — it cannot cancel
/// itself. The cancel capability lives in the [`CancelHandle`] returned
/// alongside it, so a context can be passed down a call chain without any
/// inner scope being able to cancel an outer one.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

/// The opaque cancel capability for one node.
///
/// Calling [`cancel`](Self::cancel) is the explicit `Active → Cancelled`
/// transition; it is idempotent, and the handle may be cloned and invoked
/// from anywhere.
#[derive(Clone)]
pub struct CancelHandle {
    inner: Arc<Inner>,
}

impl CancelHandle {
    /// Cancels the node with an optional human-readable reason.
    ///
    /// If the node is not already cancelled (directly or via an ancestor),
    /// publishes a [`Cancellation`] with `path == origin_path ==
    /// full_name()`, disarms the timeout timer, and synchronously broadcasts
    /// to all live descendants. No-op otherwise: the first record is final.
    pub fn cancel(&self, reason: Option<&str>) {
        Inner::cancel_direct(&self.inner, reason.map(str::to_owned));
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("path", &self.inner.full_name())
            .finish()
    }
}

impl Context {
    /// Returns the process-wide background singleton: the unique parentless
    /// node, created once, lazily, with an unbounded config.
    ///
    /// All other nodes descend from it. Do not stash it as hidden global
    /// state elsewhere; pass derived contexts down call chains explicitly.
    pub fn background() -> Context {
        Context {
            inner: Arc::clone(Inner::background()),
        }
    }

    /// Cancels the background node, and with it every context in the
    /// process. Intended for terminal teardown paths only.
    pub fn cancel_everything(reason: Option<&str>) {
        Inner::cancel_direct(Inner::background(), reason.map(str::to_owned));
    }

    /// Creates a new root context as a child of the background node.
    ///
    /// `overrides` are merged over the background config and validated;
    /// malformed configs fail fast here, before any node state exists.
    pub fn new(
        name: Option<&str>,
        overrides: BackoffOverrides,
    ) -> Result<(Context, CancelHandle), ConfigError> {
        Context::background().child(name, overrides)
    }

    /// Derives a child that inherits this node's resolved config (merged
    /// with `overrides`) and its cancellation: when this node cancels, the
    /// child observes the inherited record before the cancel returns.
    ///
    /// Deriving from an already-cancelled parent yields a child cancelled
    /// at birth, carrying the inherited record.
    pub fn child(
        &self,
        name: Option<&str>,
        overrides: BackoffOverrides,
    ) -> Result<(Context, CancelHandle), ConfigError> {
        let config = overrides.apply(&self.inner.config);
        config.validate()?;
        let inner = Inner::derive(&self.inner, name, config);
        Ok((
            Context {
                inner: Arc::clone(&inner),
            },
            CancelHandle { inner },
        ))
    }

    /// Creates a root context wired to OS termination signals.
    ///
    /// SIGINT, SIGTERM and SIGQUIT (ctrl-c on non-unix platforms) cancel
    /// the returned context with a reason naming the signal, cascading an
    /// orderly shutdown through everything derived from it. Must be called
    /// within a tokio runtime.
    pub fn for_process(name: Option<&str>) -> (Context, CancelHandle) {
        // Background config unchanged, already valid: infallible.
        let inner = Inner::derive(Inner::background(), name, Inner::background().config);
        let ctx = Context {
            inner: Arc::clone(&inner),
        };
        let cancel = CancelHandle { inner };

        let handle = cancel.clone();
        tokio::spawn(async move {
            match wait_for_shutdown_signal().await {
                Ok(signal) => {
                    handle.cancel(Some(&format!("{signal} received, cancelling root context")));
                }
                Err(err) => {
                    handle.cancel(Some(&format!("signal listener failed: {err}")));
                }
            }
        });

        (ctx, cancel)
    }

    /// True once this node, or any ancestor, has cancelled. Computed on
    /// read from the parent chain; never a cached flag, so it is accurate
    /// even mid-propagation.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled()
    }

    /// Returns the cancellation record, `Some` exactly when
    /// [`is_cancelled`](Self::is_cancelled) is true.
    ///
    /// If an ancestor's record exists but the broadcast has not reached
    /// this node yet, the ancestor's record is viewed through this node
    /// (local `path` and `last_error`), upholding the narrowing contract:
    /// a cancelled node always yields a record.
    pub fn cancellation(&self) -> Option<Cancellation> {
        if let Some(record) = self.inner.lock_state().cancellation.clone() {
            return Some(record);
        }
        let inherited = self.inner.ancestor_record()?;
        Some(Cancellation {
            path: self.inner.full_name(),
            origin_path: inherited.origin_path,
            reason: inherited.reason,
            last_error: self.inner.lock_state().last_error.clone(),
        })
    }

    /// Restores retry/backoff state to its initial values and re-arms the
    /// timeout timer from now. No-op once cancelled.
    pub fn reset(&self) {
        if self.inner.cancelled() {
            return;
        }
        {
            let mut state = self.inner.lock_state();
            if state.cancellation.is_some() {
                return;
            }
            state.retries = 0;
            state.delay = self.inner.config.base;
            state.last_error = None;
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
        }
        Inner::arm_timeout(&self.inner);
    }

    /// Records a failed attempt: bumps the retry counter, advances the
    /// backoff delay, and stores `err` as the node's last error. When the
    /// configured retry limit is reached, cancels the node with a generated
    /// reason naming its path and the limit. No-op once cancelled.
    pub fn failure(&self, err: Option<String>) {
        if self.inner.cancelled() {
            return;
        }
        let breached = {
            let mut state = self.inner.lock_state();
            if state.cancellation.is_some() {
                return;
            }
            state.retries += 1;
            state.delay = next_delay(state.delay, &self.inner.config);
            state.last_error = err;
            matches!(self.inner.config.retry_limit(), Some(limit) if state.retries >= limit)
        };
        if breached {
            let reason = format!(
                "[Context({})] maxRetries ({}) exceeded",
                self.inner.full_name(),
                self.inner.config.max_retries
            );
            Inner::cancel_direct(&self.inner, Some(reason));
        }
    }

    /// Suspends until the current backoff delay elapses or the node is
    /// cancelled, whichever comes first. Resolves immediately on an
    /// already-cancelled node. The underlying sleep is dropped on either
    /// path; no timer outlives the call.
    pub async fn backoff(&self) {
        if self.inner.cancelled() {
            return;
        }
        let delay = self.inner.lock_state().delay;
        let sleep = time::sleep(delay);
        tokio::pin!(sleep);
        tokio::select! {
            _ = &mut sleep => {}
            _ = self.inner.token.cancelled() => {}
        }
    }

    /// Suspends until the node is cancelled, returning its record.
    ///
    /// Safe to call repeatedly and from any number of callers; all observe
    /// the same eventual record, and a call on an already-cancelled node
    /// resolves immediately. Awaiting `wait()` is what holds a caller (and
    /// typically `main`) open until cancellation resolves — the keepalive
    /// for orchestration code that must block until shutdown.
    pub async fn wait(&self) -> Cancellation {
        loop {
            self.inner.token.cancelled().await;
            // The record is published strictly before the token cancels.
            if let Some(record) = self.cancellation() {
                return record;
            }
        }
    }

    /// This node's own name (`"[anonymous]"` if derived without one).
    pub fn name(&self) -> &str {
        self.inner.display_name()
    }

    /// Consecutive failures since the last `reset()`.
    pub fn retries(&self) -> u32 {
        self.inner.lock_state().retries
    }

    /// Root-to-node name path, slash-joined. Recomputed on every call.
    pub fn full_name(&self) -> String {
        self.inner.full_name()
    }

    /// The resolved backoff configuration this node runs with.
    pub fn config(&self) -> &BackoffConfig {
        &self.inner.config
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("path", &self.inner.full_name())
            .field("cancelled", &self.inner.cancelled())
            .field("retries", &self.inner.lock_state().retries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides() -> BackoffOverrides {
        BackoffOverrides::default()
    }

    #[test]
    fn test_fails_after_max_retries() {
        let (ctx, _cancel) = Context::new(
            Some("Retries"),
            BackoffOverrides {
                max_retries: Some(3),
                ..overrides()
            },
        )
        .expect("valid config");

        // Two failures stay within the limit.
        ctx.failure(None);
        ctx.failure(None);
        assert!(!ctx.is_cancelled());
        assert_eq!(ctx.retries(), 2);

        // Reset restarts the count.
        ctx.reset();
        assert_eq!(ctx.retries(), 0);
        ctx.failure(None);
        ctx.failure(None);
        assert!(!ctx.is_cancelled());

        // Third consecutive failure breaches the limit.
        ctx.failure(None);
        assert!(ctx.is_cancelled());

        // Reset has no effect once cancelled.
        ctx.reset();
        assert!(ctx.is_cancelled());

        let record = ctx.cancellation().expect("cancelled implies record");
        let reason = record.reason.expect("generated reason");
        assert!(reason.contains("maxRetries"));
        assert!(reason.contains('3'));
        assert!(reason.contains(&ctx.full_name()));
    }

    #[test]
    fn test_failure_records_last_error() {
        let (ctx, cancel) = Context::new(Some("Errs"), overrides()).expect("valid config");
        ctx.failure(Some("boom".into()));
        cancel.cancel(Some("done"));

        let record = ctx.cancellation().expect("record");
        assert_eq!(record.last_error.as_deref(), Some("boom"));
        assert_eq!(record.reason.as_deref(), Some("done"));
    }

    #[test]
    fn test_parent_cancels_child() {
        let (parent, cancel) = Context::new(Some("Parent"), overrides()).expect("valid config");
        let (child, _child_cancel) = parent.child(Some("Child"), overrides()).expect("valid config");

        assert!(!parent.is_cancelled());
        assert!(!child.is_cancelled());

        cancel.cancel(None);
        assert!(parent.is_cancelled());
        assert!(child.is_cancelled());

        let record = child.cancellation().expect("record");
        assert_eq!(record.origin_path, parent.full_name());
        assert_eq!(record.path, child.full_name());
    }

    #[test]
    fn test_child_does_not_cancel_parent_or_sibling() {
        let (parent, _cancel) = Context::new(Some("Parent"), overrides()).expect("valid config");
        let (child, child_cancel) = parent.child(Some("Child"), overrides()).expect("valid config");
        let (sibling, _sibling_cancel) =
            parent.child(Some("Sibling"), overrides()).expect("valid config");

        child_cancel.cancel(None);
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
        assert!(!sibling.is_cancelled());

        let record = child.cancellation().expect("record");
        assert_eq!(record.origin_path, child.full_name());
    }

    #[test]
    fn test_origin_path_passes_through_chain() {
        let (root, _root_cancel) = Context::new(Some("Root"), overrides()).expect("valid config");
        let (a, a_cancel) = root.child(Some("A"), overrides()).expect("valid config");
        let (b, _b_cancel) = a.child(Some("B"), overrides()).expect("valid config");

        a_cancel.cancel(Some("x"));

        let record = b.cancellation().expect("record");
        assert_eq!(record.origin_path, a.full_name());
        assert_eq!(record.path, b.full_name());
        assert_eq!(record.reason.as_deref(), Some("x"));
        assert!(!root.is_cancelled());
    }

    #[test]
    fn test_derived_from_cancelled_parent_is_cancelled_at_birth() {
        let (parent, cancel) = Context::new(Some("Parent"), overrides()).expect("valid config");
        cancel.cancel(Some("gone"));

        let (child, _child_cancel) = parent.child(Some("Late"), overrides()).expect("valid config");
        assert!(child.is_cancelled());

        let record = child.cancellation().expect("record");
        assert_eq!(record.origin_path, parent.full_name());
        assert_eq!(record.reason.as_deref(), Some("gone"));
        assert_eq!(record.path, child.full_name());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let (ctx, cancel) = Context::new(Some("Once"), overrides()).expect("valid config");
        cancel.cancel(Some("first"));
        cancel.cancel(Some("second"));

        let record = ctx.cancellation().expect("record");
        assert_eq!(record.reason.as_deref(), Some("first"));
        assert_eq!(record.path, ctx.full_name());
    }

    #[test]
    fn test_failure_is_noop_after_cancel() {
        let (ctx, cancel) = Context::new(Some("Frozen"), overrides()).expect("valid config");
        ctx.failure(Some("early".into()));
        cancel.cancel(None);

        ctx.failure(Some("late".into()));
        assert_eq!(ctx.retries(), 1);

        let record = ctx.cancellation().expect("record");
        assert_eq!(record.last_error.as_deref(), Some("early"));
    }

    #[test]
    fn test_full_name_and_anonymous() {
        let (a, _ca) = Context::new(Some("A"), overrides()).expect("valid config");
        let (b, _cb) = a.child(Some("B"), overrides()).expect("valid config");
        let (anon, _cn) = b.child(None, overrides()).expect("valid config");

        assert_eq!(a.full_name(), "Background/A");
        assert_eq!(b.full_name(), "Background/A/B");
        assert_eq!(anon.full_name(), "Background/A/B/[anonymous]");
        assert_eq!(anon.name(), "[anonymous]");
    }

    #[test]
    fn test_child_rejects_malformed_overrides() {
        let err = Context::new(
            Some("Bad"),
            BackoffOverrides {
                rate: Some(0.2),
                ..overrides()
            },
        );
        assert!(matches!(err, Err(ConfigError::InvalidRate { .. })));
    }

    #[test]
    fn test_reset_restores_backoff_state() {
        let (ctx, _cancel) = Context::new(Some("Reset"), overrides()).expect("valid config");
        ctx.failure(Some("e1".into()));
        ctx.failure(Some("e2".into()));
        assert_eq!(ctx.retries(), 2);

        ctx.reset();
        assert_eq!(ctx.retries(), 0);
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let timeout = Duration::from_millis(10);
        let (ctx, _cancel) = Context::new(
            Some("Timeout"),
            BackoffOverrides {
                timeout: Some(timeout),
                ..overrides()
            },
        )
        .expect("valid config");

        assert!(!ctx.is_cancelled());
        time::sleep(Duration::from_millis(11)).await;
        assert!(ctx.is_cancelled());

        let record = ctx.cancellation().expect("record");
        let reason = record.reason.expect("generated reason");
        assert!(reason.contains("timeout"));
        assert!(reason.contains("10"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_rearms_timeout() {
        let (ctx, _cancel) = Context::new(
            Some("Rearm"),
            BackoffOverrides {
                timeout: Some(Duration::from_millis(100)),
                ..overrides()
            },
        )
        .expect("valid config");

        time::sleep(Duration::from_millis(60)).await;
        ctx.reset();

        // Original deadline (100ms) passes without firing.
        time::sleep(Duration::from_millis(60)).await;
        assert!(!ctx.is_cancelled());

        // The re-armed deadline (160ms) does fire.
        time::sleep(Duration::from_millis(50)).await;
        assert!(ctx.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_escapes_on_cancel() {
        let (ctx, cancel) = Context::new(
            Some("Backoff"),
            BackoffOverrides {
                base: Some(Duration::from_secs(100_000)),
                max: Some(Duration::from_secs(200_000)),
                jitter: Some(Duration::ZERO),
                ..overrides()
            },
        )
        .expect("valid config");

        let started = time::Instant::now();
        let pending = tokio::spawn({
            let ctx = ctx.clone();
            async move { ctx.backoff().await }
        });
        tokio::task::yield_now().await;

        cancel.cancel(Some("Backoff"));
        pending.await.expect("backoff task");

        // Paused clock: any sleep-through would be visible as elapsed time.
        assert!(started.elapsed() < Duration::from_secs(100_000));
    }

    #[tokio::test]
    async fn test_backoff_immediate_when_cancelled() {
        let (ctx, cancel) = Context::new(Some("Instant"), overrides()).expect("valid config");
        cancel.cancel(None);
        // Resolves without waiting the configured delay.
        ctx.backoff().await;
    }

    #[tokio::test]
    async fn test_wait_resolves_with_reason() {
        let (ctx, cancel) = Context::new(Some("Wait"), overrides()).expect("valid config");
        let pending = tokio::spawn({
            let ctx = ctx.clone();
            async move { ctx.wait().await }
        });
        tokio::task::yield_now().await;

        cancel.cancel(Some("foo"));
        let record = pending.await.expect("wait task");
        assert_eq!(record.reason.as_deref(), Some("foo"));
    }

    #[tokio::test]
    async fn test_wait_shared_across_tree_and_callers() {
        let (grandparent, _gc) = Context::new(Some("Wait0"), overrides()).expect("valid config");
        let (parent, cancel) = grandparent.child(Some("Wait1"), overrides()).expect("valid config");
        let (child1, _c1) = parent.child(Some("Wait2"), overrides()).expect("valid config");
        let (child2, _c2) = parent.child(Some("Wait2"), overrides()).expect("valid config");

        let pending = tokio::spawn({
            let ctx = child1.clone();
            async move { ctx.wait().await }
        });
        tokio::task::yield_now().await;

        cancel.cancel(Some("foo"));
        let record = pending.await.expect("wait task");
        assert_eq!(record.reason.as_deref(), Some("foo"));

        // Parent and sibling waits resolve too; repeated waits are fine.
        parent.wait().await;
        child2.wait().await;
        let again = child2.wait().await;
        assert_eq!(again.reason.as_deref(), Some("foo"));

        assert!(!grandparent.is_cancelled());
    }

    #[tokio::test]
    async fn test_for_process_derives_live_root() {
        let (ctx, cancel) = Context::for_process(Some("svc"));
        assert!(!ctx.is_cancelled());
        assert_eq!(ctx.full_name(), "Background/svc");
        cancel.cancel(Some("test teardown"));
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_background_is_singleton() {
        assert!(Arc::ptr_eq(
            &Context::background().inner,
            &Context::background().inner,
        ));
        assert_eq!(Context::background().full_name(), "Background");
    }
}
