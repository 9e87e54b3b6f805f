//! # Scoped execution: run work bound to a context, cancel on exit.
//!
//! [`Context::with`] ties a derived context to the lifetime of one unit of
//! work: the body runs with the context, and the cancel handle fires on
//! every exit path — normal completion, an error value, or the future being
//! dropped mid-flight (including panic unwinds through the executor). No
//! context handle outlives its scope uncancelled, so timers and
//! subscriptions cannot leak from abandoned scopes.
//!
//! # Example
//! ```rust
//! use ctxtree::{BackoffOverrides, Context};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), ctxtree::ConfigError> {
//!     let scope = Context::new(Some("job"), BackoffOverrides::default())?;
//!     let checked = scope.0.clone();
//!
//!     let answer = Context::with(scope, |ctx| async move {
//!         assert!(!ctx.is_cancelled());
//!         42
//!     })
//!     .await;
//!
//!     assert_eq!(answer, 42);
//!     assert!(checked.is_cancelled());
//!     Ok(())
//! }
//! ```

use std::future::Future;

use crate::context::node::{CancelHandle, Context};

/// Cancels the held node when dropped, whichever way the scope unwinds.
struct CancelOnDrop {
    handle: CancelHandle,
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.handle.cancel(None);
    }
}

impl Context {
    /// Runs `body` within the scope of a derived context, cancelling the
    /// context when the scope ends.
    ///
    /// Takes the `(Context, CancelHandle)` pair a derivation returns; the
    /// handle is consumed by the scope, so nothing outside it can observe
    /// an uncancelled context after the body finishes.
    ///
    /// The guard is armed when `with` is called, not when the returned
    /// future is first polled, so even a scope future that is dropped
    /// unpolled cancels its context.
    pub fn with<T, F, Fut>(scope: (Context, CancelHandle), body: F) -> impl Future<Output = T>
    where
        F: FnOnce(Context) -> Fut,
        Fut: Future<Output = T>,
    {
        let (ctx, cancel) = scope;
        let guard = CancelOnDrop { handle: cancel };
        async move {
            let _guard = guard;
            body(ctx).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::BackoffOverrides;

    #[tokio::test]
    async fn test_scope_cancels_on_success() {
        let scope = Context::new(Some("Scope"), BackoffOverrides::default()).expect("valid config");
        let observed = scope.0.clone();

        let out = Context::with(scope, |ctx| async move {
            assert!(!ctx.is_cancelled());
            "done"
        })
        .await;

        assert_eq!(out, "done");
        assert!(observed.is_cancelled());
    }

    #[tokio::test]
    async fn test_scope_cancels_on_error() {
        let scope = Context::new(Some("Scope"), BackoffOverrides::default()).expect("valid config");
        let observed = scope.0.clone();

        let out: Result<(), &str> = Context::with(scope, |_ctx| async { Err("boom") }).await;

        assert!(out.is_err());
        assert!(observed.is_cancelled());
    }

    #[tokio::test]
    async fn test_scope_cancels_when_dropped_unfinished() {
        let scope = Context::new(Some("Scope"), BackoffOverrides::default()).expect("valid config");
        let observed = scope.0.clone();

        // Never polled to completion: the body would wait forever.
        let pending = Context::with(scope, |ctx| async move {
            ctx.wait().await;
        });
        drop(pending);

        assert!(observed.is_cancelled());
    }

    #[tokio::test]
    async fn test_explicit_cancel_inside_scope_wins() {
        let scope = Context::new(Some("Scope"), BackoffOverrides::default()).expect("valid config");
        let observed = scope.0.clone();
        let handle = scope.1.clone();

        Context::with(scope, |_ctx| async move {
            handle.cancel(Some("early"));
        })
        .await;

        let record = observed.cancellation().expect("record");
        // The in-scope reason is preserved; the guard's cancel is a no-op.
        assert_eq!(record.reason.as_deref(), Some("early"));
    }
}
