//! # Context-driven retry loop.
//!
//! [`retry`] runs an async operation until it succeeds or its [`Context`]
//! cancels, reporting each failed attempt via [`Context::failure`] and
//! pausing via [`Context::backoff`] in between. All give-up conditions —
//! explicit cancel, timeout, retry-limit breach, an ancestor shutting down —
//! therefore live in one place: the context's config.
//!
//! ## Flow
//! ```text
//! loop {
//!   ├─► ctx cancelled? ──► Err(Cancelled { record })
//!   ├─► body().await
//!   │     ├─ Ok(v)  ──► Ok(v)
//!   │     └─ Err(e) ──► ctx.failure(e)
//!   │                     ├─ ctx cancelled? ──► Err(Exhausted { e, record })
//!   │                     └─► ctx.backoff().await (cancellable) ─► continue
//! }
//! ```
//!
//! # Example
//! ```rust
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use ctxtree::{retry, BackoffOverrides, Context};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (ctx, _cancel) = Context::new(
//!         Some("flaky"),
//!         BackoffOverrides {
//!             base: Some(std::time::Duration::from_millis(1)),
//!             max_retries: Some(5),
//!             ..Default::default()
//!         },
//!     )?;
//!
//!     let attempts = AtomicU32::new(0);
//!     let out = retry(&ctx, || async {
//!         if attempts.fetch_add(1, Ordering::Relaxed) < 2 {
//!             Err("boom")
//!         } else {
//!             Ok("done")
//!         }
//!     })
//!     .await?;
//!
//!     assert_eq!(out, "done");
//!     assert_eq!(ctx.retries(), 2);
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::future::Future;

use crate::context::Context;
use crate::error::RetryError;

/// Runs `body` until it succeeds or `ctx` cancels.
///
/// Each failed attempt advances the context's retry counter and backoff
/// delay; the pause between attempts is cancellable, so a shutdown cascade
/// never waits out a backoff. Cancellation observed before an attempt maps
/// to [`RetryError::Cancelled`]; cancellation caused or overlapped by a
/// failed attempt maps to [`RetryError::Exhausted`] carrying that attempt's
/// error.
pub async fn retry<T, E, F, Fut>(ctx: &Context, mut body: F) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    loop {
        if let Some(cancellation) = ctx.cancellation() {
            return Err(RetryError::Cancelled { cancellation });
        }
        match body().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let error = err.to_string();
                ctx.failure(Some(error.clone()));
                if let Some(cancellation) = ctx.cancellation() {
                    return Err(RetryError::Exhausted {
                        error,
                        cancellation,
                    });
                }
                ctx.backoff().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use crate::policies::BackoffOverrides;

    fn fast() -> BackoffOverrides {
        BackoffOverrides {
            base: Some(Duration::from_millis(1)),
            max: Some(Duration::from_millis(5)),
            jitter: Some(Duration::ZERO),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let (ctx, _cancel) = Context::new(Some("flaky"), fast()).expect("valid config");

        let attempts = AtomicU32::new(0);
        let out = retry(&ctx, || async {
            if attempts.fetch_add(1, Ordering::Relaxed) < 3 {
                Err("transient")
            } else {
                Ok(7)
            }
        })
        .await
        .expect("eventual success");

        assert_eq!(out, 7);
        assert_eq!(ctx.retries(), 3);
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_exhausts_retry_limit() {
        let (ctx, _cancel) = Context::new(
            Some("doomed"),
            BackoffOverrides {
                max_retries: Some(3),
                ..fast()
            },
        )
        .expect("valid config");

        let err = retry::<(), _, _, _>(&ctx, || async { Err("always fails") })
            .await
            .expect_err("must exhaust");

        match err {
            RetryError::Exhausted { error, cancellation } => {
                assert_eq!(error, "always fails");
                assert_eq!(
                    cancellation.last_error.as_deref(),
                    Some("always fails")
                );
                let reason = cancellation.reason.expect("generated reason");
                assert!(reason.contains("maxRetries"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let (ctx, cancel) = Context::new(Some("stillborn"), fast()).expect("valid config");
        cancel.cancel(Some("shutting down"));

        let err = retry::<(), &str, _, _>(&ctx, || async { Ok(()) })
            .await
            .expect_err("no attempt may run");

        match err {
            RetryError::Cancelled { cancellation } => {
                assert_eq!(cancellation.reason.as_deref(), Some("shutting down"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_backoff() {
        let (ctx, cancel) = Context::new(
            Some("slow"),
            BackoffOverrides {
                base: Some(Duration::from_secs(100_000)),
                max: Some(Duration::from_secs(200_000)),
                jitter: Some(Duration::ZERO),
                ..Default::default()
            },
        )
        .expect("valid config");

        let pending = tokio::spawn({
            let ctx = ctx.clone();
            async move { retry::<(), _, _, _>(&ctx, || async { Err("nope") }).await }
        });
        tokio::task::yield_now().await;

        let started = tokio::time::Instant::now();
        cancel.cancel(Some("shutdown"));
        let err = pending.await.expect("retry task").expect_err("cancelled");

        assert_eq!(err.as_label(), "retry_cancelled");
        assert!(started.elapsed() < Duration::from_secs(100_000));
    }
}
