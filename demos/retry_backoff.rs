//! # Demo: retry_backoff
//!
//! Demonstrates the [`retry`] loop: a flaky operation fails a few times,
//! each failure advances the context's retry counter and backoff delay,
//! and the retry limit turns persistent failure into cancellation.
//!
//! ## Flow
//! ```text
//! retry(ctx, body)
//!   ├─► attempt 1 → Err("boom #1") → failure() → backoff ≈ 50ms
//!   ├─► attempt 2 → Err("boom #2") → failure() → backoff ≈ 100ms
//!   ├─► attempt 3 → Ok("payload")  → Ok
//!   └─► (with max_retries=2 the third attempt would never run:
//!        failure() cancels with "maxRetries (2) exceeded")
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example retry_backoff
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use ctxtree::{retry, BackoffOverrides, Context};

static ATTEMPTS: AtomicU32 = AtomicU32::new(0);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (ctx, _cancel) = Context::new(
        Some("flaky"),
        BackoffOverrides {
            base: Some(Duration::from_millis(50)),
            rate: Some(2.0),
            max_retries: Some(5),
            ..Default::default()
        },
    )?;

    let out = retry(&ctx, || async {
        let attempt = ATTEMPTS.fetch_add(1, Ordering::Relaxed) + 1;
        println!("[attempt] task={} n={}", ctx.full_name(), attempt);
        if attempt <= 2 {
            println!("[failed] task={} err=\"boom #{attempt}\"", ctx.full_name());
            Err(format!("boom #{attempt}"))
        } else {
            Ok("payload")
        }
    })
    .await;

    match out {
        Ok(value) => println!(
            "[done] task={} value={value:?} retries={}",
            ctx.full_name(),
            ctx.retries()
        ),
        Err(err) => println!("[gave-up] task={} err={err}", ctx.full_name()),
    }
    Ok(())
}
