//! # Demo: process_shutdown
//!
//! Shows a service entry point built around [`Context::for_process`]: OS
//! termination signals cancel the root context, and the shutdown cascades
//! through every worker derived from it.
//!
//! ## Flow
//! ```text
//! Context::for_process("svc")
//!   ├─► worker-1 = root.child(...)   each worker loops until cancelled
//!   ├─► worker-2 = root.child(...)
//!   └─► root.wait().await            main blocks here (the keepalive)
//!
//! SIGINT/SIGTERM/SIGQUIT ─► cancel(root, "SIGTERM received, ...")
//!   ─► workers observe cancellation, finish their tick, exit
//!   ─► root.wait() resolves with the record ─► main returns
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example process_shutdown
//! # then press Ctrl-C
//! ```

use std::time::Duration;

use ctxtree::{BackoffOverrides, Context};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (root, _cancel) = Context::for_process(Some("svc"));
    println!("[up] root={} (press Ctrl-C to stop)", root.full_name());

    for i in 1..=2 {
        let (worker, _worker_cancel) =
            root.child(Some(&format!("worker-{i}")), BackoffOverrides::default())?;
        tokio::spawn(async move {
            let mut ticks = 0u64;
            while !worker.is_cancelled() {
                ticks += 1;
                println!("[tick] task={} ticks={}", worker.full_name(), ticks);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            println!("[stopped] task={} ticks={}", worker.full_name(), ticks);
        });
    }

    // Block until a signal cancels the root; awaiting wait() is what holds
    // the process open.
    let record = root.wait().await;
    println!(
        "[shutdown] reason={:?} origin={}",
        record.reason, record.origin_path
    );

    // Give workers a beat to observe cancellation and log their exit.
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(())
}
