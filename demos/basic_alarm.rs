//! # Example: basic_alarm
//!
//! Schedules a few alarms, watches two types, cancels one alarm and replaces
//! another with a different type. Events are logged through `tracing`.
//!
//! ## Flow
//! ```text
//! submit(SCHEDULE t=1 id=5 ttl=2)   submit(SCHEDULE t=1 id=6 ttl=4)
//! submit(SCHEDULE t=2 id=8 ttl=3)   submit(WATCH t=1)  submit(WATCH t=2)
//! submit(CANCEL id=8)                       → worker for type 2 retires
//! submit(SCHEDULE t=1 id=8 ttl=1)           → new id, type 1
//! submit(SCHEDULE t=2 id=6 ttl=1) + WATCH 2 → id 6 moves to type 2 (type changed notice)
//!     ... displays on stdout ...
//! shutdown() after 6s or on Ctrl-C
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=alarmvisor=debug cargo run --example basic_alarm
//! ```

use std::sync::Arc;
use std::time::Duration;

use alarmvisor::{AlarmConfig, Request, Scheduler, Subscribe};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("alarmvisor=info")),
        )
        .init();

    #[cfg(feature = "logging")]
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(alarmvisor::LogWriter::new())];
    #[cfg(not(feature = "logging"))]
    let subs: Vec<Arc<dyn Subscribe>> = Vec::new();

    let scheduler = Scheduler::builder(AlarmConfig::default())
        .with_subscribers(subs)
        .build();

    scheduler.submit(Request::schedule(1, 5, 2, "stand up")?).await?;
    scheduler.submit(Request::schedule(1, 6, 4, "stretch")?).await?;
    scheduler.submit(Request::schedule(2, 8, 3, "tea")?).await?;
    scheduler.submit(Request::watch(1)?).await?;
    scheduler.submit(Request::watch(2)?).await?;

    scheduler.submit(Request::cancel(8)?).await?;
    scheduler.submit(Request::schedule(1, 8, 1, "water")?).await?;

    // Rejected: nothing of type 9 is scheduled.
    if let Err(err) = scheduler.submit(Request::watch(9)?).await {
        println!("watch 9 rejected: {err} ({})", err.as_label());
    }

    tokio::time::sleep(Duration::from_millis(500)).await;
    scheduler.submit(Request::schedule(2, 6, 1, "stretch, type 2")?).await?;
    scheduler.submit(Request::watch(2)?).await?;

    let snapshot = scheduler.snapshot().await;
    println!(
        "pending ids: {:?}, active workers: {:?}",
        snapshot.schedule_ids(),
        snapshot.active_types()
    );

    tokio::select! {
        res = scheduler.run_until_signal() => res?,
        _ = tokio::time::sleep(Duration::from_secs(6)) => scheduler.shutdown().await?,
    }
    Ok(())
}
