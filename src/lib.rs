//! # alarmvisor
//!
//! **Alarmvisor** is a concurrent alarm scheduler for tokio.
//!
//! It accepts three kinds of requests: SCHEDULE a one-shot alarm, WATCH a
//! message type so its alarms get displayed, and CANCEL a scheduled alarm.
//! Requests live in one shared ordered registry; a dispatcher task keeps one
//! display worker per watched type, and each worker fires at its nearest
//! deadline.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   SCHEDULE   │   │    WATCH     │   │    CANCEL    │
//!     │ (type,id,ttl)│   │    (type)    │   │     (id)     │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Scheduler::submit  (validated admission, exclusive registry)     │
//! └──────┬───────────────────────────────┬────────────────────────────┘
//!        ▼                               │ work signal / deadline wake
//! ┌──────────────────────────────┐       ▼
//! │ AlarmRegistry (RwLock)       │◄── Dispatcher ──► WorkerTable
//! │ WATCH t.. │ SCHED id↑ │CANCEL│        │  spawn / retire / reap
//! └──────────────────────────────┘        ▼
//!        ▲ read / claim          ┌──────────────┐   ┌──────────────┐
//!        └───────────────────────│ DisplayWorker│   │ DisplayWorker│
//!                                │   (type 1)   │   │   (type 4)   │
//!                                └──────┬───────┘   └──────┬───────┘
//!                                       ▼                  ▼
//!                                   AlarmOutput::display (stdout by default)
//!
//!  every component ── publish(Event) ──► Bus ──► subscriber_listener ──► SubscriberSet
//!                                                                  ┌─────────┼─────────┐
//!                                                                  ▼         ▼         ▼
//!                                                              LogWriter   sub2      subN
//! ```
//!
//! ### Lifecycle of a watched type
//! ```text
//! SCHEDULE(t, id) + WATCH(t) ──► Dispatcher spawns DisplayWorker(t)
//!
//! loop {
//!   ├─► nearest SCHEDULE of t  (shared access)
//!   │     ├─ none        ─► drained: exit, Dispatcher reaps, WATCH released
//!   │     ├─ due         ─► claim (exclusive) ─► [type changed notice] ─► display
//!   │     └─ later       ─► wait: deadline | earlier-deadline wake | retire flag
//!   └─ retire flag (CANCEL emptied the type, shutdown) ─► exit
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                                     | Key types / traits                         |
//! |-------------------|-----------------------------------------------------------------|--------------------------------------------|
//! | **Scheduling**    | Submit requests, inspect state, shut down gracefully.          | [`Scheduler`], [`Ack`], [`Snapshot`]       |
//! | **Requests**      | Validated SCHEDULE / WATCH / CANCEL constructors.               | [`Request`]                                |
//! | **Output**        | Pluggable display sink.                                         | [`AlarmOutput`], [`StdoutOutput`]          |
//! | **Subscriber API**| Hook into runtime events (logging, metrics, custom subscribers).| [`Subscribe`], [`Event`], [`EventKind`]    |
//! | **Errors**        | Typed admission and runtime errors.                             | [`SubmitError`], [`RuntimeError`]          |
//! | **Configuration** | Centralize runtime settings.                                    | [`AlarmConfig`], [`DisplayMode`]           |
//!
//! ## Optional features
//! - `logging` (default): exports the built-in [`LogWriter`] subscriber, which renders events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use alarmvisor::{AlarmConfig, Request, Scheduler};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn alarmvisor::Subscribe>> = vec![Arc::new(alarmvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn alarmvisor::Subscribe>> = Vec::new();
//!
//!     let scheduler = Scheduler::builder(AlarmConfig::default())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     scheduler.submit(Request::schedule(1, 5, 1, "hello")?).await?;
//!     scheduler.submit(Request::watch(1)?).await?;
//!
//!     tokio::time::sleep(std::time::Duration::from_millis(1200)).await;
//!     scheduler.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod output;
mod requests;
mod subscribers;

// ---- Public re-exports ----

pub use config::{AlarmConfig, DEFAULT_MAX_TEXT_LEN, DisplayMode};
pub use core::{Ack, EntryView, Scheduler, SchedulerBuilder, Snapshot, WorkerState, WorkerView};
pub use error::{AdmissionStatus, RuntimeError, SubmitError, ValidationError};
pub use events::{Bus, Event, EventKind};
pub use output::{AlarmOutput, Notice, StdoutOutput};
pub use requests::{Cancel, MessageId, MessageType, Request, RequestKind, Schedule, Watch};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose the built-in tracing subscriber.
// Enable with: `--features logging` (on by default)
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
