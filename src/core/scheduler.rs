//! # Scheduler: admission facade, dispatcher lifecycle and graceful shutdown.
//!
//! The [`Scheduler`] owns the shared registry, the worker table, the event bus
//! and the [`SubscriberSet`]. It is built through [`Scheduler::builder`], which
//! spawns the dispatcher and the subscriber listener.
//!
//! ## High-level architecture
//! ```text
//! Submitter ── submit(Request) ──► admission ──► SyncCore { RwLock<AlarmRegistry> }
//!                                      │                 ▲            ▲
//!                                      ├─ work signal ──► Dispatcher ─┤ (table → registry)
//!                                      │                   │ spawn/retire
//!                                      │                   ▼
//!                                      └─ deadline wake ──► DisplayWorker (one per type)
//!                                                           │
//!                                                           └─► AlarmOutput::display
//!
//! Event flow:
//!   admission / Dispatcher / DisplayWorker ── publish(Event) ──► Bus
//!        ──► subscriber_listener ──► SubscriberSet::emit ──► [queue] ──► sub.on_event()
//!
//! Shutdown path:
//!   shutdown() / run_until_signal()
//!        └─► Bus.publish(ShutdownRequested)
//!        └─► runtime_token.cancel()          → dispatcher and every worker token
//!        └─► join dispatcher
//!        └─► wait_all_with_grace(cfg.grace):
//!               ├─ all joined  → AllStoppedWithin
//!               └─ timeout     → GraceExceeded (stuck types, tasks aborted)
//! ```
//!
//! ## Example
//! ```rust
//! use alarmvisor::{AlarmConfig, Request, Scheduler};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scheduler = Scheduler::builder(AlarmConfig::default()).build();
//!
//!     scheduler.submit(Request::schedule(1, 5, 2, "hi")?).await?;
//!     scheduler.submit(Request::watch(1)?).await?;
//!
//!     let snapshot = scheduler.snapshot().await;
//!     assert_eq!(snapshot.schedule_ids(), vec![5]);
//!
//!     scheduler.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::AlarmConfig;
use crate::core::admission::{self, Ack};
use crate::core::builder::SchedulerBuilder;
use crate::core::shared::Shared;
use crate::core::shutdown;
use crate::core::snapshot::Snapshot;
use crate::core::workers::{WorkerHandle, WorkerTable};
use crate::error::{RuntimeError, SubmitError};
use crate::events::{Event, EventKind};
use crate::requests::Request;
use crate::subscribers::SubscriberSet;

/// Concurrent alarm scheduler.
pub struct Scheduler {
    pub(crate) shared: Arc<Shared>,
    pub(crate) table: Arc<RwLock<WorkerTable>>,
    pub(crate) subs: Arc<SubscriberSet>,
    pub(crate) runtime_token: CancellationToken,
    pub(crate) dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Creates a builder for constructing a Scheduler.
    ///
    /// ## Example
    /// ```rust
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// use alarmvisor::{AlarmConfig, Scheduler};
    ///
    /// let scheduler = Scheduler::builder(AlarmConfig::default())
    ///     .with_subscribers(vec![])
    ///     .build();
    /// # scheduler.shutdown().await.unwrap();
    /// # }
    /// ```
    pub fn builder(cfg: AlarmConfig) -> SchedulerBuilder {
        SchedulerBuilder::new(cfg)
    }

    /// Admits `request` into the registry.
    ///
    /// Returns once the entry is linked; processing by the dispatcher happens
    /// asynchronously.
    ///
    /// ### Errors
    /// - [`SubmitError::Validation`] text longer than `max_text_len`
    /// - [`SubmitError::DuplicateWatch`] / [`SubmitError::DuplicateCancel`]
    /// - [`SubmitError::TypeNotFound`] / [`SubmitError::IdNotFound`]
    /// - [`SubmitError::Closed`] after shutdown began
    /// - [`SubmitError::Synchronization`] broken internal state (fatal)
    pub async fn submit(&self, request: Request) -> Result<Ack, SubmitError> {
        if self.runtime_token.is_cancelled() {
            self.shared.bus.publish(
                Event::new(EventKind::AdmissionRejected)
                    .with_request(request.kind())
                    .with_reason(SubmitError::Closed.as_label()),
            );
            return Err(SubmitError::Closed);
        }
        admission::admit(&self.shared, request).await
    }

    /// Returns a consistent copy of the registry and the worker table.
    ///
    /// Takes the table before the registry, the same order as the dispatcher.
    pub async fn snapshot(&self) -> Snapshot {
        let table = self.table.read().await;
        let registry = self.shared.core.read().await;
        Snapshot::capture(&registry, &table)
    }

    /// Receiver for every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.shared.bus.subscribe()
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AlarmConfig {
        &self.shared.cfg
    }

    /// Number of subscribers attached at build time.
    pub fn subscriber_count(&self) -> usize {
        self.subs.len()
    }

    /// Waits for a termination signal, then shuts down.
    ///
    /// ### Errors
    /// - [`RuntimeError::Synchronization`] if signal handlers cannot be installed
    /// - anything [`Scheduler::shutdown`] returns
    pub async fn run_until_signal(&self) -> Result<(), RuntimeError> {
        let signal = shutdown::wait_for_shutdown_signal()
            .await
            .map_err(|e| RuntimeError::Synchronization {
                reason: format!("cannot listen for termination signals: {e}"),
            })?;
        tracing::info!(signal = signal.as_label(), "termination signal received");
        self.shutdown().await
    }

    /// Stops admission, the dispatcher and every display worker.
    ///
    /// Workers get [`AlarmConfig::grace`] to stop; workers still running after
    /// that are aborted and reported. Calling it again is a no-op.
    ///
    /// ### Errors
    /// - [`RuntimeError::GraceExceeded`] with the types of stuck workers
    /// - [`RuntimeError::Synchronization`] if the dispatcher panicked
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let Some(dispatcher) = self.dispatcher.lock().await.take() else {
            return Ok(());
        };
        self.shared.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.runtime_token.cancel();

        if let Err(join_err) = dispatcher.await {
            tracing::error!(error = %join_err, "dispatcher task failed");
            return Err(RuntimeError::Synchronization {
                reason: format!("dispatcher task failed: {join_err}"),
            });
        }

        let handles = self.table.write().await.drain();
        self.wait_all_with_grace(handles).await
    }

    /// Waits for all workers within the configured grace period.
    async fn wait_all_with_grace(&self, mut handles: Vec<WorkerHandle>) -> Result<(), RuntimeError> {
        let grace = self.shared.cfg.grace;
        let done = async {
            for handle in handles.iter_mut() {
                let _ = (&mut handle.join).await;
            }
        };

        let joined = tokio::time::timeout(grace, done).await;
        match joined {
            Ok(()) => {
                self.shared.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_elapsed) => {
                let mut stuck = Vec::new();
                for handle in handles.iter().filter(|h| !h.join.is_finished()) {
                    handle.join.abort();
                    stuck.push(handle.message_type);
                }
                stuck.sort_unstable();
                stuck.dedup();

                self.shared.bus.publish(
                    Event::new(EventKind::GraceExceeded)
                        .with_reason(format!("stuck types={stuck:?}")),
                );
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.runtime_token.cancel();
    }
}
