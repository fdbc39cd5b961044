//! # Dispatcher: processes fresh entries and keeps one worker per active type.
//!
//! The dispatcher is the only writer of the [`WorkerTable`]. It sleeps until the
//! "new work" signal fires, then scans until no fresh entry is left.
//!
//! ## States
//! ```text
//! IDLE ── work signal ──► SCANNING ── pass with no fresh entries ──► IDLE
//!                           │
//!   one pass:               ├─► table.write():
//!                           │     take leaving workers / finished orphans
//!                           │     registry.write():
//!                           │       fresh entries in admission order:
//!                           │         SCHEDULE → mark processed
//!                           │         WATCH    → mark processed
//!                           │         CANCEL   → drop CANCEL + target (or CancelMissing)
//!                           │       desired = watched types with ≥1 SCHEDULE
//!                           │       release WATCH entries of emptied types
//!                           │     take handles of (active − desired)
//!                           │     spawn(desired − active)
//!                           ├─► release table and registry
//!                           └─► retire taken handles   (cancel, join ≤ retire_grace, else orphan)
//! ```
//!
//! ## Rules
//! - Lock order: worker table, then registry. Joins happen with both released;
//!   a handle being joined is in neither the active map nor the orphan list.
//! - A missing CANCEL target or any other mismatch is reported and skipped; it
//!   never stops the dispatcher.
//! - Retiring a type without a handle is a no-op.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::core::display::DisplayWorker;
use crate::core::registry::{AlarmRegistry, EntryBody};
use crate::core::shared::Shared;
use crate::core::workers::{WorkerExit, WorkerHandle, WorkerState, WorkerTable};
use crate::events::{Event, EventKind};
use crate::requests::MessageType;

/// Worker set changes decided under the registry lock.
#[derive(Debug, Default)]
struct Plan {
    processed: usize,
    spawn: Vec<MessageType>,
    retire: Vec<MessageType>,
}

/// Coordinating task owning the worker lifecycle.
pub(crate) struct Dispatcher {
    shared: Arc<Shared>,
    table: Arc<RwLock<WorkerTable>>,
    runtime_token: CancellationToken,
}

impl Dispatcher {
    pub fn new(
        shared: Arc<Shared>,
        table: Arc<RwLock<WorkerTable>>,
        runtime_token: CancellationToken,
    ) -> Self {
        Self {
            shared,
            table,
            runtime_token,
        }
    }

    /// Runs until the runtime token is cancelled.
    pub async fn run(self) {
        loop {
            self.scan().await;
            tokio::select! {
                biased;
                _ = self.runtime_token.cancelled() => break,
                _ = self.shared.core.work_arrived() => {}
            }
        }
    }

    /// Repeats passes until one finds no fresh entry.
    ///
    /// The table is held only while deciding; timed joins run with it released.
    async fn scan(&self) {
        loop {
            let (processed, leaving) = {
                let mut table = self.table.write().await;
                let mut leaving = table.take_leaving();
                leaving.extend(table.take_finished_orphans());

                let mut events = Vec::new();
                let plan = {
                    let mut registry = self.shared.core.write().await;
                    let processed = process_fresh(&mut registry, &mut events);
                    plan_workers(&mut registry, &table, processed, &mut events)
                };
                self.shared.bus.publish_all(events);

                leaving.extend(plan.retire.iter().filter_map(|t| table.take(*t)));
                for message_type in &plan.spawn {
                    self.spawn(&mut table, *message_type);
                }
                (plan.processed, leaving)
            };

            for handle in leaving {
                self.retire(handle).await;
            }

            if processed == 0 || self.runtime_token.is_cancelled() {
                break;
            }
        }
    }

    /// Raises the retire flag and waits up to `retire_grace`; orphans the handle on timeout.
    async fn retire(&self, mut handle: WorkerHandle) {
        handle.cancel.cancel();
        let grace = self.shared.cfg.retire_grace;
        let (message_type, worker) = (handle.message_type, handle.worker);
        let base = |kind| Event::new(kind).with_type(message_type).with_worker(worker);

        let joined = timeout(grace, &mut handle.join).await;
        let ev = match joined {
            Ok(Ok(WorkerExit::Failed(reason))) => {
                base(EventKind::WorkerPanicked).with_reason(reason)
            }
            Ok(Ok(exit)) => {
                let reason = match handle.state {
                    WorkerState::Orphaned => "orphan_reaped",
                    WorkerState::Active => exit.as_label(),
                };
                base(EventKind::WorkerRetired).with_reason(reason)
            }
            Ok(Err(join_err)) => base(EventKind::WorkerPanicked).with_reason(join_err.to_string()),
            Err(_elapsed) => {
                let ev = base(EventKind::WorkerOrphaned)
                    .with_reason(format!("not stopped within {grace:?}"));
                self.table.write().await.push_orphan(handle);
                self.shared.bus.publish(ev);
                return;
            }
        };
        self.shared.bus.publish(ev);
    }

    /// Creates the display worker of `message_type`.
    fn spawn(&self, table: &mut WorkerTable, message_type: MessageType) {
        let worker = table.next_worker_id();
        let cancel = self.runtime_token.child_token();
        let display = DisplayWorker::new(message_type, worker, self.shared.clone(), cancel.clone());

        let shared = self.shared.clone();
        let leaving = cancel.clone();
        let join = tokio::spawn(async move {
            let exit = match std::panic::AssertUnwindSafe(display.run())
                .catch_unwind()
                .await
            {
                Ok(exit) => exit,
                Err(panic_err) => WorkerExit::Failed(panic_message(panic_err.as_ref())),
            };
            leaving.cancel();
            shared.core.wake_dispatcher();
            exit
        });

        table.insert(WorkerHandle {
            message_type,
            worker,
            join,
            cancel,
            state: WorkerState::Active,
        });
        self.shared.bus.publish(
            Event::new(EventKind::WorkerSpawned)
                .with_type(message_type)
                .with_worker(worker),
        );
    }
}

/// Handles fresh entries in admission order; returns how many were processed.
fn process_fresh(registry: &mut AlarmRegistry, events: &mut Vec<Event>) -> usize {
    let mut fresh: Vec<u64> = registry
        .iter()
        .filter(|e| e.fresh)
        .map(|e| e.seq)
        .collect();
    fresh.sort_unstable();

    for seq in &fresh {
        let Some(entry) = registry.find_by_mut(|e| e.seq == *seq && e.fresh) else {
            continue;
        };
        entry.fresh = false;
        let kind = entry.kind();
        let mut processed = Event::new(EventKind::RequestProcessed).with_request(kind);
        if let Some(t) = entry.message_type() {
            processed = processed.with_type(t);
        }
        if let Some(id) = entry.id() {
            processed = processed.with_id(id);
        }

        if let EntryBody::Cancel { id } = entry.body {
            registry.remove_by(|e| e.seq == *seq);
            match registry.remove_by(|e| e.is_schedule_with_id(id)) {
                Some(target) => {
                    let mut ev = Event::new(EventKind::CancelApplied).with_id(id);
                    if let Some(t) = target.message_type() {
                        ev = ev.with_type(t);
                    }
                    events.push(ev);
                }
                None => events.push(Event::new(EventKind::CancelMissing).with_id(id)),
            }
        }
        events.push(processed);
    }
    fresh.len()
}

/// Computes spawn/retire sets and releases WATCH entries of emptied types.
fn plan_workers(
    registry: &mut AlarmRegistry,
    table: &WorkerTable,
    processed: usize,
    events: &mut Vec<Event>,
) -> Plan {
    let mut desired = BTreeSet::new();
    for message_type in registry.watched_types() {
        if registry.schedule_count(message_type) > 0 {
            desired.insert(message_type);
            continue;
        }
        registry.remove_by(|e| e.is_watch_of_type(message_type));
        events.push(Event::new(EventKind::WatchReleased).with_type(message_type));
    }

    let active: BTreeSet<MessageType> = table.active_types().into_iter().collect();
    Plan {
        processed,
        spawn: desired.difference(&active).copied().collect(),
        retire: active.difference(&desired).copied().collect(),
    }
}

fn panic_message(panic_err: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic_err.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic_err.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
