//! # Worker handle table - index of display workers keyed by type.
//!
//! Owns the handles (`JoinHandle` + `CancellationToken`) of every display
//! worker. Written only by the dispatcher (and by shutdown); read by the
//! snapshot.
//!
//! ## Layout
//! ```text
//! active:  HashMap<type, WorkerHandle>   at most one live handle per type
//! orphans: Vec<WorkerHandle>             retired but not joined within retire_grace
//! ```
//!
//! ## Rules
//! - A handle whose token is cancelled is on its way out: the worker either
//!   drained itself or was retired. The dispatcher joins it on its next scan.
//! - Orphans stay listed (state `Orphaned`) until their task finishes.

use std::collections::HashMap;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::requests::MessageType;

/// Lifecycle state of a display worker as seen by diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerState {
    /// Serving its type.
    Active,
    /// Retired, but did not honor its stop flag within the retire grace.
    Orphaned,
}

impl WorkerState {
    /// Returns a short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerState::Active => "active",
            WorkerState::Orphaned => "orphaned",
        }
    }
}

/// Why a display worker task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WorkerExit {
    /// No SCHEDULE entry of its type was left.
    Drained,
    /// Its stop flag was raised.
    Retired,
    /// The worker panicked or hit a broken synchronization primitive.
    Failed(String),
}

impl WorkerExit {
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerExit::Drained => "drained",
            WorkerExit::Retired => "retired",
            WorkerExit::Failed(_) => "failed",
        }
    }
}

/// Handle to a running display worker.
pub(crate) struct WorkerHandle {
    pub message_type: MessageType,
    /// Serial number, unique per scheduler.
    pub worker: u64,
    pub join: JoinHandle<WorkerExit>,
    /// Cooperative retire flag (child of the runtime token).
    pub cancel: CancellationToken,
    pub state: WorkerState,
}

impl WorkerHandle {
    /// True once the worker drained itself or was asked to retire.
    pub fn is_leaving(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Display workers by type, plus orphans.
#[derive(Default)]
pub(crate) struct WorkerTable {
    active: HashMap<MessageType, WorkerHandle>,
    orphans: Vec<WorkerHandle>,
    next_worker: u64,
}

impl WorkerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next worker serial number.
    pub fn next_worker_id(&mut self) -> u64 {
        self.next_worker += 1;
        self.next_worker
    }

    /// Types with a live handle, ascending.
    pub fn active_types(&self) -> Vec<MessageType> {
        let mut types: Vec<MessageType> = self.active.keys().copied().collect();
        types.sort_unstable();
        types
    }

    /// Registers a handle; returns the handle it displaced, if any.
    pub fn insert(&mut self, handle: WorkerHandle) -> Option<WorkerHandle> {
        self.active.insert(handle.message_type, handle)
    }

    pub fn take(&mut self, message_type: MessageType) -> Option<WorkerHandle> {
        self.active.remove(&message_type)
    }

    /// Removes every active handle that is leaving (drained, retired or failed).
    pub fn take_leaving(&mut self) -> Vec<WorkerHandle> {
        let leaving: Vec<MessageType> = self
            .active
            .iter()
            .filter(|(_, h)| h.is_leaving() || h.join.is_finished())
            .map(|(t, _)| *t)
            .collect();
        leaving
            .into_iter()
            .filter_map(|t| self.active.remove(&t))
            .collect()
    }

    pub fn push_orphan(&mut self, mut handle: WorkerHandle) {
        handle.state = WorkerState::Orphaned;
        self.orphans.push(handle);
    }

    /// Removes orphans whose task has finished.
    pub fn take_finished_orphans(&mut self) -> Vec<WorkerHandle> {
        let (finished, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.orphans)
            .into_iter()
            .partition(|h| h.join.is_finished());
        self.orphans = pending;
        finished
    }

    /// Empties the table (active and orphans).
    pub fn drain(&mut self) -> Vec<WorkerHandle> {
        let mut all: Vec<WorkerHandle> = self.active.drain().map(|(_, h)| h).collect();
        all.append(&mut self.orphans);
        all
    }

    /// `(type, worker, state)` for every handle, active first, ascending by type.
    pub fn describe(&self) -> Vec<(MessageType, u64, WorkerState)> {
        let mut active: Vec<_> = self
            .active
            .values()
            .map(|h| (h.message_type, h.worker, h.state))
            .collect();
        active.sort_unstable_by_key(|(t, _, _)| *t);
        active.extend(
            self.orphans
                .iter()
                .map(|h| (h.message_type, h.worker, h.state)),
        );
        active
    }
}
