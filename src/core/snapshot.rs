//! Read-only views of the registry and the worker table.

use std::sync::Arc;

use tokio::time::Instant;

use crate::core::registry::AlarmRegistry;
use crate::core::workers::{WorkerState, WorkerTable};
use crate::requests::{MessageId, MessageType, RequestKind};

/// One registry entry, in registry order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryView {
    /// Admission sequence number.
    pub seq: u64,
    /// Request category.
    pub kind: RequestKind,
    /// Type (SCHEDULE, WATCH).
    pub message_type: Option<MessageType>,
    /// Message number (SCHEDULE, CANCEL).
    pub id: Option<MessageId>,
    /// Type before the last replacement (SCHEDULE).
    pub previous_type: Option<MessageType>,
    /// Absolute fire time (SCHEDULE).
    pub deadline: Option<Instant>,
    /// Display text (SCHEDULE).
    pub text: Option<Arc<str>>,
    /// Already handled by the dispatcher.
    pub processed: bool,
}

/// One display worker handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerView {
    /// Served type.
    pub message_type: MessageType,
    /// Worker serial number.
    pub worker: u64,
    /// Active or orphaned.
    pub state: WorkerState,
}

/// Consistent copy of the registry and the worker table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Registry entries in order.
    pub entries: Vec<EntryView>,
    /// Active handles (ascending by type), then orphans.
    pub workers: Vec<WorkerView>,
}

impl Snapshot {
    pub(crate) fn capture(registry: &AlarmRegistry, table: &WorkerTable) -> Self {
        let mut entries = Vec::with_capacity(registry.len());
        entries.extend(registry.iter().map(|e| {
            let alarm = e.as_schedule();
            EntryView {
                seq: e.seq,
                kind: e.kind(),
                message_type: e.message_type(),
                id: e.id(),
                previous_type: alarm.map(|a| a.previous_type),
                deadline: alarm.map(|a| a.deadline),
                text: alarm.map(|a| a.text.clone()),
                processed: !e.fresh,
            }
        }));
        let workers = table
            .describe()
            .into_iter()
            .map(|(message_type, worker, state)| WorkerView {
                message_type,
                worker,
                state,
            })
            .collect();
        Self { entries, workers }
    }

    /// SCHEDULE entries in registry order.
    pub fn schedules(&self) -> impl Iterator<Item = &EntryView> {
        self.entries
            .iter()
            .filter(|e| e.kind == RequestKind::Schedule)
    }

    /// Ids of the SCHEDULE entries in registry order.
    pub fn schedule_ids(&self) -> Vec<MessageId> {
        self.schedules().filter_map(|e| e.id).collect()
    }

    /// Types with an active (not orphaned) worker.
    pub fn active_types(&self) -> Vec<MessageType> {
        self.workers
            .iter()
            .filter(|w| w.state == WorkerState::Active)
            .map(|w| w.message_type)
            .collect()
    }

    /// Types with an orphaned worker.
    pub fn orphaned_types(&self) -> Vec<MessageType> {
        self.workers
            .iter()
            .filter(|w| w.state == WorkerState::Orphaned)
            .map(|w| w.message_type)
            .collect()
    }
}
