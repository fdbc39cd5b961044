//! # Synchronization core shared by admission, the dispatcher and display workers.
//!
//! Reader/writer admission over the [`AlarmRegistry`] plus two wake signals.
//!
//! ## Architecture
//! ```text
//!              ┌──────────────────────── SyncCore ────────────────────────┐
//!  readers ──► │ RwLock<AlarmRegistry>  (fair FIFO queue, write-preferring)│
//!  writers ──► │                                                          │
//!              │ deadline_wake: Notify  (broadcast: notify_waiters)        │──► display workers
//!              │ work_wake:     Notify  (permit: notify_one)               │──► dispatcher
//!              │ awaited: Mutex<HashMap<type, (worker, Instant)>>          │
//!              └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//! - **Readers** (worker scans, snapshots) share the registry; **writers** (submit,
//!   dispatcher scan, worker removal) are exclusive.
//! - **Writer intent**: a queued writer blocks every reader that arrives after it,
//!   so continuous reader churn cannot starve a writer.
//! - **No suspension while holding the registry**: guards are dropped before any
//!   timer, join or signal wait.
//! - **No lost wakeups**: a waiter creates its `Notified` future *before* releasing
//!   the guard it computed its deadline under; `notify_waiters` reaches every such
//!   future even if not yet polled. The dispatcher signal stores a permit.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::futures::Notified;
use tokio::sync::{Notify, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::time::Instant;

use crate::core::registry::AlarmRegistry;
use crate::error::RuntimeError;
use crate::requests::MessageType;

/// Lock, wake signals and awaited deadlines around the registry.
pub(crate) struct SyncCore {
    registry: RwLock<AlarmRegistry>,
    deadline_wake: Notify,
    work_wake: Notify,
    awaited: Mutex<HashMap<MessageType, (u64, Instant)>>,
    admission_seq: AtomicU64,
}

impl SyncCore {
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(AlarmRegistry::new()),
            deadline_wake: Notify::new(),
            work_wake: Notify::new(),
            awaited: Mutex::new(HashMap::new()),
            admission_seq: AtomicU64::new(1),
        }
    }

    /// Shared access to the registry.
    pub async fn read(&self) -> RwLockReadGuard<'_, AlarmRegistry> {
        self.registry.read().await
    }

    /// Exclusive access to the registry.
    pub async fn write(&self) -> RwLockWriteGuard<'_, AlarmRegistry> {
        self.registry.write().await
    }

    /// Next admission sequence number.
    pub fn next_seq(&self) -> u64 {
        self.admission_seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Signals the dispatcher that unprocessed work (or a drained worker) exists.
    pub fn wake_dispatcher(&self) {
        self.work_wake.notify_one();
    }

    /// Completes once the dispatcher was signalled (consumes a stored permit).
    pub async fn work_arrived(&self) {
        self.work_wake.notified().await;
    }

    /// Registers interest in the deadline wake signal.
    ///
    /// Must be called while the guard used to compute the awaited deadline is still held.
    pub fn deadline_wake(&self) -> Notified<'_> {
        self.deadline_wake.notified()
    }

    /// Interrupts every worker currently waiting for a deadline.
    pub fn interrupt_waiters(&self) {
        self.deadline_wake.notify_waiters();
    }

    /// Records the deadline `worker` of `message_type` is about to wait for.
    pub fn record_awaited(
        &self,
        message_type: MessageType,
        worker: u64,
        deadline: Instant,
    ) -> Result<(), RuntimeError> {
        self.awaited_table()?.insert(message_type, (worker, deadline));
        Ok(())
    }

    /// Forgets the awaited deadline of `message_type` if `worker` recorded it.
    ///
    /// A leaving worker may still run next to its successor for the same type.
    pub fn clear_awaited(&self, message_type: MessageType, worker: u64) -> Result<(), RuntimeError> {
        let mut awaited = self.awaited_table()?;
        if awaited.get(&message_type).is_some_and(|(owner, _)| *owner == worker) {
            awaited.remove(&message_type);
        }
        Ok(())
    }

    /// True if the worker of `message_type` waits for a deadline later than `deadline`.
    pub fn is_more_urgent(
        &self,
        message_type: MessageType,
        deadline: Instant,
    ) -> Result<bool, RuntimeError> {
        Ok(self
            .awaited_table()?
            .get(&message_type)
            .is_some_and(|(_, awaited)| deadline < *awaited))
    }

    /// True if the worker of `message_type` is waiting for any deadline.
    pub fn is_awaited(&self, message_type: MessageType) -> Result<bool, RuntimeError> {
        Ok(self.awaited_table()?.contains_key(&message_type))
    }

    fn awaited_table(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<MessageType, (u64, Instant)>>, RuntimeError> {
        self.awaited
            .lock()
            .map_err(|_| RuntimeError::Synchronization {
                reason: "awaited deadline table poisoned".to_string(),
            })
    }
}
