//! # DisplayWorker: waits out the deadlines of one message type.
//!
//! One worker per actively watched type. Each cycle re-reads the registry and
//! never trusts a previously computed deadline.
//!
//! ## States
//! ```text
//!            ┌──────────────────────────────────────────────┐
//!            ▼                                              │
//! ┌─► WAIT_DEADLINE ── nearest(type) = None ──► RETIRE      │
//! │      │  (read lock)                        (drained)    │
//! │      ├─ deadline <= now ──► FIRE ─────────────────────┘
//! │      └─ deadline > now:
//! │            record awaited, register wake, release lock
//! │            select! { retire flag  → RETIRE (retired)
//! │                      wake signal  → re-evaluate ─┐
//! │                      sleep_until  → re-evaluate ─┤
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//! - The retire flag is observed only while idle or between cycles, never
//!   while a registry guard is held.
//! - FIRE re-checks the entry under the write lock: it may have been
//!   cancelled, replaced or moved to another type since the scan.
//! - Output runs after the guard is released; the type-changed notice comes
//!   before the display.

use std::sync::Arc;
use std::time::SystemTime;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::config::DisplayMode;
use crate::core::registry::Alarm;
use crate::core::shared::Shared;
use crate::core::workers::WorkerExit;
use crate::error::RuntimeError;
use crate::events::{Event, EventKind};
use crate::output::Notice;
use crate::requests::{MessageId, MessageType};

/// Next step decided from one registry scan.
enum Step {
    Drained,
    Fire(MessageId),
    Waited,
    Retired,
}

/// Display worker for a single message type.
pub(crate) struct DisplayWorker {
    message_type: MessageType,
    worker: u64,
    shared: Arc<Shared>,
    cancel: CancellationToken,
}

impl DisplayWorker {
    pub fn new(
        message_type: MessageType,
        worker: u64,
        shared: Arc<Shared>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            message_type,
            worker,
            shared,
            cancel,
        }
    }

    /// Runs until the type drains or the retire flag is raised.
    pub async fn run(self) -> WorkerExit {
        let exit = match self.cycle().await {
            Ok(exit) => exit,
            Err(err) => WorkerExit::Failed(err.as_message()),
        };
        if let Err(err) = self.shared.core.clear_awaited(self.message_type, self.worker) {
            tracing::error!(message_type = self.message_type, error = %err, "cannot clear awaited deadline");
        }
        exit
    }

    async fn cycle(&self) -> Result<WorkerExit, RuntimeError> {
        loop {
            if self.cancel.is_cancelled() {
                return Ok(WorkerExit::Retired);
            }
            match self.wait_deadline().await? {
                Step::Drained => return Ok(WorkerExit::Drained),
                Step::Fire(id) => self.fire(id).await?,
                Step::Waited => {}
                Step::Retired => return Ok(WorkerExit::Retired),
            }
        }
    }

    /// Scans for the nearest entry and blocks until it is due or a wake arrives.
    async fn wait_deadline(&self) -> Result<Step, RuntimeError> {
        let core = &self.shared.core;
        let registry = core.read().await;
        let Some((id, deadline)) = registry
            .nearest_schedule(self.message_type)
            .map(|a| (a.id, a.deadline))
        else {
            return Ok(Step::Drained);
        };
        if deadline <= Instant::now() {
            return Ok(Step::Fire(id));
        }

        core.record_awaited(self.message_type, self.worker, deadline)?;
        let woken = core.deadline_wake();
        drop(registry);

        let retired = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => true,
            _ = woken => false,
            _ = sleep_until(deadline) => false,
        };
        core.clear_awaited(self.message_type, self.worker)?;
        Ok(if retired { Step::Retired } else { Step::Waited })
    }

    /// Shows entry `id` if it is still due and still ours.
    async fn fire(&self, id: MessageId) -> Result<(), RuntimeError> {
        let Some((alarm, notice_change)) = self.claim(id).await else {
            return Ok(());
        };

        let notice = Notice {
            message_type: alarm.message_type,
            previous_type: alarm.previous_type,
            id: alarm.id,
            text: alarm.text.clone(),
            at: SystemTime::now(),
        };
        let output = &self.shared.output;
        let bus = &self.shared.bus;

        if notice_change {
            output.type_changed(&notice).await;
            bus.publish(
                Event::new(EventKind::TypeChanged)
                    .with_type(notice.message_type)
                    .with_previous_type(notice.previous_type)
                    .with_id(notice.id)
                    .with_worker(self.worker),
            );
        }
        output.display(&notice).await;
        bus.publish(
            Event::new(EventKind::AlarmDisplayed)
                .with_type(notice.message_type)
                .with_id(notice.id)
                .with_worker(self.worker)
                .with_text(notice.text.clone()),
        );
        Ok(())
    }

    /// Removes (one-shot) or reschedules (periodic) a due entry under the write lock.
    async fn claim(&self, id: MessageId) -> Option<(Alarm, bool)> {
        let mut registry = self.shared.core.write().await;
        let now = Instant::now();
        let periodic = self.shared.cfg.display_mode == DisplayMode::Periodic;

        let claimed = {
            let alarm = registry
                .find_by_mut(|e| e.is_schedule_with_id(id))?
                .as_schedule_mut()?;
            if alarm.message_type != self.message_type || alarm.deadline > now {
                return None;
            }
            let notice_change = alarm.change_pending();
            alarm.change_acknowledged = true;
            let claimed = alarm.clone();
            if periodic {
                alarm.deadline = now + alarm.period;
            }
            (claimed, notice_change)
        };
        if !periodic {
            registry.remove_by(|e| e.is_schedule_with_id(id));
        }
        Some(claimed)
    }
}
