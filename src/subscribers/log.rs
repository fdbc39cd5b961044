//! # LogWriter - renders events through `tracing`
//!
//! A subscriber that turns every [`Event`] into one structured `tracing`
//! record. Routine traffic logs at `debug`, display output and worker
//! lifecycle at `info`, no-ops and orphans at `warn`, panics at `error`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO alarmvisor: worker spawned message_type=1 worker=1
//! INFO alarmvisor: alarm displayed message_type=1 id=5 text="hi"
//! WARN alarmvisor: cancel target missing; ignored id=9
//! INFO alarmvisor: worker retired message_type=1 worker=1 reason="drained"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Debug, Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let request = e.request.map(|r| r.as_label());
        let reason = e.reason.as_deref();
        match e.kind {
            EventKind::RequestAdmitted => {
                tracing::debug!(target: "alarmvisor", request, message_type = e.message_type, id = e.id, "request admitted");
            }
            EventKind::ScheduleReplaced => {
                tracing::info!(target: "alarmvisor", id = e.id, message_type = e.message_type, previous_type = e.previous_type, "schedule replaced");
            }
            EventKind::AdmissionRejected => {
                tracing::info!(target: "alarmvisor", request, message_type = e.message_type, id = e.id, reason, "request rejected");
            }
            EventKind::RequestProcessed => {
                tracing::debug!(target: "alarmvisor", request, message_type = e.message_type, id = e.id, "request processed");
            }
            EventKind::CancelApplied => {
                tracing::info!(target: "alarmvisor", id = e.id, message_type = e.message_type, "alarm cancelled");
            }
            EventKind::CancelMissing => {
                tracing::warn!(target: "alarmvisor", id = e.id, "cancel target missing; ignored");
            }
            EventKind::CancelSuperseded => {
                tracing::info!(target: "alarmvisor", id = e.id, reason, "pending cancel superseded by replacement");
            }
            EventKind::WatchReleased => {
                tracing::info!(target: "alarmvisor", message_type = e.message_type, "watch released; no scheduled alarms left");
            }
            EventKind::WorkerSpawned => {
                tracing::info!(target: "alarmvisor", message_type = e.message_type, worker = e.worker, "worker spawned");
            }
            EventKind::WorkerRetired => {
                tracing::info!(target: "alarmvisor", message_type = e.message_type, worker = e.worker, reason, "worker retired");
            }
            EventKind::WorkerOrphaned => {
                tracing::warn!(target: "alarmvisor", message_type = e.message_type, worker = e.worker, reason, "worker ignored stop flag; orphaned");
            }
            EventKind::WorkerPanicked => {
                tracing::error!(target: "alarmvisor", message_type = e.message_type, worker = e.worker, reason, "worker panicked");
            }
            EventKind::AlarmDisplayed => {
                tracing::info!(target: "alarmvisor", message_type = e.message_type, id = e.id, text = e.text.as_deref(), "alarm displayed");
            }
            EventKind::TypeChanged => {
                tracing::info!(target: "alarmvisor", id = e.id, previous_type = e.previous_type, message_type = e.message_type, "alarm type changed");
            }
            EventKind::ShutdownRequested => {
                tracing::info!(target: "alarmvisor", "shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                tracing::info!(target: "alarmvisor", "all workers stopped within grace");
            }
            EventKind::GraceExceeded => {
                tracing::warn!(target: "alarmvisor", reason, "grace exceeded");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: "alarmvisor", reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(target: "alarmvisor", reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
