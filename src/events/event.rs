//! # Runtime events emitted by admission, the dispatcher and display workers.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Admission events**: requests linked into (or rejected by) the registry
//! - **Dispatch events**: fresh entries processed by the dispatcher
//! - **Worker events**: display worker lifecycle and display output
//! - **Runtime events**: shutdown and subscriber health
//!
//! The [`Event`] struct carries optional metadata (type, id, previous type,
//! text, reason) depending on the kind.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use alarmvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::AlarmDisplayed)
//!     .with_type(1)
//!     .with_id(5)
//!     .with_text("hi");
//!
//! assert_eq!(ev.kind, EventKind::AlarmDisplayed);
//! assert_eq!(ev.id, Some(5));
//! assert_eq!(ev.text.as_deref(), Some("hi"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::requests::{MessageId, MessageType, RequestKind};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Admission ===
    /// A request was linked into the registry.
    ///
    /// Sets: `request`, `message_type` (schedule/watch), `id` (schedule/cancel)
    RequestAdmitted,

    /// A SCHEDULE replaced an existing entry with the same id.
    ///
    /// Sets: `id`, `message_type`, `previous_type`
    ScheduleReplaced,

    /// A request was rejected at admission.
    ///
    /// Sets: `request`, `reason` (error label), `message_type`/`id` when known
    AdmissionRejected,

    // === Dispatch ===
    /// The dispatcher marked a fresh entry processed.
    ///
    /// Sets: `request`, `message_type`/`id` when known
    RequestProcessed,

    /// A CANCEL removed its target SCHEDULE entry.
    ///
    /// Sets: `id`, `message_type` (of the removed entry)
    CancelApplied,

    /// A CANCEL found no target; treated as a no-op.
    ///
    /// Sets: `id`
    CancelMissing,

    /// A pending CANCEL was dropped because a SCHEDULE with the same id
    /// replaced its target before the dispatcher applied it.
    ///
    /// Sets: `request`, `id`, `reason`
    CancelSuperseded,

    /// A WATCH entry was released because its type has no SCHEDULE entry left.
    ///
    /// Sets: `message_type`
    WatchReleased,

    // === Workers ===
    /// A display worker was created for a type.
    ///
    /// Sets: `message_type`, `worker`
    WorkerSpawned,

    /// A display worker exited and its handle was removed.
    ///
    /// Sets: `message_type`, `worker`, `reason` (`retired` or `drained`)
    WorkerRetired,

    /// A retired worker did not honor its stop flag in time.
    ///
    /// Sets: `message_type`, `worker`
    WorkerOrphaned,

    /// A display worker task panicked.
    ///
    /// Sets: `message_type`, `worker`, `reason`
    WorkerPanicked,

    /// A display worker showed an alarm.
    ///
    /// Sets: `message_type`, `id`, `text`
    AlarmDisplayed,

    /// One-time notice: the displayed entry changed type by replacement.
    ///
    /// Sets: `message_type`, `previous_type`, `id`
    TypeChanged,

    // === Runtime ===
    /// Shutdown requested (explicit call or OS signal).
    ShutdownRequested,

    /// All workers stopped within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some workers did not stop in time.
    GraceExceeded,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `reason`
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets: `reason`
    SubscriberPanicked,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Request category, for admission/dispatch events.
    pub request: Option<RequestKind>,
    /// Message type, if applicable.
    pub message_type: Option<MessageType>,
    /// Type before a replacement, if applicable.
    pub previous_type: Option<MessageType>,
    /// Message number, if applicable.
    pub id: Option<MessageId>,
    /// Serial number of the display worker, if applicable.
    pub worker: Option<u64>,
    /// Display text, if applicable.
    pub text: Option<Arc<str>>,
    /// Human-readable reason (error labels, exit causes).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            request: None,
            message_type: None,
            previous_type: None,
            id: None,
            worker: None,
            text: None,
            reason: None,
        }
    }

    /// Attaches a request category.
    #[inline]
    pub fn with_request(mut self, kind: RequestKind) -> Self {
        self.request = Some(kind);
        self
    }

    /// Attaches a message type.
    #[inline]
    pub fn with_type(mut self, message_type: MessageType) -> Self {
        self.message_type = Some(message_type);
        self
    }

    /// Attaches the type an entry had before replacement.
    #[inline]
    pub fn with_previous_type(mut self, message_type: MessageType) -> Self {
        self.previous_type = Some(message_type);
        self
    }

    /// Attaches a message number.
    #[inline]
    pub fn with_id(mut self, id: MessageId) -> Self {
        self.id = Some(id);
        self
    }

    /// Attaches a worker serial number.
    #[inline]
    pub fn with_worker(mut self, worker: u64) -> Self {
        self.worker = Some(worker);
        self
    }

    /// Attaches display text.
    #[inline]
    pub fn with_text(mut self, text: impl Into<Arc<str>>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }
}
