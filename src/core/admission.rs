//! # Admission: validated insertion of requests into the registry.
//!
//! Every request is checked and linked under exclusive registry access, then
//! the participants that may care are woken *after* the guard is released.
//!
//! ## Flow
//! ```text
//! submit(request)
//!   ├─► check_text(max_text_len)                  (Invalid)
//!   ├─► registry.write()
//!   │     ├─ SCHEDULE → insert (same id → replace in place, drop its pending CANCEL)
//!   │     ├─ WATCH    → type has schedules?  (NotFound) / already watched? (Duplicate)
//!   │     └─ CANCEL   → id scheduled?        (NotFound) / cancel pending?  (Duplicate)
//!   ├─► release guard
//!   ├─► wake dispatcher                           (every accepted request)
//!   └─► interrupt deadline waiters                (more urgent SCHEDULE, or type moved away)
//! ```
//!
//! ## Rules
//! - A rejected request never mutates the registry.
//! - `submit` returns once the entry is linked; it does not wait for the dispatcher.
//! - A CANCEL only ever removes the entry it was admitted against: a replacement
//!   admitted later consumes the pending CANCEL and survives.

use tokio::time::Instant;

use crate::core::registry::{Alarm, Entry, EntryBody, Inserted};
use crate::core::shared::Shared;
use crate::error::{AdmissionStatus, SubmitError};
use crate::events::{Event, EventKind};
use crate::requests::{Cancel, MessageId, MessageType, Request, RequestKind, Schedule, Watch};

/// Acknowledgement of an accepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// The request was linked as a new entry.
    Accepted {
        /// Admission sequence number.
        seq: u64,
    },
    /// A SCHEDULE replaced the pending SCHEDULE with the same id.
    Replaced {
        /// Admission sequence number of the new entry.
        seq: u64,
        /// Type of the replaced entry.
        previous_type: MessageType,
    },
}

impl Ack {
    /// Admission sequence number of the linked entry.
    pub fn seq(&self) -> u64 {
        match self {
            Ack::Accepted { seq } | Ack::Replaced { seq, .. } => *seq,
        }
    }

    /// Admission tag; a replacement counts as accepted.
    pub fn status(&self) -> AdmissionStatus {
        AdmissionStatus::Accepted
    }
}

/// Admits `request`, publishing `RequestAdmitted` or `AdmissionRejected`.
pub(crate) async fn admit(shared: &Shared, request: Request) -> Result<Ack, SubmitError> {
    let kind = request.kind();
    let (message_type, id) = describe(&request);

    match link(shared, request).await {
        Ok(ack) => Ok(ack),
        Err(err) => {
            let mut ev = Event::new(EventKind::AdmissionRejected)
                .with_request(kind)
                .with_reason(err.as_label());
            if let Some(t) = message_type {
                ev = ev.with_type(t);
            }
            if let Some(id) = id {
                ev = ev.with_id(id);
            }
            shared.bus.publish(ev);
            Err(err)
        }
    }
}

async fn link(shared: &Shared, request: Request) -> Result<Ack, SubmitError> {
    request.check_text(shared.cfg.max_text_len_clamped())?;

    match request {
        Request::Schedule(s) => link_schedule(shared, s).await,
        Request::Watch(w) => link_watch(shared, w).await,
        Request::Cancel(c) => link_cancel(shared, c).await,
    }
}

async fn link_schedule(shared: &Shared, s: Schedule) -> Result<Ack, SubmitError> {
    let (seq, deadline, inserted, superseded) = {
        let mut registry = shared.core.write().await;
        let seq = shared.core.next_seq();
        let deadline = Instant::now() + s.ttl;
        let inserted = registry.insert(Entry::new(
            seq,
            EntryBody::Schedule(Alarm {
                id: s.id,
                message_type: s.message_type,
                previous_type: s.message_type,
                deadline,
                period: s.ttl,
                text: s.text.clone(),
                change_acknowledged: false,
            }),
        ));
        // A CANCEL admitted before this replacement targeted the replaced entry.
        let superseded = match inserted {
            Inserted::Replaced { .. } => registry.remove_by(|e| e.is_cancel_for(s.id)),
            Inserted::Linked { .. } => None,
        };
        (seq, deadline, inserted, superseded)
    };

    let mut interrupt = shared.core.is_more_urgent(s.message_type, deadline)?;
    let ack = match inserted {
        Inserted::Linked { .. } => {
            shared.bus.publish(
                Event::new(EventKind::RequestAdmitted)
                    .with_request(RequestKind::Schedule)
                    .with_type(s.message_type)
                    .with_id(s.id),
            );
            Ack::Accepted { seq }
        }
        Inserted::Replaced { previous, .. } => {
            if previous.message_type != s.message_type {
                interrupt |= shared.core.is_awaited(previous.message_type)?;
            }
            shared.bus.publish(
                Event::new(EventKind::ScheduleReplaced)
                    .with_request(RequestKind::Schedule)
                    .with_type(s.message_type)
                    .with_previous_type(previous.message_type)
                    .with_id(s.id),
            );
            Ack::Replaced {
                seq,
                previous_type: previous.message_type,
            }
        }
    };

    if let Some(cancel) = superseded {
        shared.bus.publish(
            Event::new(EventKind::CancelSuperseded)
                .with_request(RequestKind::Cancel)
                .with_id(s.id)
                .with_reason(format!("cancel seq={} dropped by replacement seq={seq}", cancel.seq)),
        );
    }
    shared.core.wake_dispatcher();
    if interrupt {
        shared.core.interrupt_waiters();
    }
    Ok(ack)
}

async fn link_watch(shared: &Shared, w: Watch) -> Result<Ack, SubmitError> {
    let seq = {
        let mut registry = shared.core.write().await;
        if registry.schedule_count(w.message_type) == 0 {
            return Err(SubmitError::TypeNotFound {
                message_type: w.message_type,
            });
        }
        if registry
            .find_by(|e| e.is_watch_of_type(w.message_type))
            .is_some()
        {
            return Err(SubmitError::DuplicateWatch {
                message_type: w.message_type,
            });
        }
        let seq = shared.core.next_seq();
        registry.insert(Entry::new(
            seq,
            EntryBody::Watch {
                message_type: w.message_type,
            },
        ));
        seq
    };

    shared.bus.publish(
        Event::new(EventKind::RequestAdmitted)
            .with_request(RequestKind::Watch)
            .with_type(w.message_type),
    );
    shared.core.wake_dispatcher();
    Ok(Ack::Accepted { seq })
}

async fn link_cancel(shared: &Shared, c: Cancel) -> Result<Ack, SubmitError> {
    let seq = {
        let mut registry = shared.core.write().await;
        if registry.find_by(|e| e.is_schedule_with_id(c.id)).is_none() {
            return Err(SubmitError::IdNotFound { id: c.id });
        }
        if registry.find_by(|e| e.is_cancel_for(c.id)).is_some() {
            return Err(SubmitError::DuplicateCancel { id: c.id });
        }
        let seq = shared.core.next_seq();
        registry.insert(Entry::new(seq, EntryBody::Cancel { id: c.id }));
        seq
    };

    shared.bus.publish(
        Event::new(EventKind::RequestAdmitted)
            .with_request(RequestKind::Cancel)
            .with_id(c.id),
    );
    shared.core.wake_dispatcher();
    Ok(Ack::Accepted { seq })
}

fn describe(request: &Request) -> (Option<MessageType>, Option<MessageId>) {
    match request {
        Request::Schedule(s) => (Some(s.message_type), Some(s.id)),
        Request::Watch(w) => (Some(w.message_type), None),
        Request::Cancel(c) => (None, Some(c.id)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::AlarmConfig;
    use crate::events::Bus;
    use crate::output::StdoutOutput;

    fn shared() -> Arc<Shared> {
        Shared::new(AlarmConfig::default(), Bus::new(64), Arc::new(StdoutOutput))
    }

    #[tokio::test]
    async fn test_watch_without_schedule_is_not_found() {
        let shared = shared();
        let err = admit(&shared, Request::watch(2).unwrap()).await.unwrap_err();
        assert_eq!(err, SubmitError::TypeNotFound { message_type: 2 });
        assert_eq!(shared.core.read().await.len(), 0);
    }

    #[tokio::test]
    async fn test_second_watch_and_second_cancel_are_duplicates() {
        let shared = shared();
        admit(&shared, Request::schedule(1, 5, 10, "a").unwrap()).await.unwrap();
        admit(&shared, Request::watch(1).unwrap()).await.unwrap();
        admit(&shared, Request::cancel(5).unwrap()).await.unwrap();

        let watch = admit(&shared, Request::watch(1).unwrap()).await.unwrap_err();
        assert_eq!(watch.status(), Some(AdmissionStatus::Duplicate));
        let cancel = admit(&shared, Request::cancel(5).unwrap()).await.unwrap_err();
        assert_eq!(cancel, SubmitError::DuplicateCancel { id: 5 });
        assert_eq!(shared.core.read().await.len(), 3);
    }

    #[tokio::test]
    async fn test_cancel_of_unknown_id_is_not_found() {
        let shared = shared();
        let err = admit(&shared, Request::cancel(9).unwrap()).await.unwrap_err();
        assert_eq!(err.status(), Some(AdmissionStatus::NotFound));
    }

    #[tokio::test]
    async fn test_replacement_reports_previous_type() {
        let shared = shared();
        let first = admit(&shared, Request::schedule(1, 5, 10, "a").unwrap())
            .await
            .unwrap();
        assert!(matches!(first, Ack::Accepted { .. }));

        let second = admit(&shared, Request::schedule(2, 5, 10, "b").unwrap())
            .await
            .unwrap();
        assert_eq!(
            second,
            Ack::Replaced {
                seq: first.seq() + 1,
                previous_type: 1
            }
        );
        assert_eq!(shared.core.read().await.schedule_count(1), 0);
        assert_eq!(shared.core.read().await.schedule_count(2), 1);
    }

    #[tokio::test]
    async fn test_replacement_consumes_pending_cancel() {
        let shared = shared();
        let mut rx = shared.bus.subscribe();
        admit(&shared, Request::schedule(1, 5, 60, "old").unwrap()).await.unwrap();
        admit(&shared, Request::cancel(5).unwrap()).await.unwrap();

        let ack = admit(&shared, Request::schedule(1, 5, 2, "new").unwrap())
            .await
            .unwrap();
        assert!(matches!(ack, Ack::Replaced { previous_type: 1, .. }));
        {
            let registry = shared.core.read().await;
            assert_eq!(registry.len(), 1);
            assert!(registry.find_by(|e| e.is_cancel_for(5)).is_none());
        }

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert!(kinds.contains(&EventKind::CancelSuperseded), "{kinds:?}");

        // The replacement can be cancelled on its own.
        admit(&shared, Request::cancel(5).unwrap()).await.unwrap();
        assert_eq!(shared.core.read().await.len(), 2);
    }

    #[tokio::test]
    async fn test_rejection_is_published_with_label() {
        let shared = shared();
        let mut rx = shared.bus.subscribe();
        let long = "x".repeat(200);
        let err = admit(&shared, Request::schedule(1, 1, 1, long.as_str()).unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(AdmissionStatus::Invalid));

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::AdmissionRejected);
        assert_eq!(ev.reason.as_deref(), Some("validation_text_too_long"));
        assert_eq!(shared.core.read().await.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_earlier_deadline_interrupts_waiting_worker() {
        let shared = shared();
        admit(&shared, Request::schedule(1, 1, 60, "late").unwrap())
            .await
            .unwrap();
        let awaited = shared.core.read().await.nearest_schedule(1).unwrap().deadline;
        shared.core.record_awaited(1, 1, awaited).unwrap();
        let notified = shared.core.deadline_wake();

        admit(&shared, Request::schedule(1, 2, 1, "soon").unwrap())
            .await
            .unwrap();

        tokio::time::timeout(std::time::Duration::from_millis(10), notified)
            .await
            .expect("waiting worker was not interrupted");
    }
}
